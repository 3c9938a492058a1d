pub mod models;
pub mod store;
pub mod dbs;
pub mod clock;
pub mod notify;
pub mod live;
pub mod error;
pub mod builder;

pub use models::{Thread, Message, MessageRole, NewMessage};
pub use store::ChatStore;
pub use dbs::memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use dbs::sqlite::SqliteStore;
#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoStore;
pub use clock::MonotonicClock;
pub use notify::{ChangeNotifier, StoreEvent};
pub use live::{live_messages, live_threads, LiveQuery};
pub use error::PersistError;
pub use builder::{PersistClientBuilder, StoreConfig};
