mod client;
mod schema;

pub use client::SqliteStore;
