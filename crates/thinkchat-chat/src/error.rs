use thinkchat_persist::PersistError;
use thiserror::Error;

/// Reasons a submission is refused before any reply streams
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("a reply is already streaming in this conversation")]
    Busy,

    #[error("message is empty")]
    EmptyInput,

    #[error("conversation view has been shut down")]
    Closed,

    #[error("{0} is required")]
    MissingComponent(&'static str),

    #[error(transparent)]
    Persist(#[from] PersistError),
}
