use std::io;
use std::result;

use serenity::prelude::SerenityError;
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq, ThisError)]
pub enum Error {
    #[error("{0}")]
    Serenity(String),
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Storage(String),
    #[error("{0}")]
    Scheduler(String),
    #[error("{0}")]
    Lottery(String),
}

impl From<SerenityError> for Error {
    fn from(err: SerenityError) -> Error {
        let description = err.to_string();
        Error::Serenity(description)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        let description = err.to_string();
        Error::Storage(description)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        let description = err.to_string();
        Error::Storage(description)
    }
}
