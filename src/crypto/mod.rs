pub mod password;
pub mod token;

pub use password::*;
pub use token::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Malformed credential hash")]
    MalformedHash,

    #[error("Unsupported hash scheme: {0}")]
    UnsupportedScheme(String),
}
