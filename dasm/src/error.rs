use thiserror::Error;

use crate::table::Conflict;

/// Problems that stop the driver. Decode problems are not errors here;
/// they live in the instruction records.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to read file: {0}")]
    FileRead(String, #[source] std::io::Error),

    #[error("Failed to create file: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(String, #[source] serde_yaml::Error),

    #[error("Failed to dump instructions")]
    Dump(#[source] serde_yaml::Error),

    #[error("Input is {0} bytes, limit is {1}")]
    TooLarge(usize, usize),

    #[error(transparent)]
    Table(#[from] Conflict),
}

impl Error {
    /// Exit code for driver failures, above every listing status.
    pub const EXIT_CODE: u8 = 10;
}
