use crate::db::Database;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum MssqlError {
    #[error("Unable to get computer host name: {0}")]
    Hostname(#[source] std::io::Error),

    #[error("Unable to enumerate interface addresses: {0}")]
    InterfaceAddrs(#[from] local_ip_address::Error),

    #[error("Connection string segment {index} has no '='")]
    MalformedSegment { index: usize },

    #[error("Connection string has no server")]
    MissingServer,

    #[error("Invalid value {value:?} for connection string key '{key}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Connection timeout after {secs}s")]
    Timeout { secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL Server error: {0}")]
    Driver(#[from] tiberius::error::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for MssqlError {
    fn from(e: figment::Error) -> Self {
        MssqlError::Config(Box::new(e))
    }
}

/// Failure returned by [`crate::db::connect`].
///
/// Carries the handle alongside the error whenever one was opened, so the
/// caller decides whether to keep, retry or drop it.
#[derive(Debug, ThisError)]
#[error("{source}")]
pub struct ConnectFailure {
    handle: Option<Database>,
    #[source]
    source: MssqlError,
}

impl ConnectFailure {
    pub(crate) fn new(handle: Option<Database>, source: MssqlError) -> Self {
        Self { handle, source }
    }

    pub fn handle(&self) -> Option<&Database> {
        self.handle.as_ref()
    }

    pub fn error(&self) -> &MssqlError {
        &self.source
    }

    pub fn into_parts(self) -> (Option<Database>, MssqlError) {
        (self.handle, self.source)
    }
}
