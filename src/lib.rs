pub mod config;
pub mod db;
pub mod error;
pub mod net;
pub mod types;

pub use db::{ConnectionString, ConnectionStringBuilder, Database, connect};
pub use error::{ConnectFailure, MssqlError};
pub use types::{Credentials, HostSpec};
