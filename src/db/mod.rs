//! Database module: connection strings and the SQL Server connector.
//!
//! Layout:
//! - `conn_str.rs`: `ConnectionString` and the builder that fills it from a host spec
//! - `params.rs`: parse of a connection string into driver settings
//! - `mssql.rs`: `Database` handle, ping and `connect`

pub mod conn_str;
pub mod mssql;
pub mod params;

pub use conn_str::{CONNECTION_TIMEOUT_SECS, ConnectionString, ConnectionStringBuilder};
pub use mssql::{Database, MssqlClient, connect};
pub use params::ConnectParams;
