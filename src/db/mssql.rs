use crate::db::conn_str::ConnectionString;
use crate::db::params::ConnectParams;
use crate::error::{ConnectFailure, MssqlError};
use std::fmt;
use tiberius::{Client, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

pub type MssqlClient = Client<Compat<TcpStream>>;

/// Handle to one SQL Server session.
///
/// Opening only validates the connection string; the TCP dial and login
/// happen on the first [`Database::ping`].
pub struct Database {
    params: ConnectParams,
    client: Option<MssqlClient>,
}

impl Database {
    pub fn open(conn_str: &ConnectionString) -> Result<Self, MssqlError> {
        let params = ConnectParams::parse(conn_str)?;
        Ok(Self {
            params,
            client: None,
        })
    }

    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&mut self) -> Option<&mut MssqlClient> {
        self.client.as_mut()
    }

    /// Connect if needed, then run `SELECT 1`.
    pub async fn ping(&mut self) -> Result<(), MssqlError> {
        let mut client = match self.client.take() {
            Some(client) => client,
            None => establish(&self.params).await?,
        };

        // A client whose round trip failed is dropped; its session state is unknown.
        select_one(&mut client).await?;
        self.client = Some(client);
        Ok(())
    }

    /// End the session. A handle that never connected closes trivially.
    pub async fn close(self) -> Result<(), MssqlError> {
        if let Some(client) = self.client {
            client.close().await?;
            debug!(host = %self.params.host, "session closed");
        }
        Ok(())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("params", &self.params)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Open a handle and verify it with a ping.
///
/// A parse failure carries no handle; a dial, login or ping failure carries
/// the unconnected handle.
pub async fn connect(conn_str: &ConnectionString) -> Result<Database, ConnectFailure> {
    let mut db = Database::open(conn_str).map_err(|e| ConnectFailure::new(None, e))?;

    match db.ping().await {
        Ok(()) => {
            info!(
                host = %db.params.host,
                instance = db.params.instance.as_deref().unwrap_or("<default>"),
                database = db.params.database.as_deref().unwrap_or("<default>"),
                "database connection verified"
            );
            Ok(db)
        }
        Err(e) => {
            warn!(host = %db.params.host, error = %e, "database ping failed");
            Err(ConnectFailure::new(Some(db), e))
        }
    }
}

async fn select_one(client: &mut MssqlClient) -> Result<(), MssqlError> {
    client.simple_query("SELECT 1").await?.into_results().await?;
    Ok(())
}

async fn establish(params: &ConnectParams) -> Result<MssqlClient, MssqlError> {
    let dial = async {
        let config = params.to_config();
        let tcp = if params.needs_browser() {
            TcpStream::connect_named(&config).await?
        } else {
            TcpStream::connect(config.get_addr()).await?
        };
        tcp.set_nodelay(true)?;

        // tiberius speaks futures-io; wrap the tokio stream.
        let client = Client::connect(config, tcp.compat_write()).await?;
        Ok::<_, MssqlError>(client)
    };

    match params.connect_timeout() {
        Some(limit) => tokio::time::timeout(limit, dial)
            .await
            .map_err(|_| MssqlError::Timeout {
                secs: params.connect_timeout_secs,
            })?,
        None => dial.await,
    }
}
