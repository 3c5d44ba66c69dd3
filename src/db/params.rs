use crate::db::conn_str::{ConnectionString, is_password_key};
use crate::error::MssqlError;
use crate::types::credentials::REDACTED;
use std::fmt;
use std::time::Duration;
use tiberius::{AuthMethod, Config, EncryptionLevel};

pub const DEFAULT_PORT: u16 = 1433;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Driver-facing view of a [`ConnectionString`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub instance: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Zero disables the limit.
    pub connect_timeout_secs: u64,
    pub encryption: EncryptionLevel,
    pub trust_cert: bool,
}

impl ConnectParams {
    /// Keys are matched case-insensitively; unknown keys are ignored.
    pub fn parse(conn_str: &ConnectionString) -> Result<Self, MssqlError> {
        let mut server = None;
        let mut database = None;
        let mut user = None;
        let mut password = None;
        let mut connect_timeout_secs = DEFAULT_CONNECT_TIMEOUT_SECS;
        let mut encryption = EncryptionLevel::Off;
        let mut trust_cert = false;

        for (index, segment) in conn_str.as_str().split(';').enumerate() {
            if segment.trim().is_empty() {
                continue;
            }
            // Segment text stays out of the error; it may be a password tail.
            let (key, value) = segment
                .split_once('=')
                .ok_or(MssqlError::MalformedSegment { index })?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "data source" | "address" => server = Some(value.to_string()),
                "database" | "initial catalog" => database = Some(value.to_string()),
                "user id" | "user" => user = Some(value.to_string()),
                k if is_password_key(k) => password = Some(value.to_string()),
                "connection timeout" | "connect timeout" => {
                    connect_timeout_secs =
                        value.parse().map_err(|_| MssqlError::InvalidValue {
                            key: "connection timeout",
                            value: value.to_string(),
                        })?;
                }
                "encrypt" => encryption = parse_encrypt(value)?,
                "trustservercertificate" => trust_cert = parse_bool("trustservercertificate", value)?,
                _ => {}
            }
        }

        let (host, instance, port) = split_server(server.as_deref().unwrap_or_default())?;

        Ok(Self {
            host,
            instance,
            port,
            database: database.filter(|d| !d.is_empty()),
            user,
            password,
            connect_timeout_secs,
            encryption,
            trust_cert,
        })
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    /// Named instance without an explicit port goes through SQL Browser.
    pub fn needs_browser(&self) -> bool {
        self.port.is_none() && self.instance.as_deref().is_some_and(|i| !i.is_empty())
    }

    pub fn to_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port.unwrap_or(DEFAULT_PORT));
        if let Some(instance) = self.instance.as_deref().filter(|i| !i.is_empty()) {
            config.instance_name(instance);
        }
        if let Some(database) = &self.database {
            config.database(database);
        }
        config.authentication(AuthMethod::sql_server(
            self.user.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        ));
        config.encryption(self.encryption);
        if self.trust_cert {
            config.trust_cert();
        }
        config.application_name("mssql-connect");
        config
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("instance", &self.instance)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("encryption", &self.encryption)
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

/// `[tcp:]host[\instance][,port]`
fn split_server(raw: &str) -> Result<(String, Option<String>, Option<u16>), MssqlError> {
    let raw = raw.strip_prefix("tcp:").unwrap_or(raw);

    let (rest, port) = match raw.rsplit_once(',') {
        Some((rest, port)) => {
            let port = port.trim().parse().map_err(|_| MssqlError::InvalidValue {
                key: "server",
                value: raw.to_string(),
            })?;
            (rest, Some(port))
        }
        None => (raw, None),
    };

    let (host, instance) = match rest.split_once('\\') {
        Some((host, instance)) => (host, Some(instance.to_string())),
        None => (rest, None),
    };

    if host.trim().is_empty() {
        return Err(MssqlError::MissingServer);
    }
    Ok((host.trim().to_string(), instance, port))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, MssqlError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        _ => Err(MssqlError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_encrypt(value: &str) -> Result<EncryptionLevel, MssqlError> {
    match value.to_ascii_lowercase().as_str() {
        "disable" => Ok(EncryptionLevel::NotSupported),
        "false" | "no" | "optional" => Ok(EncryptionLevel::Off),
        "true" | "yes" | "mandatory" | "strict" => Ok(EncryptionLevel::Required),
        _ => Err(MssqlError::InvalidValue {
            key: "encrypt",
            value: value.to_string(),
        }),
    }
}
