use crate::error::MssqlError;
use crate::types::{CliArgs, Credentials, HostSpec};
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "MSSQL_";

/// Runtime settings. Layered as defaults, then `MSSQL_*` env, then CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub dbname: String,
    pub username: String,
    pub pass: String,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            dbname: String::new(),
            username: String::new(),
            pass: String::new(),
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(env_layer())
    }

    pub fn load(args: &CliArgs) -> Result<Self, MssqlError> {
        let cfg = Self::figment()
            .merge(Serialized::defaults(args))
            .extract()?;
        Ok(cfg)
    }

    pub fn host_spec(&self) -> HostSpec {
        HostSpec::parse(&self.host)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.dbname, &self.username, &self.pass)
    }
}

/// `MSSQL_*` variables as raw strings.
///
/// Merging `Env` directly would parse `12345` as an integer and `[abc]` as a
/// sequence, which then fails to land in the `String` fields.
fn env_layer() -> Figment {
    Env::prefixed(ENV_PREFIX)
        .iter()
        .fold(Figment::new(), |figment, (key, value)| {
            figment.merge(Serialized::default(
                &key.as_str().to_ascii_lowercase(),
                value,
            ))
        })
}
