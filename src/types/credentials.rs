use std::fmt;

pub const REDACTED: &str = "***REDACTED***";

/// Database name and login. Values are passed through untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}
