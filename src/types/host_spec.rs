use std::fmt;

/// Raw host identifier: `host` or `host\instance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    server: String,
    instance: Option<String>,
}

impl HostSpec {
    /// Split on the first backslash. `host\` keeps an empty instance.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('\\') {
            Some((server, instance)) => Self {
                server: server.to_string(),
                instance: Some(instance.to_string()),
            },
            None => Self {
                server: raw.to_string(),
                instance: None,
            },
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}\\{}", self.server, instance),
            None => f.write_str(&self.server),
        }
    }
}
