use crate::error::MssqlError;
use crate::net::{LocalMachine, SystemMachine, usable_ipv4};
use crate::types::credentials::REDACTED;
use crate::types::{Credentials, HostSpec};
use std::fmt;
use tracing::{debug, warn};

/// Seconds written into every built connection string.
pub const CONNECTION_TIMEOUT_SECS: u64 = 3600;

/// Semicolon-delimited `key=value` string handed to the driver.
///
/// Field values are not escaped; a `;` or `=` inside a password ends up as
/// an extra segment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionString(String);

impl ConnectionString {
    pub fn new(server: &str, creds: &Credentials) -> Self {
        Self(format!(
            "server={};database={};user id={};password={};connection timeout={};encrypt=disable",
            server, creds.database, creds.username, creds.password, CONNECTION_TIMEOUT_SECS
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same string with the password value masked, for logs.
    ///
    /// A password containing `;` spills into extra segments, so everything
    /// from the password value up to the last `;connection timeout=` (or the
    /// end of the string) is masked.
    pub fn redacted(&self) -> String {
        let Some(start) = password_value_start(&self.0) else {
            return self.0.clone();
        };
        // ASCII lowercasing keeps byte offsets intact.
        let end = self.0[start..]
            .to_ascii_lowercase()
            .rfind(PASSWORD_TERMINATOR)
            .map_or(self.0.len(), |i| start + i);
        format!("{}{REDACTED}{}", &self.0[..start], &self.0[end..])
    }
}

const PASSWORD_TERMINATOR: &str = ";connection timeout=";

/// Byte offset of the first password value.
fn password_value_start(s: &str) -> Option<usize> {
    let mut offset = 0;
    for segment in s.split(';') {
        match segment.split_once('=') {
            Some((key, _)) if is_password_key(key) => return Some(offset + key.len() + 1),
            _ => offset += segment.len() + 1,
        }
    }
    None
}

pub(crate) fn is_password_key(key: &str) -> bool {
    matches!(key.trim().to_ascii_lowercase().as_str(), "password" | "pwd")
}

impl From<String> for ConnectionString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionString")
            .field(&self.redacted())
            .finish()
    }
}

/// Builds connection strings, swapping the local hostname for a routable
/// IPv4 address.
///
/// Connecting to the local server by name can pick up an IPv6 loopback
/// address, which the driver then fails to log in over. When the requested
/// server looks like this machine, the first non-loopback IPv4 interface
/// address is used instead.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStringBuilder<M = SystemMachine> {
    machine: M,
}

impl ConnectionStringBuilder<SystemMachine> {
    pub fn new() -> Self {
        Self {
            machine: SystemMachine,
        }
    }
}

impl<M: LocalMachine> ConnectionStringBuilder<M> {
    pub fn with_machine(machine: M) -> Self {
        Self { machine }
    }

    /// Returns an empty string when interfaces can't be listed; the error is
    /// only logged.
    pub fn build(
        &self,
        host: &HostSpec,
        creds: &Credentials,
    ) -> Result<ConnectionString, MssqlError> {
        let hostname = self.machine.hostname()?;

        // Substring, not equality: "PRODMYHOSTBOX" matches "myhost".
        if host
            .server()
            .to_uppercase()
            .contains(&hostname.to_uppercase())
        {
            let addrs = match self.machine.interface_addrs() {
                Ok(addrs) => addrs,
                Err(e) => {
                    warn!(error = %e, "failed to list interface addresses");
                    return Ok(ConnectionString::default());
                }
            };

            if let Some(ip) = addrs.into_iter().find_map(usable_ipv4) {
                let server = match host.instance() {
                    Some(instance) => format!("{ip}\\{instance}"),
                    None => ip.to_string(),
                };
                debug!(
                    requested = %host,
                    hostname = %hostname,
                    server = %server,
                    "local server name replaced by interface address"
                );
                return Ok(ConnectionString::new(&server, creds));
            }
        }

        Ok(ConnectionString::new(host.server(), creds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    struct FakeMachine {
        hostname: Option<&'static str>,
        addrs: Option<Vec<IpAddr>>,
    }

    impl LocalMachine for FakeMachine {
        fn hostname(&self) -> Result<String, MssqlError> {
            self.hostname
                .map(str::to_string)
                .ok_or_else(|| MssqlError::Hostname(io::Error::other("no hostname")))
        }

        fn interface_addrs(&self) -> Result<Vec<IpAddr>, MssqlError> {
            self.addrs
                .clone()
                .ok_or_else(|| MssqlError::Io(io::Error::other("netlink unavailable")))
        }
    }

    fn builder(hostname: &'static str, addrs: Vec<IpAddr>) -> ConnectionStringBuilder<FakeMachine> {
        ConnectionStringBuilder::with_machine(FakeMachine {
            hostname: Some(hostname),
            addrs: Some(addrs),
        })
    }

    fn creds() -> Credentials {
        Credentials::new("import", "sa", "secret")
    }

    fn lan() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))
    }

    #[test]
    fn remote_host_builds_exact_string() {
        let out = builder("myhost", vec![lan()])
            .build(&HostSpec::parse("dbserver"), &creds())
            .unwrap();
        assert_eq!(
            out.as_str(),
            "server=dbserver;database=import;user id=sa;password=secret;connection timeout=3600;encrypt=disable"
        );
    }

    #[test]
    fn remote_host_drops_instance() {
        let out = builder("myhost", vec![lan()])
            .build(&HostSpec::parse(r"dbserver\INST1"), &creds())
            .unwrap();
        assert!(out.as_str().starts_with("server=dbserver;"));
    }

    #[test]
    fn local_host_with_instance_uses_ipv4() {
        let addrs = vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST), lan()];
        let out = builder("myhost", addrs)
            .build(&HostSpec::parse(r"myhost\INST1"), &creds())
            .unwrap();
        assert!(out.as_str().starts_with(r"server=10.0.0.5\INST1;database=import;"));
    }

    #[test]
    fn local_host_without_instance_uses_bare_ipv4() {
        let out = builder("myhost", vec![lan()])
            .build(&HostSpec::parse("myhost"), &creds())
            .unwrap();
        assert!(out.as_str().starts_with("server=10.0.0.5;database=import;"));
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let out = builder("myhost", vec![lan()])
            .build(&HostSpec::parse("PRODMYHOSTBOX"), &creds())
            .unwrap();
        assert!(out.as_str().starts_with("server=10.0.0.5;"));
    }

    #[test]
    fn first_ipv4_wins() {
        let addrs = vec![
            "fe80::1".parse().unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7)),
            lan(),
        ];
        let out = builder("myhost", addrs)
            .build(&HostSpec::parse("myhost"), &creds())
            .unwrap();
        assert!(out.as_str().starts_with("server=192.168.1.7;"));
    }

    #[test]
    fn no_usable_ipv4_falls_back_to_server() {
        let addrs = vec![IpAddr::V4(Ipv4Addr::LOCALHOST), "fe80::1".parse().unwrap()];
        let out = builder("myhost", addrs)
            .build(&HostSpec::parse(r"MYHOST\INST1"), &creds())
            .unwrap();
        assert!(out.as_str().starts_with("server=MYHOST;database=import;"));
    }

    #[test]
    fn hostname_failure_is_an_error() {
        let b = ConnectionStringBuilder::with_machine(FakeMachine {
            hostname: None,
            addrs: Some(vec![lan()]),
        });
        let err = b.build(&HostSpec::parse("myhost"), &creds()).unwrap_err();
        assert!(matches!(err, MssqlError::Hostname(_)));
    }

    #[test]
    fn enumeration_failure_yields_empty_string() {
        let b = ConnectionStringBuilder::with_machine(FakeMachine {
            hostname: Some("myhost"),
            addrs: None,
        });
        let out = b.build(&HostSpec::parse("myhost"), &creds()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn enumeration_is_skipped_for_remote_hosts() {
        let b = ConnectionStringBuilder::with_machine(FakeMachine {
            hostname: Some("myhost"),
            addrs: None,
        });
        let out = b.build(&HostSpec::parse("elsewhere"), &creds()).unwrap();
        assert!(out.as_str().starts_with("server=elsewhere;"));
    }

    #[test]
    fn fields_are_not_escaped() {
        let out = builder("myhost", vec![])
            .build(&HostSpec::parse("db"), &Credentials::new("d", "u", "p;x=1"))
            .unwrap();
        assert!(out.as_str().contains("password=p;x=1;connection timeout=3600"));
    }

    #[test]
    fn redacted_masks_password() {
        let cs = ConnectionString::new("db", &creds());
        let shown = cs.redacted();
        assert_eq!(
            shown,
            "server=db;database=import;user id=sa;password=***REDACTED***;connection timeout=3600;encrypt=disable"
        );
        assert!(!format!("{cs:?}").contains("secret"));
        assert!(cs.to_string().contains("password=secret"));
    }

    #[test]
    fn redacted_masks_password_spilling_over_semicolons() {
        let cs = ConnectionString::new("db", &Credentials::new("d", "u", "hunter2;tail=SECRET;connection timeout=9"));
        let shown = cs.redacted();
        assert_eq!(
            shown,
            "server=db;database=d;user id=u;password=***REDACTED***;connection timeout=3600;encrypt=disable"
        );
        assert!(!format!("{cs:?}").contains("SECRET"));
    }

    #[test]
    fn redacted_masks_to_end_without_timeout_field() {
        let cs = ConnectionString::from("server=db01;PWD=abc;x=1;encrypt=true");
        assert_eq!(cs.redacted(), "server=db01;PWD=***REDACTED***");

        let plain = ConnectionString::from("server=db01;user id=sa");
        assert_eq!(plain.redacted(), "server=db01;user id=sa");
    }
}
