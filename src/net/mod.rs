//! Local machine lookups used when the target server is this host.

use crate::error::MssqlError;
use std::net::{IpAddr, Ipv4Addr};

/// Source of the local hostname and interface addresses.
pub trait LocalMachine: Send + Sync {
    fn hostname(&self) -> Result<String, MssqlError>;

    /// Addresses in the order the OS reports them.
    fn interface_addrs(&self) -> Result<Vec<IpAddr>, MssqlError>;
}

/// The real machine, via `hostname` and `local-ip-address`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMachine;

impl LocalMachine for SystemMachine {
    fn hostname(&self) -> Result<String, MssqlError> {
        let name = hostname::get().map_err(MssqlError::Hostname)?;
        Ok(name.to_string_lossy().into_owned())
    }

    fn interface_addrs(&self) -> Result<Vec<IpAddr>, MssqlError> {
        let addrs = local_ip_address::list_afinet_netifas()?
            .into_iter()
            .map(|(_name, ip)| ip)
            .collect();
        Ok(addrs)
    }
}

/// IPv4 form of a non-loopback address. IPv4-mapped IPv6 addresses count.
pub fn usable_ipv4(ip: IpAddr) -> Option<Ipv4Addr> {
    let v4 = match ip {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) if v6.is_loopback() => return None,
        IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
    };
    (!v4.is_loopback()).then_some(v4)
}
