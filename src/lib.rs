//! Default gateway discovery built on the host's own routing utilities.
//!
//! Linux is queried with `ip -j`, macOS with `route get` and `ifconfig`, and
//! Windows with `Get-NetRoute` / `Get-NetIPAddress` through PowerShell. Each
//! platform's output is reduced to a [`NetworkDefaultGateway`].

mod error;
mod executor;
pub mod linux;
pub mod macos;
mod platform;
mod resolver;
mod selector;
pub mod windows;

use cidr::IpInet;
use serde::Serialize;
use std::net::IpAddr;

pub use error::{Error, Result};
pub use executor::{CommandExecutor, TokioExecutor};
pub use linux::LinuxParser;
pub use macos::MacOsParser;
pub use platform::Platform;
pub use resolver::{Adapter, GatewayResolver, GatewaySource};
pub use windows::WindowsParser;

/// Internet Protocols a default gateway can be requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Whether `addr` belongs to this family
    #[must_use]
    pub fn matches(self, addr: &IpAddr) -> bool {
        matches!(
            (self, addr),
            (AddressFamily::V4, IpAddr::V4(_)) | (AddressFamily::V6, IpAddr::V6(_))
        )
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
        })
    }
}

/// The host's default gateway for one address family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDefaultGateway {
    ip: String,
    gateway: String,
    interface: String,
    prefix_length: u8,
    #[serde(skip)]
    inet: IpInet,
    #[serde(skip)]
    gateway_addr: IpAddr,
}

impl NetworkDefaultGateway {
    /// Validate the raw fields of a selected interface.
    ///
    /// IPv6 zone suffixes (`%en0`) are dropped from both addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if either address is not of `family`, the prefix
    /// length is out of range for `family`, or `interface` is empty.
    pub fn new(
        family: AddressFamily,
        ip: &str,
        gateway: &str,
        interface: &str,
        prefix_length: u32,
    ) -> Result<Self> {
        let addr = parse_addr(family, ip)?;
        let gateway_addr = parse_addr(family, gateway)?;
        if interface.is_empty() {
            return Err(Error::DefaultInterfaceNotFound);
        }
        let len = u8::try_from(prefix_length)
            .map_err(|_| Error::PrefixLengthNotValid(prefix_length))?;
        let inet =
            IpInet::new(addr, len).map_err(|_| Error::PrefixLengthNotValid(prefix_length))?;

        Ok(NetworkDefaultGateway {
            ip: addr.to_string(),
            gateway: gateway_addr.to_string(),
            interface: interface.to_owned(),
            prefix_length: len,
            inet,
            gateway_addr,
        })
    }

    #[must_use]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    #[must_use]
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    #[must_use]
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    #[must_use]
    pub fn ip_addr(&self) -> IpAddr {
        self.inet.address()
    }

    #[must_use]
    pub fn gateway_addr(&self) -> IpAddr {
        self.gateway_addr
    }

    /// The interface address together with its prefix length
    #[must_use]
    pub fn inet(&self) -> IpInet {
        self.inet
    }
}

impl std::fmt::Display for NetworkDefaultGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} via {} on {}",
            self.ip, self.prefix_length, self.gateway, self.interface
        )
    }
}

fn parse_addr(family: AddressFamily, raw: &str) -> Result<IpAddr> {
    let bare = raw.split('%').next().unwrap_or_default();
    match bare.parse::<IpAddr>() {
        Ok(addr) if family.matches(&addr) => Ok(addr),
        _ => Err(Error::InvalidAddress {
            addr: raw.to_owned(),
            family,
        }),
    }
}

/// Resolve the host's default gateway for `family` using the system tools.
///
/// # Errors
///
/// Returns an error if the platform is unsupported, a command fails, or no
/// usable default route exists for `family`.
pub async fn default_gateway(family: AddressFamily) -> Result<NetworkDefaultGateway> {
    GatewayResolver::new(TokioExecutor)
        .default_gateway(family)
        .await
}

/// Resolve the host's IPv4 default gateway.
///
/// # Errors
///
/// See [`default_gateway`].
pub async fn v4_default_gateway() -> Result<NetworkDefaultGateway> {
    default_gateway(AddressFamily::V4).await
}

/// Resolve the host's IPv6 default gateway.
///
/// # Errors
///
/// See [`default_gateway`].
pub async fn v6_default_gateway() -> Result<NetworkDefaultGateway> {
    default_gateway(AddressFamily::V6).await
}
