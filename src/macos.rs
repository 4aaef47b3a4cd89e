//! Default gateway lookup with `route get` and `ifconfig`.
//!
//! Both tools print loosely formatted text, so every scalar is read with
//! [`extract_row_value`]: find the row carrying a key token and take the token
//! right after it.

use crate::{
    error::{Error, Result},
    resolver::GatewaySource,
    AddressFamily, CommandExecutor, NetworkDefaultGateway,
};
use async_trait::async_trait;
use std::net::Ipv6Addr;

const ROUTE: &str = "route";
const IFCONFIG: &str = "ifconfig";

/// Gateway parser for macOS hosts
#[derive(Debug)]
pub struct MacOsParser<'a, E> {
    executor: &'a E,
}

impl<'a, E: CommandExecutor> MacOsParser<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        MacOsParser { executor }
    }
}

#[async_trait]
impl<E: CommandExecutor> GatewaySource for MacOsParser<'_, E> {
    async fn default_gateway(&self, family: AddressFamily) -> Result<NetworkDefaultGateway> {
        let family_flag = match family {
            AddressFamily::V4 => "-inet",
            AddressFamily::V6 => "-inet6",
        };
        let route = self
            .executor
            .execute(&[ROUTE, "-n", "get", family_flag, "default"], None)
            .await?;
        if route.trim().is_empty() {
            return Err(Error::GatewayNotAvailable(family));
        }
        let gateway =
            extract_row_value(&route, "gateway").ok_or(Error::GatewayNotAvailable(family))?;
        let interface =
            extract_row_value(&route, "interface").ok_or(Error::DefaultInterfaceNotFound)?;
        tracing::debug!(%gateway, %interface, "default route");

        let detail = self.executor.execute(&[IFCONFIG, interface], None).await?;
        parse_interface(family, gateway, interface, &detail)
    }
}

/// Build the result from `ifconfig <interface>` output
fn parse_interface(
    family: AddressFamily,
    gateway: &str,
    interface: &str,
    detail: &str,
) -> Result<NetworkDefaultGateway> {
    if extract_row_value(detail, "status") != Some("active") {
        return Err(Error::DefaultInterfaceNotFound);
    }

    let key = address_key(family);
    let row =
        address_row(detail, family).ok_or_else(|| Error::DeviceIpNotFound(interface.into()))?;
    let ip =
        extract_row_value(row, key).ok_or_else(|| Error::DeviceIpNotFound(interface.into()))?;

    let prefix_length = match family {
        AddressFamily::V4 => {
            let netmask = extract_row_value(row, "netmask")
                .ok_or_else(|| Error::NetmaskNotFound(interface.into()))?;
            netmask_to_prefix_length(netmask)?
        }
        AddressFamily::V6 => extract_row_value(row, "prefixlen")
            .and_then(|len| len.parse().ok())
            .ok_or_else(|| Error::PrefixLengthNotFound(interface.into()))?,
    };

    NetworkDefaultGateway::new(family, ip, gateway, interface, prefix_length)
}

fn address_key(family: AddressFamily) -> &'static str {
    match family {
        AddressFamily::V4 => "inet",
        AddressFamily::V6 => "inet6",
    }
}

/// Pick the address row for `family` out of `ifconfig` output.
///
/// Rows must start with exactly `inet` or `inet6`. For IPv6 the first
/// address outside `fe80::/10` is preferred over link-local ones.
fn address_row(detail: &str, family: AddressFamily) -> Option<&str> {
    let key = address_key(family);
    let mut rows = detail
        .lines()
        .filter(|line| line.split_ascii_whitespace().next() == Some(key));
    match family {
        AddressFamily::V4 => rows.next(),
        AddressFamily::V6 => {
            let rows: Vec<&str> = rows.collect();
            rows.iter()
                .copied()
                .find(|row| !is_link_local(row))
                .or_else(|| rows.first().copied())
        }
    }
}

fn is_link_local(row: &str) -> bool {
    extract_row_value(row, "inet6")
        .and_then(|addr| addr.split('%').next())
        .and_then(|addr| addr.parse::<Ipv6Addr>().ok())
        .is_some_and(|addr| (addr.segments()[0] & 0xffc0) == 0xfe80)
}

/// Return the token following `key` on the first row that contains it.
///
/// A token matches when it equals `key`, optionally followed by a colon
/// (`gateway: 192.168.1.1`). Returns `None` if no row carries the key.
#[must_use]
pub fn extract_row_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let mut tokens = line.split_ascii_whitespace();
        tokens
            .by_ref()
            .find(|token| *token == key || token.strip_suffix(':') == Some(key))?;
        tokens.next()
    })
}

/// Count the set bits of a hexadecimal netmask such as `0xffffff00` or
/// `FFFFFF00`.
///
/// # Errors
///
/// Returns `Error::NetmaskNotValid` if `netmask` is not hexadecimal, and
/// `Error::PrefixLengthNotValid` if it has more than 32 bits set.
pub fn netmask_to_prefix_length(netmask: &str) -> Result<u32> {
    let hex = netmask
        .strip_prefix("0x")
        .or_else(|| netmask.strip_prefix("0X"))
        .unwrap_or(netmask);
    let bits = hex
        .chars()
        .map(|digit| digit.to_digit(16).map(u32::count_ones))
        .sum::<Option<u32>>()
        .filter(|_| !hex.is_empty())
        .ok_or_else(|| Error::NetmaskNotValid(netmask.to_owned()))?;
    if bits > 32 {
        return Err(Error::PrefixLengthNotValid(bits));
    }
    Ok(bits)
}
