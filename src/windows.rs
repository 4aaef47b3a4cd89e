//! Default gateway lookup with the `NetTCPIP` PowerShell cmdlets.
//!
//! `Get-NetRoute` lists the default routes and `Get-NetIPAddress` the
//! addresses of the routes' interfaces, both rendered with `ConvertTo-Json`.
//! Route rows and address rows are joined on the interface index.

use crate::{
    error::{Error, Result},
    resolver::GatewaySource,
    selector::{self, Candidate},
    AddressFamily, CommandExecutor, NetworkDefaultGateway,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};

/// PowerShell reading its script from stdin
const POWERSHELL: [&str; 5] = ["powershell", "-NoProfile", "-NonInteractive", "-Command", "-"];

/// Make redirected output UTF-8 rather than the console's OEM code page
const UTF8_OUTPUT: &str = "[Console]::OutputEncoding=[Text.Encoding]::UTF8;";

/// `ConvertTo-Json` renders a single result as a bare object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(rows: OneOrMany<T>) -> Self {
        match rows {
            OneOrMany::Many(rows) => rows,
            OneOrMany::One(row) => vec![row],
        }
    }
}

/// An enum property, serialized either by value or by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum EnumValue {
    Code(u32),
    Name(String),
}

impl EnumValue {
    fn is(&self, code: u32, name: &str) -> bool {
        match self {
            EnumValue::Code(value) => *value == code,
            EnumValue::Name(value) => value.eq_ignore_ascii_case(name),
        }
    }
}

/// One row of `Get-NetRoute | Select ifIndex,NextHop,InterfaceMetric`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RouteRow {
    #[serde(rename = "ifIndex")]
    if_index: u32,
    next_hop: String,
    #[serde(default)]
    interface_metric: u32,
}

/// One row of `Get-NetIPAddress | Select ifIndex,IPAddress,...`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddressRow {
    #[serde(rename = "ifIndex")]
    if_index: u32,
    #[serde(rename = "IPAddress")]
    ip_address: String,
    interface_alias: String,
    address_family: EnumValue,
    prefix_length: u32,
    address_state: EnumValue,
}

/// A default route joined with one address of its interface
#[derive(Debug)]
pub(crate) struct WindowsCandidate {
    next_hop: String,
    interface_metric: u32,
    ip_address: String,
    interface_alias: String,
    address_family: EnumValue,
    prefix_length: u32,
    address_state: EnumValue,
}

impl Candidate for WindowsCandidate {
    fn family(&self) -> Option<AddressFamily> {
        if self.address_family.is(2, "IPv4") {
            Some(AddressFamily::V4)
        } else if self.address_family.is(23, "IPv6") {
            Some(AddressFamily::V6)
        } else {
            None
        }
    }

    fn is_usable(&self) -> bool {
        self.address_state.is(4, "Preferred")
    }

    fn metric(&self) -> u32 {
        self.interface_metric
    }

    fn into_gateway(self, family: AddressFamily) -> Result<NetworkDefaultGateway> {
        NetworkDefaultGateway::new(
            family,
            &self.ip_address,
            &self.next_hop,
            &self.interface_alias,
            self.prefix_length,
        )
    }
}

pub(crate) fn route_script(family: AddressFamily) -> String {
    let prefix = match family {
        AddressFamily::V4 => "0.0.0.0/0",
        AddressFamily::V6 => "::/0",
    };
    format!(
        "{UTF8_OUTPUT}Get-NetRoute | Where DestinationPrefix -eq \"{prefix}\" \
         | Select ifIndex,NextHop,InterfaceMetric | ConvertTo-Json"
    )
}

pub(crate) fn address_script(if_indexes: &[u32]) -> String {
    let ids = if_indexes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{UTF8_OUTPUT}Get-NetIPAddress | Where InterfaceIndex -in {ids} \
         | Select ifIndex,IPAddress,InterfaceAlias,AddressFamily,PrefixLength,AddressState \
         | ConvertTo-Json"
    )
}

/// Gateway parser for Windows hosts
#[derive(Debug)]
pub struct WindowsParser<'a, E> {
    executor: &'a E,
}

impl<'a, E: CommandExecutor> WindowsParser<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        WindowsParser { executor }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        script: &str,
        family: AddressFamily,
    ) -> Result<Vec<T>> {
        tracing::debug!(%script, "running PowerShell query");
        let output = self.executor.execute(&POWERSHELL, Some(script)).await?;
        parse_rows(&output, family)
    }
}

#[async_trait]
impl<E: CommandExecutor> GatewaySource for WindowsParser<'_, E> {
    async fn default_gateway(&self, family: AddressFamily) -> Result<NetworkDefaultGateway> {
        let routes: Vec<RouteRow> = self.query(&route_script(family), family).await?;
        if routes.is_empty() {
            return Err(Error::GatewayNotAvailable(family));
        }

        let mut if_indexes: Vec<u32> = routes.iter().map(|route| route.if_index).collect();
        if_indexes.sort_unstable();
        if_indexes.dedup();

        let addresses: Vec<AddressRow> = self.query(&address_script(&if_indexes), family).await?;
        selector::select_gateway(join(&routes, &addresses), family)
    }
}

fn parse_rows<T: DeserializeOwned>(output: &str, family: AddressFamily) -> Result<Vec<T>> {
    if output.trim().is_empty() {
        return Err(Error::GatewayNotAvailable(family));
    }
    let rows: OneOrMany<T> = serde_json::from_str(output)?;
    Ok(rows.into())
}

/// Pair every route with every address sharing its interface index
fn join(routes: &[RouteRow], addresses: &[AddressRow]) -> Vec<WindowsCandidate> {
    let mut candidates = Vec::new();
    for route in routes {
        for address in addresses.iter().filter(|addr| addr.if_index == route.if_index) {
            candidates.push(WindowsCandidate {
                next_hop: route.next_hop.clone(),
                interface_metric: route.interface_metric,
                ip_address: address.ip_address.clone(),
                interface_alias: address.interface_alias.clone(),
                address_family: address.address_family.clone(),
                prefix_length: address.prefix_length,
                address_state: address.address_state.clone(),
            });
        }
    }
    candidates
}
