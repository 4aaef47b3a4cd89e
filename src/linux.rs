//! Default gateway lookup with iproute2's JSON output.
//!
//! `ip -j route show default` yields the default routes, and every distinct
//! device among them is then described by `ip -j addr show <device>`. Each
//! address assigned to a route's device becomes one candidate.

use crate::{
    error::{Error, Result},
    resolver::GatewaySource,
    selector::{self, Candidate},
    AddressFamily, CommandExecutor, NetworkDefaultGateway,
};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;

const IP: &str = "ip";

/// One entry of `ip -j route show default`
#[derive(Debug, Deserialize)]
struct RouteRecord {
    dev: String,
    gateway: Option<String>,
    #[serde(default)]
    metric: u32,
}

/// One entry of `ip -j addr show <device>`
#[derive(Debug, Deserialize)]
struct LinkRecord {
    ifname: String,
    #[serde(default)]
    operstate: String,
    #[serde(default)]
    addr_info: Vec<AddrInfo>,
}

// Some kernels emit entries that carry only lifetimes
#[derive(Debug, Deserialize)]
struct AddrInfo {
    family: Option<String>,
    local: Option<String>,
    prefixlen: Option<u32>,
}

/// A default route joined with one address of its device
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinuxCandidate {
    dev: String,
    gateway: String,
    metric: u32,
    operstate: String,
    family: String,
    local: String,
    prefixlen: u32,
}

impl Candidate for LinuxCandidate {
    fn family(&self) -> Option<AddressFamily> {
        match self.family.as_str() {
            "inet" => Some(AddressFamily::V4),
            "inet6" => Some(AddressFamily::V6),
            _ => None,
        }
    }

    fn is_usable(&self) -> bool {
        self.operstate == "UP"
    }

    fn metric(&self) -> u32 {
        self.metric
    }

    fn into_gateway(self, family: AddressFamily) -> Result<NetworkDefaultGateway> {
        NetworkDefaultGateway::new(family, &self.local, &self.gateway, &self.dev, self.prefixlen)
    }
}

/// Gateway parser for Linux hosts
#[derive(Debug)]
pub struct LinuxParser<'a, E> {
    executor: &'a E,
}

impl<'a, E: CommandExecutor> LinuxParser<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        LinuxParser { executor }
    }

    async fn default_routes(&self, family: AddressFamily) -> Result<Vec<RouteRecord>> {
        let family_flag = match family {
            AddressFamily::V4 => "-4",
            AddressFamily::V6 => "-6",
        };
        let output = self
            .executor
            .execute(&[IP, family_flag, "-j", "route", "show", "default"], None)
            .await?;
        let routes = parse_routes(&output)?;
        if routes.is_empty() {
            return Err(Error::GatewayNotAvailable(family));
        }
        Ok(routes)
    }

    async fn link_details(&self, dev: &str) -> Result<Vec<LinkRecord>> {
        let output = self
            .executor
            .execute(&[IP, "-j", "addr", "show", dev], None)
            .await?;
        parse_links(&output)
    }

    async fn candidates(&self, family: AddressFamily) -> Result<Vec<LinuxCandidate>> {
        let routes = self.default_routes(family).await?;

        let mut devices: Vec<&str> = Vec::new();
        for route in &routes {
            if !devices.contains(&route.dev.as_str()) {
                devices.push(&route.dev);
            }
        }
        tracing::debug!(?devices, "querying default route devices");

        let links: Vec<LinkRecord> = try_join_all(devices.iter().map(|dev| self.link_details(dev)))
            .await?
            .into_iter()
            .flatten()
            .collect();

        Ok(join(&routes, &links))
    }
}

#[async_trait]
impl<E: CommandExecutor> GatewaySource for LinuxParser<'_, E> {
    async fn default_gateway(&self, family: AddressFamily) -> Result<NetworkDefaultGateway> {
        let candidates = self.candidates(family).await?;
        selector::select_gateway(candidates, family)
    }
}

fn parse_routes(output: &str) -> Result<Vec<RouteRecord>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let routes: Vec<RouteRecord> = serde_json::from_str(output)?;
    // A gatewayless default (point-to-point) has nothing to report
    Ok(routes
        .into_iter()
        .filter(|route| route.gateway.is_some())
        .collect())
}

fn parse_links(output: &str) -> Result<Vec<LinkRecord>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(output)?)
}

/// Pair every route with every address on the route's device
fn join(routes: &[RouteRecord], links: &[LinkRecord]) -> Vec<LinuxCandidate> {
    let mut candidates = Vec::new();
    for route in routes {
        let Some(gateway) = &route.gateway else {
            continue;
        };
        for link in links.iter().filter(|link| link.ifname == route.dev) {
            for addr in &link.addr_info {
                let (Some(family), Some(local), Some(prefixlen)) =
                    (&addr.family, &addr.local, addr.prefixlen)
                else {
                    continue;
                };
                candidates.push(LinuxCandidate {
                    dev: route.dev.clone(),
                    gateway: gateway.clone(),
                    metric: route.metric,
                    operstate: link.operstate.clone(),
                    family: family.clone(),
                    local: local.clone(),
                    prefixlen,
                });
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::{join, parse_links, parse_routes, LinuxParser};
    use crate::{
        executor::fake::ScriptedExecutor, AddressFamily, Error, GatewaySource,
        NetworkDefaultGateway,
    };

    include!(concat!(env!("OUT_DIR"), "/sample_outputs.rs"));

    async fn resolve(
        executor: &ScriptedExecutor,
        family: AddressFamily,
    ) -> crate::Result<NetworkDefaultGateway> {
        LinuxParser::new(executor).default_gateway(family).await
    }

    #[tokio::test]
    async fn single_route() {
        let executor = ScriptedExecutor::new()
            .answer("ip -4 -j route show default", LINUX_ROUTE_V4)
            .answer("ip -j addr show eth0", LINUX_ADDR_ETH0);
        let gw = resolve(&executor, AddressFamily::V4).await.expect("gateway");
        assert_eq!(
            gw,
            NetworkDefaultGateway::new(AddressFamily::V4, "192.168.1.15", "192.168.1.1", "eth0", 24)
                .unwrap()
        );
    }

    #[tokio::test]
    async fn synthetic_route() {
        let executor = ScriptedExecutor::new()
            .answer(
                "ip -4 -j route show default",
                r#"[{"dst":"default","gateway":"192.168.1.1","dev":"eth0","metric":100}]"#,
            )
            .answer(
                "ip -j addr show eth0",
                r#"[{"ifname":"eth0","operstate":"UP","addr_info":[{"family":"inet","local":"192.168.1.15","prefixlen":24}]}]"#,
            );
        let gw = resolve(&executor, AddressFamily::V4).await.expect("gateway");
        assert_eq!(gw.ip(), "192.168.1.15");
        assert_eq!(gw.gateway(), "192.168.1.1");
        assert_eq!(gw.interface(), "eth0");
        assert_eq!(gw.prefix_length(), 24);
    }

    #[tokio::test]
    async fn ipv6_route() {
        let executor = ScriptedExecutor::new()
            .answer("ip -6 -j route show default", LINUX_ROUTE_V6)
            .answer("ip -j addr show eth0", LINUX_ADDR_ETH0);
        let gw = resolve(&executor, AddressFamily::V6).await.expect("gateway");
        // First inet6 address of the device wins the equal-metric tie
        assert_eq!(gw.ip(), "2001:db8:1234::15");
        assert_eq!(gw.gateway(), "fe80::1");
        assert_eq!(gw.prefix_length(), 64);
    }

    #[tokio::test]
    async fn lowest_metric_device() {
        let executor = ScriptedExecutor::new()
            .answer("ip -4 -j route show default", LINUX_ROUTE_V4_MULTI)
            .answer("ip -j addr show eth0", LINUX_ADDR_ETH0)
            .answer("ip -j addr show wlan0", LINUX_ADDR_WLAN0);
        let gw = resolve(&executor, AddressFamily::V4).await.expect("gateway");
        assert_eq!(gw.interface(), "eth0");

        // Each device is described exactly once
        let calls = executor.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, stdin)| stdin.is_none()));
    }

    #[tokio::test]
    async fn down_device_skipped() {
        let eth0_down = LINUX_ADDR_ETH0.replace(r#""operstate":"UP""#, r#""operstate":"DOWN""#);
        let executor = ScriptedExecutor::new()
            .answer("ip -4 -j route show default", LINUX_ROUTE_V4_MULTI)
            .answer("ip -j addr show eth0", &eth0_down)
            .answer("ip -j addr show wlan0", LINUX_ADDR_WLAN0);
        let gw = resolve(&executor, AddressFamily::V4).await.expect("gateway");
        assert_eq!(gw.interface(), "wlan0");
        assert_eq!(gw.ip(), "10.20.0.42");
        assert_eq!(gw.prefix_length(), 16);
    }

    #[tokio::test]
    async fn all_down() {
        let eth0_down = LINUX_ADDR_ETH0.replace(r#""operstate":"UP""#, r#""operstate":"DOWN""#);
        let executor = ScriptedExecutor::new()
            .answer("ip -4 -j route show default", LINUX_ROUTE_V4)
            .answer("ip -j addr show eth0", &eth0_down);
        let result = resolve(&executor, AddressFamily::V4).await;
        assert!(matches!(result, Err(Error::NoAvailableNetwork)));
    }

    #[tokio::test]
    async fn no_matching_family() {
        let executor = ScriptedExecutor::new()
            .answer("ip -6 -j route show default", LINUX_ROUTE_V6)
            .answer("ip -j addr show eth0", LINUX_ADDR_WLAN0);
        let result = resolve(&executor, AddressFamily::V6).await;
        assert!(matches!(result, Err(Error::DefaultInterfaceNotFound)));
    }

    #[tokio::test]
    async fn no_default_route() {
        for output in ["", "[]", "[{\"dst\":\"default\",\"dev\":\"ppp0\",\"scope\":\"link\"}]"] {
            let executor = ScriptedExecutor::new().answer("ip -6 -j route show default", output);
            let result = resolve(&executor, AddressFamily::V6).await;
            assert!(matches!(
                result,
                Err(Error::GatewayNotAvailable(AddressFamily::V6))
            ));
        }
    }

    #[tokio::test]
    async fn malformed_json() {
        let executor = ScriptedExecutor::new().answer("ip -4 -j route show default", "[{\"dst\":");
        let result = resolve(&executor, AddressFamily::V4).await;
        assert!(matches!(result, Err(Error::OutputParse(_))));
        // Coverage of debug formatting
        let _ = format!("{:?}", result.unwrap_err());
    }

    #[tokio::test]
    async fn device_query_failure_aborts() {
        let executor = ScriptedExecutor::new()
            .answer("ip -4 -j route show default", LINUX_ROUTE_V4_MULTI)
            .answer("ip -j addr show eth0", LINUX_ADDR_ETH0)
            .fail("ip -j addr show wlan0");
        let result = resolve(&executor, AddressFamily::V4).await;
        assert!(matches!(result, Err(Error::CommandFailed { .. })));
    }

    #[test]
    fn join_emits_one_candidate_per_address() {
        let routes = parse_routes(LINUX_ROUTE_V4).unwrap();
        let links = parse_links(LINUX_ADDR_ETH0).unwrap();
        let candidates = join(&routes, &links);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.dev == "eth0" && c.metric == 100));
    }

    #[test]
    fn missing_metric_defaults_to_zero() {
        let routes =
            parse_routes(r#"[{"dst":"default","gateway":"10.0.0.1","dev":"eth1"}]"#).unwrap();
        assert_eq!(routes[0].metric, 0);
    }
}
