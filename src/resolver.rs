use crate::{
    error::Result, AddressFamily, CommandExecutor, LinuxParser, MacOsParser,
    NetworkDefaultGateway, Platform, WindowsParser,
};
use async_trait::async_trait;

/// Anything that can produce the default gateway for an address family
#[async_trait]
pub trait GatewaySource {
    /// Resolve the default gateway for `family`
    ///
    /// # Errors
    ///
    /// Returns an error if a command fails or no usable default route exists.
    async fn default_gateway(&self, family: AddressFamily) -> Result<NetworkDefaultGateway>;
}

/// The platform parser chosen for one resolution
pub enum Adapter<'a, E> {
    Linux(LinuxParser<'a, E>),
    MacOs(MacOsParser<'a, E>),
    Windows(WindowsParser<'a, E>),
}

impl<'a, E: CommandExecutor> Adapter<'a, E> {
    #[must_use]
    pub fn new(platform: Platform, executor: &'a E) -> Self {
        match platform {
            Platform::Linux => Adapter::Linux(LinuxParser::new(executor)),
            Platform::MacOs => Adapter::MacOs(MacOsParser::new(executor)),
            Platform::Windows => Adapter::Windows(WindowsParser::new(executor)),
        }
    }
}

#[async_trait]
impl<E: CommandExecutor> GatewaySource for Adapter<'_, E> {
    async fn default_gateway(&self, family: AddressFamily) -> Result<NetworkDefaultGateway> {
        match self {
            Adapter::Linux(parser) => parser.default_gateway(family).await,
            Adapter::MacOs(parser) => parser.default_gateway(family).await,
            Adapter::Windows(parser) => parser.default_gateway(family).await,
        }
    }
}

/// Resolves default gateways with an injected command executor.
///
/// The platform is detected on every call unless pinned with
/// [`GatewayResolver::with_platform`].
#[derive(Debug, Clone)]
pub struct GatewayResolver<E> {
    executor: E,
    platform: Option<Platform>,
}

impl<E: CommandExecutor> GatewayResolver<E> {
    pub fn new(executor: E) -> Self {
        GatewayResolver {
            executor,
            platform: None,
        }
    }

    /// Use `platform`'s parser instead of the host's
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Resolve the default gateway for `family`
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported, a command fails, or
    /// no usable default route exists for `family`.
    pub async fn default_gateway(&self, family: AddressFamily) -> Result<NetworkDefaultGateway> {
        let platform = match self.platform {
            Some(platform) => platform,
            None => Platform::current()?,
        };
        tracing::debug!(%platform, %family, "resolving default gateway");
        Adapter::new(platform, &self.executor)
            .default_gateway(family)
            .await
    }

    /// # Errors
    ///
    /// See [`GatewayResolver::default_gateway`].
    pub async fn v4_default_gateway(&self) -> Result<NetworkDefaultGateway> {
        self.default_gateway(AddressFamily::V4).await
    }

    /// # Errors
    ///
    /// See [`GatewayResolver::default_gateway`].
    pub async fn v6_default_gateway(&self) -> Result<NetworkDefaultGateway> {
        self.default_gateway(AddressFamily::V6).await
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayResolver;
    use crate::{executor::fake::ScriptedExecutor, AddressFamily, Error, Platform};

    include!(concat!(env!("OUT_DIR"), "/sample_outputs.rs"));

    #[tokio::test]
    async fn dispatches_linux() {
        let executor = ScriptedExecutor::new()
            .answer("ip -4 -j route show default", LINUX_ROUTE_V4)
            .answer("ip -j addr show eth0", LINUX_ADDR_ETH0);
        let resolver = GatewayResolver::new(executor).with_platform(Platform::Linux);
        let gw = resolver.v4_default_gateway().await.expect("linux gateway");
        assert_eq!(gw.ip(), "192.168.1.15");
        assert_eq!(gw.gateway(), "192.168.1.1");
        assert_eq!(gw.interface(), "eth0");
        assert_eq!(gw.prefix_length(), 24);
    }

    #[tokio::test]
    async fn dispatches_macos() {
        let executor = ScriptedExecutor::new()
            .answer("route -n get -inet6 default", MACOS_ROUTE_V6)
            .answer("ifconfig en0", MACOS_IFCONFIG_EN0);
        let resolver = GatewayResolver::new(executor).with_platform(Platform::MacOs);
        let gw = resolver.v6_default_gateway().await.expect("macos gateway");
        assert_eq!(gw.interface(), "en0");
        assert_eq!(gw.prefix_length(), 64);
        assert!(gw.ip_addr().is_ipv6());
    }

    #[tokio::test]
    async fn failures_propagate() {
        let executor = ScriptedExecutor::new().fail("ip -6 -j route show default");
        let resolver = GatewayResolver::new(executor).with_platform(Platform::Linux);
        let result = resolver.default_gateway(AddressFamily::V6).await;
        assert!(matches!(result, Err(Error::CommandFailed { .. })));
    }
}
