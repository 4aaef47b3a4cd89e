#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

use anyhow::Result;
use default_gateway::{default_gateway, AddressFamily, Error, Platform};

#[tokio::test]
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
pub async fn main() -> Result<()> {
    for family in [AddressFamily::V4, AddressFamily::V6] {
        match default_gateway(family).await {
            Ok(gw) => {
                eprintln!("{family}: {gw}");
                assert!(family.matches(&gw.ip_addr()));
                assert!(family.matches(&gw.gateway_addr()));
                assert!(!gw.interface().is_empty());
                let max = match family {
                    AddressFamily::V4 => 32,
                    AddressFamily::V6 => 128,
                };
                assert!(gw.prefix_length() <= max);
            }
            // Hosts without a route for the family (CI sandboxes, v4-only
            // networks) legitimately end up here
            Err(err) => eprintln!("{family}: {err}"),
        }
    }

    Ok(())
}

#[tokio::test]
pub async fn platform_pinned() -> Result<()> {
    let platform = Platform::from_os("plan9");
    assert!(matches!(platform, Err(Error::PlatformNotSupported(_))));

    #[cfg(target_os = "linux")]
    {
        use default_gateway::{GatewayResolver, TokioExecutor};

        let resolver = GatewayResolver::new(TokioExecutor).with_platform(Platform::Linux);
        if let Ok(gw) = resolver.v4_default_gateway().await {
            eprintln!("{}", serde_json::to_string(&gw)?);
        }
    }

    Ok(())
}
