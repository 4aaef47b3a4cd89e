use anyhow::Result;
use default_gateway::{v4_default_gateway, v6_default_gateway};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let v4 = v4_default_gateway().await?;
    println!("IPv4: {v4}");

    match v6_default_gateway().await {
        Ok(v6) => println!("IPv6: {v6}"),
        Err(err) => println!("IPv6: {err}"),
    }

    Ok(())
}
