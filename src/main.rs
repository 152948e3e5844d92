use tunnelgate::config::Config;
use tunnelgate::proxy::Tunnel;

#[tokio::main]
async fn main() -> anyhow::Result<()>{
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let tunnel = Tunnel::from_config(&cfg)?;

    tracing::info!(
        proxy = tunnel.proxy_addr(),
        host = tunnel.target(),
        "Opening tunnel"
    );

    tokio::select! {
        res = tunnel.establish() => {
            let established = res?;
            tracing::info!(
                peer = ?established.stream.peer_addr().ok(),
                prefetched = established.prefetched.len(),
                "Tunnel ready"
            );
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
