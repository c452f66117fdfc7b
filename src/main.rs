use burrow::config::Config;
use burrow::proxy::PoolManager;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let mut manager = PoolManager::new(cfg)?;

    if let Err(e) = manager.connect().await {
        tracing::error!(error = %e, "Could not start tunnel");
        return Err(e.into());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let result = manager.listen(shutdown_rx).await;
    manager.disconnect().await;

    result?;
    Ok(())
}
