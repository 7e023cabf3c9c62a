use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod ops;
mod protocol;
mod server;
mod sim;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env();
    tracing::info!("facefitd starting");

    // Stand-alone runs drive the built-in simulated host; embedding hosts
    // wire their own ModelController/LandmarkExtractor pair into the engine.
    let (host, extractor) = sim::simulated_host();
    let handle = engine::spawn_engine(Box::new(host), Box::new(extractor), config.channel_depth);

    let listener = TcpListener::bind(&config.listen).await?;
    tracing::info!(addr = %config.listen, "listening");

    tokio::select! {
        result = server::serve(listener, handle) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("facefitd shutting down");
        }
    }

    Ok(())
}
