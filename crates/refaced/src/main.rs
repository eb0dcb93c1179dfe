use anyhow::Result;
use tracing_subscriber::EnvFilter;

use reface_core::Invoker;

mod config;
mod dbus_interface;
mod engine;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("refaced starting");

    let config = config::Config::from_env();
    let invoker = Invoker::new(&config.tool_program)
        .with_execution_provider(config.execution_provider.clone())
        .with_frame_processor(config.frame_processor.clone());

    let engine = engine::spawn_engine(
        config.workspace_dir.clone(),
        config.output_dir.clone(),
        invoker,
    )?;

    let service = dbus_interface::RefaceService::new(engine);
    let _connection = zbus::connection::Builder::session()?
        .name("dev.reface.Reface1")?
        .serve_at("/dev/reface/Reface1", service)?
        .build()
        .await?;

    tracing::info!("refaced ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("refaced shutting down");

    Ok(())
}
