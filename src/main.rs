mod cli;

use clap::Parser;
use cli::Cli;
use docflow::config::Config;
use docflow::observability;
use docflow::{LogProgress, Workflow};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(path) = cli.credentials {
        config.api.credentials_path = path;
    }

    let workflow = Workflow::connect(&config)?;
    let (operation, output) = cli.command.into_operation();

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let report = workflow
        .run(&operation, &output, &LogProgress, &cancel)
        .await?;

    info!(
        operation = operation.name(),
        task_id = %report.task_id,
        path = %report.path.display(),
        bytes = report.bytes,
        "Done"
    );

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, cancelling");
    cancel.cancel();
}
