use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fefe_bot::app::AppContext;
use fefe_bot::bot::{stop_poller, Bot};
use fefe_bot::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let ctx = Arc::new(AppContext::new(config).await?);
    let bot = Bot::new(ctx.clone());
    let poller = bot.start().await;

    tokio::select! {
        _ = bot.serve() => {},
        _ = shutdown_signal() => info!("Shutting down"),
    }

    stop_poller(poller).await;
    drop(bot);

    match Arc::try_unwrap(ctx) {
        Ok(ctx) => ctx.shutdown()?,
        Err(_) => error!("Application context still shared at exit"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
