//! ARK Broker - Binary Entry Point
//!
//! Loads configuration from the environment, opens the brokers, serves HTTP
//! until SIGINT/SIGTERM and flushes every broker before exiting.

use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use ark_broker::{create_router, AppContext, BrokerConfig};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long open connections (live tails included) get to finish after a signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BrokerConfig::from_env()?;
    let ctx = Arc::new(AppContext::from_config(&config));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(version = ark_broker::VERSION, "ARK Broker service running on http://{}", addr);

    let app = create_router(Arc::clone(&ctx));
    let mut server_rx = shutdown_rx.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    let mut outcome: Result<(), Box<dyn Error>> = Ok(());
    let signalled = tokio::select! {
        result = &mut server => {
            outcome = server_outcome(result);
            false
        }
        _ = shutdown_rx.wait_for(|stop| *stop) => true,
    };

    if signalled {
        info!("shutting down gracefully");
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            warn!("connections still open after grace period, closing");
            server.abort();
        }
    }

    // Flush even when the server failed, then report the failure
    ctx.save_all();
    outcome?;

    info!("process terminated");
    Ok(())
}

/// Map how the server task ended to the process result
fn server_outcome(result: Result<io::Result<()>, JoinError>) -> Result<(), Box<dyn Error>> {
    match result {
        Ok(Ok(())) => {
            info!("server stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "server failed");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "server task failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_fails_the_process() {
        let failed = server_outcome(Ok(Err(io::Error::new(
            io::ErrorKind::AddrInUse,
            "address in use",
        ))));
        assert!(failed.unwrap_err().to_string().contains("address in use"));

        assert!(server_outcome(Ok(Ok(()))).is_ok());
    }

    #[tokio::test]
    async fn test_aborted_server_task_fails_the_process() {
        let handle = tokio::spawn(std::future::pending::<io::Result<()>>());
        handle.abort();
        assert!(server_outcome(handle.await).is_err());
    }
}
