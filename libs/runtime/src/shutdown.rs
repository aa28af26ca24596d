use anyhow::Result;

/// Resolve once the process is asked to stop: SIGINT or SIGTERM on unix,
/// Ctrl+C / Ctrl+Break / console close on Windows.
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("shutdown: SIGTERM received"),
            _ = sigint.recv()  => tracing::info!("shutdown: SIGINT received"),
        }
        Ok(())
    }

    #[cfg(windows)]
    {
        use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close};
        let mut c = ctrl_c()?;
        let mut br = ctrl_break()?;
        let mut cl = ctrl_close()?;
        tokio::select! {
            _ = c.recv()  => {},
            _ = br.recv() => {},
            _ = cl.recv() => {},
        }
        tracing::info!("shutdown: console signal received");
        Ok(())
    }
}

/// Shutdown future for `axum::serve(..).with_graceful_shutdown`. A failure
/// to install signal handlers is logged and treated as an immediate stop.
pub async fn signal() {
    if let Err(e) = wait_for_shutdown().await {
        tracing::error!(error = %e, "failed to listen for shutdown signals");
    }
}
