//! knot-exporter — Prometheus exporter for Knot DNS.
//!
//! # Usage
//!
//! ```text
//! knot-exporter --knot-socket-path /run/knot/knot.sock --web-listen-port 9433
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use knot_collector::{BuildInfo, KnotCollector, KnotDescriptors, SysinfoMemory};
use knot_ctl::UnixConnector;
use knot_exporter::cli::version_text;
use knot_exporter::{Cli, ExporterConfig, build_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.version {
        print!("{}", version_text(&BuildInfo::current()));
        return Ok(());
    }

    let config = ExporterConfig::load(&cli)?;

    let default_filter = if config.debug {
        "info,knot_exporter=debug,knot_collector=debug,knot_ctl=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let addr = config.socket_addr()?;
    let collector = Arc::new(KnotCollector::new(
        config.collector.clone(),
        Arc::new(UnixConnector),
        Arc::new(SysinfoMemory::new()),
        Arc::new(KnotDescriptors::new()),
    ));
    let build = collector.build_info();
    info!(
        version = %build.version,
        commit = %build.git_commit,
        ctl_version = %build.ctl_version,
        "knot exporter starting"
    );

    if config.skip_validation {
        info!("startup validation skipped");
    } else {
        config.validate()?;
        let probe = Arc::clone(&collector);
        tokio::task::spawn_blocking(move || probe.probe())
            .await?
            .with_context(|| {
                format!(
                    "knot is not answering on {}",
                    config.collector.socket_path.display()
                )
            })?;
        info!(socket = %config.collector.socket_path.display(), "knot control socket reachable");
    }

    let router = build_router(collector);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("knot exporter stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
