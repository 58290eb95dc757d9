// crates/auth-analytics-server/src/main.rs
// ============================================================================
// Module: Process Entry Point
// Description: Parses CLI/environment configuration, boots the stores, and
// serves the HTTP surface.
// Purpose: The single binary this workspace produces.
// Dependencies: auth-analytics-server, clap, tokio
// ============================================================================

//! ## Overview
//! `config_invalid` is the only boot failure this process recognizes; it
//! prints the error and exits non-zero before the HTTP listener ever
//! binds.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use auth_analytics_server::config::CliArgs;
use auth_analytics_server::routes::build_router;
use clap::Parser;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => emit_error(&message),
    }
}

/// Writes a single error line to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "{message}");
    ExitCode::FAILURE
}

async fn run() -> Result<(), String> {
    let args = CliArgs::parse();
    let config = args.resolve().map_err(|err| err.to_string())?;
    let bind = config.bind;

    let state = auth_analytics_server::boot(&config).map_err(|err| err.to_string())?;
    let router = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| format!("config_invalid: could not bind {bind}: {err}"))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("server terminated: {err}"))
}

/// Resolves once a Ctrl-C (or, on Unix, SIGTERM) is received, letting
/// `axum::serve` finish in-flight requests before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing a SIGTERM handler should not fail");
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
