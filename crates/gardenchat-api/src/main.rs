//! gardenchat CLI and REST API entry point.
//!
//! Binary name: `gchat`
//!
//! Parses CLI arguments, loads configuration and wires the Vertex AI
//! providers, then dispatches to the command handler or starts the REST API
//! server.

mod cli;
mod http;
mod state;
#[cfg(test)]
mod testing;

use clap::Parser;
use clap_complete::generate;
use tracing::warn;

use gardenchat_infra::config::load_profiles;
use gardenchat_observe::tracing_setup::{LogOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need logging or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "gchat", &mut std::io::stdout());
        return Ok(());
    }

    let log_options = LogOptions::from_verbosity(cli.verbose, cli.quiet)
        .with_json(cli.json)
        .with_otel(cli.otel)
        .with_stdout_reserved(cli.json);
    init_tracing(&log_options).map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Listing profiles needs neither a project nor credentials
    if let Commands::Profiles = cli.command {
        let profiles = load_profiles(cli.config.as_deref()).await?;
        return cli::profiles::list_profiles(&profiles, cli.json);
    }

    let state = AppState::init(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Chat { settings } => {
            cli::chat::loop_runner::run_chat_loop(&state, &settings).await?;
        }

        Commands::Ask {
            text,
            images,
            no_stream,
            settings,
        } => {
            cli::ask::ask(&state, text, &images, no_stream, &settings, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} gardenchat API listening on {}",
                console::style(">").bold(),
                console::style(format!("http://{addr}/api/v1")).cyan()
            );
            println!(
                "  {} {} / {}",
                console::style("Vertex AI:").dim(),
                state.config.project_id,
                state.config.location
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Profiles | Commands::Completions { .. } => {
            unreachable!("handled before state init")
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
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
