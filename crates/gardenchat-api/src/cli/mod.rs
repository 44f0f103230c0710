//! CLI command definitions for the `gchat` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod ask;
pub mod attachment;
pub mod chat;
pub mod profiles;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use gardenchat_types::chat::SettingsPatch;

/// Chat with model garden LLMs from the terminal or over HTTP.
#[derive(Parser)]
#[command(name = "gchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Path to config.toml.
    #[arg(long, global = true, env = "GARDENCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings flags shared by `chat` and `ask`.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Chat profile id (see `gchat profiles`).
    #[arg(long, short)]
    pub profile: Option<String>,

    /// Sampling temperature, 0.0 to 1.0.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Maximum output tokens, 256 to 8192.
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl SettingsArgs {
    pub fn patch(&self) -> SettingsPatch {
        SettingsPatch {
            profile: self.profile.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_tokens,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Ask a single question and print the answer.
    Ask {
        /// The message to send.
        text: String,

        /// Attach an image (repeatable).
        #[arg(long = "image", short = 'i')]
        images: Vec<PathBuf>,

        /// Wait for the full answer instead of streaming it.
        #[arg(long)]
        no_stream: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// List the available chat profiles.
    #[command(alias = "ls")]
    Profiles,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
