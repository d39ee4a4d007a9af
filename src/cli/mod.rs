//! Command-line interface.

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Shipwright - self-service deployment pipelines
#[derive(Parser)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Print a generated artifact without touching any external system
    Render {
        #[arg(value_enum)]
        artifact: Artifact,

        #[command(flatten)]
        args: RenderArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Artifact {
    Dockerfile,
    Manifest,
    Pipeline,
}

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Framework name, e.g. React, Django, Go
    #[arg(long)]
    pub framework: String,

    /// Container port; required for backend frameworks
    #[arg(long)]
    pub port: Option<u16>,

    /// nginx or apache, static sites only
    #[arg(long)]
    pub web_server: Option<String>,

    #[arg(long, default_value = "demo")]
    pub username: String,

    #[arg(long, default_value = "app")]
    pub project: String,

    /// Application source repository, used by the pipeline script
    #[arg(long, default_value = "https://github.com/demo/app")]
    pub source_repo: String,

    /// Do not fill runtime versions and build commands from framework defaults
    #[arg(long)]
    pub raw: bool,
}

pub use commands::cmd_render;
