//! Command-line interface for guardchat.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// guardchat - chat with a local Qwen model that refuses queries containing an SSN
#[derive(Debug, Parser)]
#[command(name = "guardchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// GGUF model file loaded by the engine
    #[arg(long = "model-path", alias = "model_path", env = "MODEL_PATH", value_name = "PATH")]
    pub model_path: Option<PathBuf>,

    /// Disable the model's think mode
    #[arg(long)]
    pub nothink: bool,

    /// Base URL of the OpenAI-compatible engine, e.g. http://127.0.0.1:8080/v1
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Settings file (default: <config dir>/guardchat/settings.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the models the engine serves
    Models,
}
