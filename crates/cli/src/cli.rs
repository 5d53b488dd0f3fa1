use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "jrctl")]
#[command(about = "Drive a remote conference recording service")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a recording, wait, then stop it
    Record(RecordArgs),
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// WebSocket endpoint of the recording service
    #[arg(long)]
    pub url: String,

    /// Address of the recording service component
    #[arg(long)]
    pub service: String,

    /// Conference room to record
    #[arg(long)]
    pub room: String,

    /// Requester identity sent with every command
    #[arg(long)]
    pub from: String,

    /// JSON config file (token, reply_timeout_ms); defaults to the environment
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Recording token, overrides the configured one
    #[arg(long, env = "JR_TOKEN")]
    pub token: Option<String>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Output location requested from the service
    #[arg(long)]
    pub output: Option<String>,

    /// Seconds to record before stopping; records until Ctrl-C when omitted
    #[arg(long)]
    pub seconds: Option<u64>,
}
