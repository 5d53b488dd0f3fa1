mod cli;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use jr::{Recorder, RecorderConfig, RecordingState, Status};
use jr_runtime::{Connection, WebSocketTransport};
use tracing::{error, info, warn};

use crate::cli::{Cli, Command, ConnectArgs, RecordArgs};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Command::Record(args) => record(args).await,
    };

    if let Err(err) = result {
        error!(target = "jrctl", error = %err, "command failed");
        std::process::exit(1);
    }
}

fn load_config(args: &ConnectArgs) -> Result<RecorderConfig> {
    let config = match &args.config {
        Some(path) => RecorderConfig::from_path(path)?,
        None => RecorderConfig::from_env()?,
    };
    Ok(match &args.token {
        Some(token) => config.with_token(token.clone()),
        None => config,
    })
}

async fn connect(args: &ConnectArgs, config: RecorderConfig) -> Result<Arc<Recorder>> {
    let (transport, message_rx) = WebSocketTransport::connect(&args.url)
        .await
        .with_context(|| format!("failed to connect to {}", args.url))?;
    let connection = Arc::new(Connection::new(transport.into_transport_parts(message_rx)));

    let conn = Arc::clone(&connection);
    tokio::spawn(async move { conn.run().await });

    let recorder = Arc::new(Recorder::new(&args.room, &args.service, connection, config));
    recorder.register();
    Ok(recorder)
}

async fn record(args: RecordArgs) -> Result<()> {
    let config = load_config(&args.connect)?;
    let wait_limit = config.reply_timeout();
    let token = config.token.clone();
    let recorder = connect(&args.connect, config).await?;
    let from = args.connect.from.as_str();

    if !recorder
        .set_recording(from, token.as_deref(), RecordingState::On, args.output.as_deref())
        .await
    {
        bail!("recording request was not dispatched");
    }
    if !recorder.is_recording() {
        bail!("recording service did not acknowledge START");
    }
    info!(
        target = "jrctl",
        room = recorder.room_id(),
        service = recorder.service_address(),
        session_id = ?recorder.session_id(),
        "recording"
    );

    match args.seconds {
        Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
        None => {
            tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
        }
    }

    if !recorder
        .set_recording(from, token.as_deref(), RecordingState::Off, None)
        .await
    {
        bail!("stop request failed");
    }

    let stopped = tokio::time::timeout(wait_limit, async {
        while recorder.status() != Status::Stopped {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    match stopped {
        Ok(()) => info!(target = "jrctl", "recording stopped"),
        Err(_) => warn!(target = "jrctl", status = %recorder.status(), "no STOPPED report before timeout"),
    }
    Ok(())
}
