use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracker::config::EngineConfig;
use tracker::lifecycle::SessionController;
use tracker::replay::{Recording, ReplayTransport};
use tracker::sink::SinkEvent;

#[derive(Parser, Debug)]
/// Replays a recorded game session through the room-group tracker
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recording file (bincode snapshot plus packets)
    #[arg(short = 'r', long)]
    recording: PathBuf,

    /// Join code to report while replaying
    #[arg(short = 'c', long, default_value = "REPLAY")]
    code: String,

    /// Spawn wait timeout in milliseconds
    #[arg(short = 't', long, default_value = "10000")]
    spawn_timeout_ms: u64,

    /// Delay before meeting and exile effects, in milliseconds
    #[arg(short = 'd', long, default_value = "2500")]
    action_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Loading recording {}", args.recording.display());
    let recording = Recording::load(&args.recording)?;
    info!(
        "{} packets, {} clients in roster",
        recording.packets.len(),
        recording.snapshot.clients.len()
    );

    let config = EngineConfig::new("replay", args.code)
        .with_spawn_timeout(Duration::from_millis(args.spawn_timeout_ms))
        .with_action_delay(Duration::from_millis(args.action_delay_ms));

    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel::<SinkEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = sink_rx.recv().await {
            info!("{:?}", event);
        }
    });

    let mut controller = SessionController::new(config, ReplayTransport::new(recording), sink_tx);
    let result = controller.run().await;
    drop(controller);
    printer.await?;

    if let Err(e) = &result {
        error!("Replay stopped: {}", e);
    }
    Ok(result?)
}
