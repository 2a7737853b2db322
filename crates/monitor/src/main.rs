//! Driver Fatigue Monitor - replay a recorded landmark stream

use std::path::PathBuf;

use alerting::{AlertChannel, LogSink};
use anyhow::{bail, Context};
use clap::Parser;
use monitor::{init_logging, replay, MonitorPipeline, MonitorService, Settings};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "fatigue-monitor",
    version,
    about = "Replay a landmark recording through the fatigue monitor"
)]
struct Args {
    /// JSON-lines landmark recording
    recording: PathBuf,

    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Alert sensitivity in [0, 1], overriding the settings
    #[arg(short, long)]
    sensitivity: Option<f64>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(sensitivity) = args.sensitivity {
        settings.dms.alert_sensitivity = sensitivity;
    }
    settings.logging.json |= args.json_logs;
    settings.validate()?;

    init_logging(&settings.logging)?;
    info!(
        "=== Driver Fatigue Monitor v{} ===",
        env!("CARGO_PKG_VERSION")
    );

    let frames = replay::load_recording(&args.recording)
        .with_context(|| format!("reading {}", args.recording.display()))?;
    let (start, end) = match (frames.first(), frames.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => bail!("recording {} contains no frames", args.recording.display()),
    };

    let mut pipeline = MonitorPipeline::from_settings(&settings)?;
    for channel in [AlertChannel::Sound, AlertChannel::Haptic] {
        pipeline.alerts_mut().register(Box::new(LogSink::new(channel)));
    }

    let (handle, task) = MonitorService::spawn(pipeline, settings.queue_capacity);

    handle.start_session(start).await?;
    for frame in frames {
        handle.submit(frame).await?;
    }
    let trip = handle.end_session(end).await?;
    let daily = handle.snapshot().daily;

    handle.shutdown().await?;
    task.await.context("monitor task failed")?;

    let report = serde_json::json!({
        "trip": trip,
        "safety_band": trip.safety_band(),
        "daily": daily,
        "daily_safety_score": daily.safety_score(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
