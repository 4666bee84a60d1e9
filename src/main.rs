use anyhow::Result;
use clap::{Parser, ValueEnum};
use panocap::engine::StaticMetadata;
use panocap::{
    CameraBehavior, CaptureOrchestrator, CaptureRequest, EngineError, EventFilter, OperationListener,
    PanoContext, PanocapConfig, PanocapError, PhotoListener, RecordListener, RecordOrchestrator,
    ResolutionChangeCoordinator, ResolutionChangeRequest, ResolutionListener, ResolutionPolicy,
    SimulatedEngine, SimulatedSurface, SurfaceSize,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "panocap")]
#[command(about = "Capture, record and resolution orchestration for panoramic cameras")]
#[command(version)]
#[command(long_about = "Drives photo capture, video recording and live resolution changes \
against a panoramic capture engine, with deadline supervision, stop/start sequencing and \
capture failure classification. Runs scripted sessions against the built-in simulated engine.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "panocap.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without running a session")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - build the orchestrators but don't run a session
    #[arg(long, help = "Perform dry run - build orchestrators but don't drive the engine")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Session to run against the simulated engine
    #[arg(long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Photo,
    Record,
    Resolution,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config();
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting panocap v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match PanocapConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            let e = PanocapError::from(e);
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    let engine = Arc::new(SimulatedEngine::from_config(&config.simulation));
    let metadata = StaticMetadata {
        artist: Some("panocap".to_string()),
        software_version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };
    let context = PanoContext::new(engine, config.clone()).with_metadata(Arc::new(metadata));

    let (width, height) = config.simulation.parent_size;
    let surface = Arc::new(SimulatedSurface::new(
        SurfaceSize::new(width, height),
        Duration::from_millis(config.simulation.surface_settle_ms),
    ));

    let capture = CaptureOrchestrator::new(&context);
    let record = RecordOrchestrator::new(&context);
    let resolution = ResolutionChangeCoordinator::new(&context, surface);

    if args.dry_run {
        info!("Dry run mode - orchestrators built but no session run");
        println!("✓ Dry run completed successfully - all orchestrators initialized");
        return Ok(());
    }

    let filter = if args.debug {
        EventFilter::All
    } else {
        EventFilter::EventTypes(vec![
            "photo_finished",
            "record_started",
            "record_stopped",
            "record_failed",
            "resolution_changed",
            "resolution_failed",
            "capture_failure_pattern",
        ])
    };
    let json_events = args.log_format.as_deref() == Some("json");
    let mut events = context.event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if !filter.matches(&event.event) {
                continue;
            }
            if json_events {
                match serde_json::to_string(&event) {
                    Ok(line) => info!(event = %line, "pano event"),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                }
            } else {
                info!("[{}] {}", event.at.format("%H:%M:%S%.3f"), event.event.description());
            }
        }
    });

    let output_dir = PathBuf::from(&config.simulation.output_dir);
    let (sender, mut outcomes) = mpsc::unbounded_channel();
    let listener = Arc::new(SessionListener { sender });

    if matches!(args.scenario, Scenario::Resolution | Scenario::All) {
        resolution.change_resolution(
            ResolutionChangeRequest::plane_video(true, 30)?,
            ResolutionPolicy::PlaneVideo {
                field_of_view: 110,
                aspect: "16:9".parse()?,
            },
            listener.clone(),
        );
        report(&mut outcomes).await;

        resolution.change_resolution(
            ResolutionChangeRequest::photo("5.7K")?,
            ResolutionPolicy::Photo,
            listener.clone(),
        );
        report(&mut outcomes).await;
    }

    if matches!(args.scenario, Scenario::Photo | Scenario::All) {
        capture.take_photo(CaptureRequest::photo("5.7K", &output_dir), listener.clone());
        report(&mut outcomes).await;

        capture.take_photo(
            CaptureRequest::photo("5.7K", &output_dir).with_hdr_count(3),
            listener.clone(),
        );
        report(&mut outcomes).await;

        capture.restore_preview(listener.clone());
        report(&mut outcomes).await;
    }

    if matches!(args.scenario, Scenario::Record | Scenario::All) {
        record.start_record(CaptureRequest::video("8K", &output_dir), listener.clone());
        report(&mut outcomes).await;

        tokio::time::sleep(Duration::from_secs(1)).await;

        record.stop_record(false, listener.clone());
        report(&mut outcomes).await;
    }

    info!("Session finished");
    Ok(())
}

/// Wait for the next terminal outcome of the session
async fn report(outcomes: &mut mpsc::UnboundedReceiver<std::result::Result<String, String>>) {
    match outcomes.recv().await {
        Some(Ok(message)) => info!("✓ {}", message),
        Some(Err(message)) => warn!("✗ {}", message),
        None => error!("Session listener went away"),
    }
}

/// Forwards the terminal callbacks of every orchestrator to the session loop
struct SessionListener {
    sender: mpsc::UnboundedSender<std::result::Result<String, String>>,
}

impl SessionListener {
    fn done(&self, outcome: std::result::Result<String, String>) {
        let _ = self.sender.send(outcome);
    }
}

impl PhotoListener for SessionListener {
    fn on_take_shot(&self, index: u32) {
        info!("Shot {} started", index);
    }

    fn on_take_success(&self, is_hdr: bool, _stitched: Option<PathBuf>, unstitched: Option<PathBuf>) {
        self.done(Ok(format!("Photo taken (hdr: {}): {:?}", is_hdr, unstitched)));
    }

    fn on_take_error(&self, is_hdr: bool, message: &str) {
        self.done(Err(format!("Photo failed (hdr: {}): {}", is_hdr, message)));
    }
}

impl RecordListener for SessionListener {
    fn on_record_start(&self, request: &CaptureRequest) {
        self.done(Ok(format!("Recording into {}", request.output_path().display())));
    }

    fn on_record_stop(&self, path: Option<PathBuf>) {
        self.done(Ok(format!("Recording saved: {:?}", path)));
    }

    fn on_record_error(&self, error: EngineError, path: Option<PathBuf>) {
        self.done(Err(format!("Recording failed: {} ({:?})", error, path)));
    }
}

impl ResolutionListener for SessionListener {
    fn fill_params(&self, camera_id: u32, width: u32, height: u32, fps: u32) {
        info!("Switching camera {} to {}x{}@{}", camera_id, width, height, fps);
    }

    fn on_success(&self, behavior: CameraBehavior) {
        self.done(Ok(format!("Resolution changed ({:?})", behavior)));
    }

    fn on_error(&self, code: i32, message: &str) {
        self.done(Err(format!("Resolution change failed ({}): {}", code, message)));
    }
}

impl OperationListener for SessionListener {
    fn on_success(&self) {
        self.done(Ok("Preview restored".to_string()));
    }

    fn on_error(&self, error: EngineError) {
        self.done(Err(format!("Preview restore failed: {}", error)));
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("panocap={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() {
    println!("# Panocap Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Every value can be overridden with PANOCAP__<SECTION>__<KEY>");
    println!();

    let default_config = r#"[capture]
# Photo capture deadline in milliseconds, anchored at the first shot
timeout_ms = 40000

[record]
# Flush the preview when a recording stops
flush_preview = true

[surface]
# Interval between render surface size checks
poll_interval_ms = 100
# Upper bound on a surface resize wait (0 waits until the surface settles)
wait_timeout_ms = 0

[hdr]
# Interval between HDR skip-frame checks before reporting success
poll_interval_ms = 50

[failure]
# Gap in seconds after which a capture failure starts a fresh session
max_check_secs = 10
# Smallest gap in seconds treated as a periodic failure
max_interval_secs = 8
# Largest gap in seconds counted towards a failure burst
max_many_failed_secs = 3
# Failures in a burst before capturing is stopped
max_failed_count = 30
# Identical periodic gaps before capturing is stopped
max_interval_failed_count = 2

[simulation]
# Simulated engine latencies in milliseconds
photo_latency_ms = 1500
record_latency_ms = 300
resolution_latency_ms = 500
# Time the simulated render surface needs to adopt a new layout
surface_settle_ms = 250
# Size of the container hosting the render surface
parent_size = [1920, 1080]
# Directory photos and recordings are written to
output_dir = "./media"
"#;

    println!("{}", default_config);
}
