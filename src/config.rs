use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PanocapConfig {
    pub capture: CaptureConfig,
    pub record: RecordConfig,
    pub surface: SurfaceConfig,
    pub hdr: HdrConfig,
    pub failure: FailureConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Deadline for a photo capture, anchored at the first start signal
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordConfig {
    /// Ask the engine to flush the preview when a recording stops
    #[serde(default = "default_flush_preview")]
    pub flush_preview: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SurfaceConfig {
    /// Interval between render surface size checks
    #[serde(default = "default_surface_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on the resize wait (0 waits until the surface settles)
    #[serde(default = "default_surface_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HdrConfig {
    /// Interval between HDR skip-frame counter checks
    #[serde(default = "default_hdr_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FailureConfig {
    /// Gap in seconds after which a failure starts a fresh session
    #[serde(default = "default_max_check_secs")]
    pub max_check_secs: i64,

    /// Smallest gap in seconds treated as a periodic failure
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: i64,

    /// Largest gap in seconds counted towards a failure burst
    #[serde(default = "default_max_many_failed_secs")]
    pub max_many_failed_secs: i64,

    /// Failures inside a burst before the run is declared fatal
    #[serde(default = "default_max_failed_count")]
    pub max_failed_count: u32,

    /// Identical periodic gaps before the run is declared fatal
    #[serde(default = "default_max_interval_failed_count")]
    pub max_interval_failed_count: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulationConfig {
    /// Delay between photo start and completion
    #[serde(default = "default_photo_latency_ms")]
    pub photo_latency_ms: u64,

    /// Delay for record start/stop completions
    #[serde(default = "default_record_latency_ms")]
    pub record_latency_ms: u64,

    /// Delay for resolution change completions
    #[serde(default = "default_resolution_latency_ms")]
    pub resolution_latency_ms: u64,

    /// Time the render surface needs to adopt a new layout
    #[serde(default = "default_surface_settle_ms")]
    pub surface_settle_ms: u64,

    /// Size of the container hosting the render surface
    #[serde(default = "default_parent_size")]
    pub parent_size: (u32, u32),

    /// Directory recordings and photos are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl PanocapConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("panocap.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("capture.timeout_ms", default_capture_timeout_ms())?
            .set_default("record.flush_preview", default_flush_preview())?
            .set_default(
                "surface.poll_interval_ms",
                default_surface_poll_interval_ms(),
            )?
            .set_default("surface.wait_timeout_ms", default_surface_wait_timeout_ms())?
            .set_default("hdr.poll_interval_ms", default_hdr_poll_interval_ms())?
            .set_default("failure.max_check_secs", default_max_check_secs())?
            .set_default("failure.max_interval_secs", default_max_interval_secs())?
            .set_default(
                "failure.max_many_failed_secs",
                default_max_many_failed_secs(),
            )?
            .set_default("failure.max_failed_count", default_max_failed_count())?
            .set_default(
                "failure.max_interval_failed_count",
                default_max_interval_failed_count(),
            )?
            .set_default("simulation.photo_latency_ms", default_photo_latency_ms())?
            .set_default("simulation.record_latency_ms", default_record_latency_ms())?
            .set_default(
                "simulation.resolution_latency_ms",
                default_resolution_latency_ms(),
            )?
            .set_default("simulation.surface_settle_ms", default_surface_settle_ms())?
            .set_default(
                "simulation.parent_size",
                vec![default_parent_size().0, default_parent_size().1],
            )?
            .set_default("simulation.output_dir", default_output_dir())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with PANOCAP_ prefix
            .add_source(Environment::with_prefix("PANOCAP").separator("__"))
            .build()?;

        let config: PanocapConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Capture timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.surface.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Surface poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.hdr.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "HDR poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        let failure = &self.failure;
        if failure.max_many_failed_secs >= failure.max_interval_secs
            || failure.max_interval_secs > failure.max_check_secs
        {
            return Err(ConfigError::Message(format!(
                "Failure windows must satisfy many_failed ({}) < interval ({}) <= check ({})",
                failure.max_many_failed_secs, failure.max_interval_secs, failure.max_check_secs
            )));
        }

        if failure.max_failed_count == 0 || failure.max_interval_failed_count == 0 {
            return Err(ConfigError::Message(
                "Failure counts must be greater than 0".to_string(),
            ));
        }

        if self.simulation.parent_size.0 == 0 || self.simulation.parent_size.1 == 0 {
            return Err(ConfigError::Message(
                "Simulation parent_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl SurfaceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        match self.wait_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl HdrConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_capture_timeout_ms(),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            flush_preview: default_flush_preview(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_surface_poll_interval_ms(),
            wait_timeout_ms: default_surface_wait_timeout_ms(),
        }
    }
}

impl Default for HdrConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_hdr_poll_interval_ms(),
        }
    }
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            max_check_secs: default_max_check_secs(),
            max_interval_secs: default_max_interval_secs(),
            max_many_failed_secs: default_max_many_failed_secs(),
            max_failed_count: default_max_failed_count(),
            max_interval_failed_count: default_max_interval_failed_count(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            photo_latency_ms: default_photo_latency_ms(),
            record_latency_ms: default_record_latency_ms(),
            resolution_latency_ms: default_resolution_latency_ms(),
            surface_settle_ms: default_surface_settle_ms(),
            parent_size: default_parent_size(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for PanocapConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            record: RecordConfig::default(),
            surface: SurfaceConfig::default(),
            hdr: HdrConfig::default(),
            failure: FailureConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

// Default value functions
fn default_capture_timeout_ms() -> u64 {
    40_000
}

fn default_flush_preview() -> bool {
    true
}

fn default_surface_poll_interval_ms() -> u64 {
    100
}
fn default_surface_wait_timeout_ms() -> u64 {
    0
}

fn default_hdr_poll_interval_ms() -> u64 {
    50
}

fn default_max_check_secs() -> i64 {
    10
}
fn default_max_interval_secs() -> i64 {
    8
}
fn default_max_many_failed_secs() -> i64 {
    3
}
fn default_max_failed_count() -> u32 {
    30
}
fn default_max_interval_failed_count() -> u32 {
    2
}

fn default_photo_latency_ms() -> u64 {
    1_500
}
fn default_record_latency_ms() -> u64 {
    300
}
fn default_resolution_latency_ms() -> u64 {
    500
}
fn default_surface_settle_ms() -> u64 {
    250
}
fn default_parent_size() -> (u32, u32) {
    (1920, 1080)
}
fn default_output_dir() -> String {
    "./media".to_string()
}
