use crate::config::FailureConfig;
use crate::error::{error_code, EngineError};
use chrono::Utc;
use tracing::{debug, warn};

pub const INTERVAL_FAILURE_INFO: &str = "onCaptureFailed by interval";
pub const MANY_FAILED_INFO: &str = "onCaptureFailed many failed";

/// Classifies repeated capture failures as transient or systemic.
///
/// Three patterns are recognised:
/// - a gap longer than `max_check_secs` starts a fresh session,
/// - failures recurring with an identical gap of at least
///   `max_interval_secs` are systemic once seen `max_interval_failed_count` times,
/// - a burst of `max_failed_count` failures within `max_many_failed_secs`
///   of the anchor is a crash loop.
///
/// Once a fatal pattern is found the tracker keeps answering "stop" until
/// [`CaptureFailureTracker::reset`] is called.
#[derive(Debug, Clone)]
pub struct CaptureFailureTracker {
    config: FailureConfig,
    last_capture_time_ms: i64,
    failed_count: u32,
    last_diff_secs: i64,
    last_diff_repeat_count: u32,
    last_error_info: Option<&'static str>,
}

impl CaptureFailureTracker {
    pub fn new() -> Self {
        Self::with_config(FailureConfig::default())
    }

    pub fn with_config(config: FailureConfig) -> Self {
        Self {
            config,
            last_capture_time_ms: 0,
            failed_count: 0,
            last_diff_secs: 0,
            last_diff_repeat_count: 0,
            last_error_info: None,
        }
    }

    /// Record a failure now; returns false when capturing should stop
    pub fn check_failed(&mut self) -> bool {
        self.check_failed_at(Utc::now().timestamp_millis())
    }

    /// Record a failure at `now_ms` (milliseconds since the epoch)
    pub fn check_failed_at(&mut self, now_ms: i64) -> bool {
        if self.last_error_info.is_some() {
            return false;
        }

        let diff = ((now_ms - self.last_capture_time_ms) as f64 / 1000.0).round() as i64;
        debug!(
            "check_failed diff: {}s, last: {}, last_diff: {}s, repeats: {}, failed: {}",
            diff,
            self.last_capture_time_ms,
            self.last_diff_secs,
            self.last_diff_repeat_count,
            self.failed_count
        );

        if self.last_capture_time_ms == 0 {
            self.last_capture_time_ms = now_ms;
        } else if diff > self.config.max_check_secs {
            self.reset();
        } else if diff >= self.config.max_interval_secs {
            if self.last_diff_secs == 0 {
                self.last_diff_secs = diff;
                self.last_diff_repeat_count = 1;
            } else if diff == self.last_diff_secs {
                self.last_diff_repeat_count += 1;
                if self.last_diff_repeat_count >= self.config.max_interval_failed_count {
                    self.last_capture_time_ms = now_ms;
                    return self.fail(INTERVAL_FAILURE_INFO);
                }
            }
            self.last_capture_time_ms = now_ms;
        } else if diff <= self.config.max_many_failed_secs
            && self.failed_count >= self.config.max_failed_count
        {
            return self.fail(MANY_FAILED_INFO);
        }

        self.failed_count += 1;
        true
    }

    fn fail(&mut self, info: &'static str) -> bool {
        warn!("{} (failed count: {})", info, self.failed_count);
        self.last_error_info = Some(info);
        false
    }

    pub fn reset(&mut self) {
        self.last_capture_time_ms = 0;
        self.failed_count = 0;
        self.last_diff_secs = 0;
        self.last_diff_repeat_count = 0;
        self.last_error_info = None;
    }

    pub fn failed_count(&self) -> u32 {
        self.failed_count
    }

    pub fn last_error_info(&self) -> Option<&str> {
        self.last_error_info
    }

    /// Caller-facing error for a fatal classification
    pub fn failure_error(&self) -> Option<EngineError> {
        self.last_error_info
            .map(|info| EngineError::with_message(error_code::CAMERA_MANY_CAPTURE_FAILED, info))
    }
}

impl Default for CaptureFailureTracker {
    fn default() -> Self {
        Self::new()
    }
}
