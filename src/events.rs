use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Milestones published by the orchestrators for observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanoEvent {
    /// A photo request was handed to the engine
    PhotoStarted { request_id: Uuid, hdr: bool },
    /// A photo request reached its terminal notification
    PhotoFinished {
        request_id: Uuid,
        success: bool,
        timed_out: bool,
    },
    /// The engine confirmed a recording start
    RecordStarted { path: Option<String> },
    /// The engine confirmed a recording stop
    RecordStopped { path: Option<String> },
    /// A record error was surfaced to the caller
    RecordFailed { code: i32 },
    /// A record error arrived after the caller asked to stop and was dropped
    RecordErrorSuppressed { code: i32 },
    /// The engine switched resolution
    ResolutionChanged {
        camera_id: u32,
        width: u32,
        height: u32,
        fps: u32,
    },
    /// The engine refused a resolution switch
    ResolutionFailed { code: i32 },
    /// The capture failure tracker classified the run as fatal
    CaptureFailurePattern { info: String, failed_count: u32 },
}

impl PanoEvent {
    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            PanoEvent::PhotoStarted { .. } => "photo_started",
            PanoEvent::PhotoFinished { .. } => "photo_finished",
            PanoEvent::RecordStarted { .. } => "record_started",
            PanoEvent::RecordStopped { .. } => "record_stopped",
            PanoEvent::RecordFailed { .. } => "record_failed",
            PanoEvent::RecordErrorSuppressed { .. } => "record_error_suppressed",
            PanoEvent::ResolutionChanged { .. } => "resolution_changed",
            PanoEvent::ResolutionFailed { .. } => "resolution_failed",
            PanoEvent::CaptureFailurePattern { .. } => "capture_failure_pattern",
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            PanoEvent::PhotoStarted { request_id, hdr } => {
                format!("Photo {} started (hdr: {})", request_id, hdr)
            }
            PanoEvent::PhotoFinished {
                request_id,
                success,
                timed_out,
            } => {
                if *timed_out {
                    format!("Photo {} timed out", request_id)
                } else if *success {
                    format!("Photo {} succeeded", request_id)
                } else {
                    format!("Photo {} failed", request_id)
                }
            }
            PanoEvent::RecordStarted { path } => format!("Recording started: {:?}", path),
            PanoEvent::RecordStopped { path } => format!("Recording stopped: {:?}", path),
            PanoEvent::RecordFailed { code } => format!("Recording failed ({})", code),
            PanoEvent::RecordErrorSuppressed { code } => {
                format!("Recording error ({}) suppressed after stop request", code)
            }
            PanoEvent::ResolutionChanged {
                camera_id,
                width,
                height,
                fps,
            } => format!(
                "Resolution changed to {}x{}@{} on camera {}",
                width, height, fps, camera_id
            ),
            PanoEvent::ResolutionFailed { code } => {
                format!("Resolution change failed ({})", code)
            }
            PanoEvent::CaptureFailurePattern { info, failed_count } => {
                format!("{} after {} failures", info, failed_count)
            }
        }
    }
}

/// Event with the wall-clock time it was published
#[derive(Debug, Clone, Serialize)]
pub struct TimedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: PanoEvent,
}

/// Event bus for observers using a broadcast channel
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TimedEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<TimedEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns the number of subscribers reached
    pub fn publish(&self, event: PanoEvent) -> usize {
        match &event {
            PanoEvent::CaptureFailurePattern { info, .. } => {
                warn!("Capture failure pattern: {}", info);
            }
            PanoEvent::RecordFailed { code } => {
                warn!("Record failure surfaced with code {}", code);
            }
            PanoEvent::ResolutionChanged { .. } => {
                info!("{}", event.description());
            }
            _ => debug!("Event: {}", event.description()),
        }

        let timed = TimedEvent {
            at: Utc::now(),
            event,
        };

        // No subscribers is not an error for publishers
        self.sender.send(timed).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &PanoEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}
