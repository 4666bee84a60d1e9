use thiserror::Error;

/// Stable integer error codes delivered to callers
pub mod error_code {
    pub const SUCCESS: i32 = 0;
    pub const UN_KNOWN: i32 = -1;
    pub const NOT_INIT: i32 = 1;
    pub const TIME_OUT: i32 = 5;

    pub const ALREADY_RELEASE: i32 = 10;

    pub const CAMERA_NOT_OPENED: i32 = 20;
    pub const CAMERA_SESSION_NOT_CREATE: i32 = 21;
    pub const CAMERA_SESSION_CONFIGURE_FAILED: i32 = 22;
    pub const CAMERA_SESSION_UPDATE_FAILED: i32 = 23;
    pub const CAMERA_MANY_CAPTURE_FAILED: i32 = 24;

    pub const TAKE_PHOTO_CAPTURE_FAILED: i32 = 31;
    pub const HDR_PHOTO_STACK_FAILED: i32 = 35;

    pub const RECORD_ENCODE_CONFIGURE_FAILED: i32 = 40;
    pub const RECORD_CAMERA_OUT_SURFACE_ILLEGAL: i32 = 41;
    pub const RECORD_WRITE_FILE_ERROR: i32 = 42;

    pub const RESOLUTION_DATA_NO_CHANGE: i32 = 50;

    /// Recording could not be stopped cleanly
    pub const ERROR_ON_STOP: i32 = -1000;
    /// Recording could not be started
    pub const ERROR_ON_START: i32 = -1001;
}

/// Error reported by the capture engine or generated by an orchestrator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("engine error {code}{}", detail(.message.as_deref()))]
pub struct EngineError {
    pub code: i32,
    pub message: Option<String>,
}

impl EngineError {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message<S: Into<String>>(code: i32, message: S) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Dispatch failure raised synchronously by the engine
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::with_message(error_code::UN_KNOWN, message)
    }
}

fn detail(message: Option<&str>) -> String {
    message
        .map(|message| format!(": {}", message))
        .unwrap_or_default()
}

#[derive(Error, Debug)]
pub enum PanocapError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Surface did not reach {width}x{height} within {waited_ms}ms")]
    SurfaceTimeout {
        width: u32,
        height: u32,
        waited_ms: u64,
    },

    #[error("Surface resize cancelled")]
    SurfaceCancelled,
}

impl PanocapError {
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Map into the caller-facing error taxonomy
    pub fn to_engine_error(&self) -> EngineError {
        match self {
            PanocapError::Engine(error) => error.clone(),
            PanocapError::SurfaceTimeout { .. } => {
                EngineError::with_message(error_code::TIME_OUT, self.to_string())
            }
            other => EngineError::unknown(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PanocapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        assert_eq!(
            EngineError::new(error_code::CAMERA_NOT_OPENED).to_string(),
            "engine error 20"
        );
        assert_eq!(
            EngineError::unknown("camera busy").to_string(),
            "engine error -1: camera busy"
        );
    }

    #[test]
    fn test_surface_timeout_maps_to_time_out_code() {
        let error = PanocapError::SurfaceTimeout {
            width: 667,
            height: 500,
            waited_ms: 1_000,
        };
        assert_eq!(error.to_engine_error().code, error_code::TIME_OUT);
        assert_eq!(
            PanocapError::SurfaceCancelled.to_engine_error().code,
            error_code::UN_KNOWN
        );

        let engine = PanocapError::from(EngineError::new(error_code::NOT_INIT));
        assert_eq!(engine.to_string(), "engine error 1");
        assert_eq!(engine.to_engine_error(), EngineError::new(error_code::NOT_INIT));
    }
}
