use crate::error::{PanocapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single front lens
pub const MAIN_CAMERA_ID: u32 = 0;
/// Single rear lens
pub const SUB_CAMERA_ID: u32 = 1;
/// Both lenses, stitched into a panorama
pub const PANORAMA_CAMERA_ID: u32 = 2;

// Preview sizes the engine supports: width, height, fps
const PREVIEW_3868_1934_30: [u32; 3] = [3868, 1934, 30];
const PREVIEW_3868_3868_30: [u32; 3] = [3868, 3868, 30];
const PREVIEW_2900_2900_30: [u32; 3] = [2900, 2900, 30];
const PREVIEW_2900_2900_16: [u32; 3] = [2900, 2900, 16];
const PREVIEW_2900_2900_15: [u32; 3] = [2900, 2900, 15];
const PREVIEW_2900_2900_14: [u32; 3] = [2900, 2900, 14];
const PREVIEW_1932_1932_60: [u32; 3] = [1932, 1932, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionChangeRequest {
    pub camera_id: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Switch even if the engine already runs at this resolution
    pub force_change: bool,
}

impl ResolutionChangeRequest {
    pub fn new(camera_id: u32, width: u32, height: u32, fps: u32) -> Self {
        Self {
            camera_id,
            width,
            height,
            fps,
            force_change: false,
        }
    }

    /// Parse `[width, height, fps, camera_id]`; the legacy 3-value form
    /// selects the panoramic camera
    pub fn from_values(values: &[u32], force_change: bool) -> Result<Self> {
        let camera_id = match values.len() {
            4 => values[3],
            3 => PANORAMA_CAMERA_ID,
            n => {
                return Err(PanocapError::invalid_request(format!(
                    "resolution needs 3 or 4 values, got {}: {:?}",
                    n, values
                )))
            }
        };
        Ok(Self {
            camera_id,
            width: values[0],
            height: values[1],
            fps: values[2],
            force_change,
        })
    }

    pub fn to_values(&self) -> [u32; 4] {
        [self.width, self.height, self.fps, self.camera_id]
    }

    pub fn forced(mut self) -> Self {
        self.force_change = true;
        self
    }

    fn preset(size: [u32; 3], camera_id: u32) -> Self {
        Self::new(camera_id, size[0], size[1], size[2])
    }

    pub fn photo(resolution: &str) -> Result<Self> {
        match resolution {
            "12K" | "5.7K" => Ok(Self::preset(PREVIEW_3868_1934_30, PANORAMA_CAMERA_ID)),
            other => Err(unsupported("photo", other, None)),
        }
    }

    /// Flat video from a single lens
    pub fn plane_video(main_camera: bool, fps: u32) -> Result<Self> {
        let size = match fps {
            60 => PREVIEW_1932_1932_60,
            30 => PREVIEW_2900_2900_30,
            _ => return Err(unsupported("plane video", "", Some(fps))),
        };
        let camera_id = if main_camera {
            MAIN_CAMERA_ID
        } else {
            SUB_CAMERA_ID
        };
        Ok(Self::preset(size, camera_id))
    }

    pub fn panorama_live(fps: u32) -> Result<Self> {
        match fps {
            30 => Ok(Self::preset(PREVIEW_2900_2900_30, PANORAMA_CAMERA_ID)),
            _ => Err(unsupported("panorama live", "", Some(fps))),
        }
    }

    pub fn screen_video() -> Self {
        Self::preset(PREVIEW_2900_2900_30, PANORAMA_CAMERA_ID)
    }

    pub fn vlog() -> Self {
        Self::preset(PREVIEW_2900_2900_30, PANORAMA_CAMERA_ID)
    }

    pub fn time_lapse(resolution: &str) -> Result<Self> {
        let size = match resolution {
            "8K" => PREVIEW_3868_3868_30,
            "5.7K" => PREVIEW_2900_2900_30,
            other => return Err(unsupported("time-lapse", other, None)),
        };
        Ok(Self::preset(size, PANORAMA_CAMERA_ID))
    }

    /// Low frame rate capture for street-view mapping
    pub fn street_view(resolution: &str, fps: u32) -> Result<Self> {
        let size = match (resolution, fps) {
            ("8K", 1 | 2 | 5) => PREVIEW_3868_3868_30,
            ("5.7K", 1 | 2 | 7) => PREVIEW_2900_2900_14,
            ("5.7K", 4) => PREVIEW_2900_2900_16,
            ("5.7K", 3) => PREVIEW_2900_2900_15,
            _ => return Err(unsupported("street view", resolution, Some(fps))),
        };
        Ok(Self::preset(size, PANORAMA_CAMERA_ID))
    }
}

fn unsupported(mode: &str, resolution: &str, fps: Option<u32>) -> PanocapError {
    let mut message = format!("{} does not support", mode);
    if !resolution.is_empty() {
        message.push_str(&format!(" resolution {}", resolution));
    }
    if let Some(fps) = fps {
        message.push_str(&format!(" at {}fps", fps));
    }
    PanocapError::invalid_request(message)
}

impl fmt::Display for ResolutionChangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{} camera {}{}",
            self.width,
            self.height,
            self.fps,
            self.camera_id,
            if self.force_change { " (forced)" } else { "" }
        )
    }
}
