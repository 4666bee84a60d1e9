use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureKind {
    Photo,
    Video,
}

/// Container written by the engine for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFormat {
    Jpg,
    /// JPEG plus a raw sensor dump
    JpgRaw,
    /// JPEG plus a DNG
    JpgDng,
    Mp4,
}

impl MediaFormat {
    /// Completion signals the engine emits for one shot of this format
    pub fn files_per_shot(&self) -> u32 {
        match self {
            MediaFormat::JpgRaw | MediaFormat::JpgDng => 2,
            MediaFormat::Jpg | MediaFormat::Mp4 => 1,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Jpg | MediaFormat::JpgRaw | MediaFormat::JpgDng => "jpg",
            MediaFormat::Mp4 => "mp4",
        }
    }
}

/// A photo or video request; immutable once handed to an orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub id: Uuid,
    pub kind: CaptureKind,
    pub format: MediaFormat,
    pub resolution: String,
    /// Exposures merged into one photo (0 disables HDR)
    pub hdr_count: u32,
    pub artist: Option<String>,
    pub software_version: Option<String>,
    pub output_dir: PathBuf,
    pub basename: String,
}

impl CaptureRequest {
    pub fn photo<S: Into<String>, P: Into<PathBuf>>(resolution: S, output_dir: P) -> Self {
        Self::new(CaptureKind::Photo, MediaFormat::Jpg, resolution, output_dir)
    }

    pub fn video<S: Into<String>, P: Into<PathBuf>>(resolution: S, output_dir: P) -> Self {
        Self::new(CaptureKind::Video, MediaFormat::Mp4, resolution, output_dir)
    }

    fn new<S: Into<String>, P: Into<PathBuf>>(
        kind: CaptureKind,
        format: MediaFormat,
        resolution: S,
        output_dir: P,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            format,
            resolution: resolution.into(),
            hdr_count: 0,
            artist: None,
            software_version: None,
            output_dir: output_dir.into(),
            basename: Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string(),
        }
    }

    pub fn with_format(mut self, format: MediaFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_hdr_count(mut self, hdr_count: u32) -> Self {
        self.hdr_count = hdr_count;
        self
    }

    pub fn with_basename<S: Into<String>>(mut self, basename: S) -> Self {
        self.basename = basename.into();
        self
    }

    pub fn is_hdr(&self) -> bool {
        self.hdr_count > 0
    }

    /// File the engine writes the (unstitched) media to
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.basename, self.format.extension()))
    }
}

/// One event of a multi-stage photo capture
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoStage {
    /// A shot of the capture began; HDR captures emit several
    Started { index: u32 },
    /// Sensor exposure finished, processing continues
    CaptureEnded,
    /// One output finished; `error_code` is 0 on success
    Completed { error_code: i32, files: PhotoFiles },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoFiles {
    pub stitched: Option<PathBuf>,
    pub unstitched: Option<PathBuf>,
}

impl PhotoFiles {
    pub fn unstitched(path: &Path) -> Self {
        Self {
            stitched: None,
            unstitched: Some(path.to_path_buf()),
        }
    }
}

/// What the camera did to satisfy a resolution change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraBehavior {
    Open,
    Switch,
    StartPreview,
    UpdatePreview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LensCorrectionMode {
    Stitched2,
    FishEye,
    PanoMode2,
    PanoMode4,
    PlaneMode0,
    PlaneMode1,
}

impl LensCorrectionMode {
    /// Engine wire value
    pub fn code(&self) -> u32 {
        match self {
            LensCorrectionMode::Stitched2 => 0x2,
            LensCorrectionMode::FishEye => 0x03,
            LensCorrectionMode::PanoMode2 => 0x11,
            LensCorrectionMode::PanoMode4 => 0x1111,
            LensCorrectionMode::PlaneMode0 => 0x09,
            LensCorrectionMode::PlaneMode1 => 0x90,
        }
    }
}

impl fmt::Display for LensCorrectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:x})", self, self.code())
    }
}

/// Preview settings applied after a successful resolution switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewParams {
    pub lens_correction: LensCorrectionMode,
    pub field_of_view: u32,
    /// Media height the stabilizer uses as its reference
    pub stabilization_height: u32,
}
