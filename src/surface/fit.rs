use crate::error::PanocapError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Width to height ratio written as `W:H`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    pub const PANORAMA: AspectRatio = AspectRatio {
        width: 2,
        height: 1,
    };

    pub fn new(width: u32, height: u32) -> Result<Self, PanocapError> {
        if width == 0 || height == 0 {
            return Err(PanocapError::invalid_request(format!(
                "aspect ratio must be positive: {}:{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// Full 360° output fills the parent instead of being boxed
    pub fn is_panorama(&self) -> bool {
        *self == Self::PANORAMA
    }

    /// Largest box of this ratio that fits inside `parent`
    pub fn fit_within(&self, parent: SurfaceSize) -> SurfaceSize {
        let (w, h) = (self.width as u64, self.height as u64);
        let (pw, ph) = (parent.width as u64, parent.height as u64);

        // Parent wider than the ratio: height is the limit
        if pw * h > ph * w {
            let width = ((ph * w) as f64 / h as f64).round() as u32;
            SurfaceSize::new(width, parent.height)
        } else {
            let height = ((pw * h) as f64 / w as f64).round() as u32;
            SurfaceSize::new(parent.width, height)
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = PanocapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PanocapError::invalid_request(format!("aspect ratio is invalid: {}", s));

        let (width, height) = s.split_once(':').ok_or_else(invalid)?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        let height = height.trim().parse().map_err(|_| invalid())?;
        Self::new(width, height)
    }
}
