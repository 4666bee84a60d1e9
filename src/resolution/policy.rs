use super::request::{ResolutionChangeRequest, MAIN_CAMERA_ID};
use crate::engine::{LensCorrectionMode, PreviewParams};
use crate::surface::AspectRatio;

const DEFAULT_FIELD_OF_VIEW: u32 = 90;
const PHOTO_STABILIZATION_HEIGHT: u32 = 1934;
const DEFAULT_STABILIZATION_HEIGHT: u32 = 2900;
const HIGH_FPS_STABILIZATION_HEIGHT: u32 = 1932;
const FULL_RES_STABILIZATION_HEIGHT: u32 = 3868;

/// Per use case settings for a resolution switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    Photo,
    PanoramaLive,
    PlaneVideo {
        field_of_view: u32,
        aspect: AspectRatio,
    },
    ScreenVideo {
        aspect: AspectRatio,
    },
    TimeLapse {
        aspect: AspectRatio,
    },
    StreetView,
    Vlog,
}

impl ResolutionPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ResolutionPolicy::Photo => "photo",
            ResolutionPolicy::PanoramaLive => "panorama_live",
            ResolutionPolicy::PlaneVideo { .. } => "plane_video",
            ResolutionPolicy::ScreenVideo { .. } => "screen_video",
            ResolutionPolicy::TimeLapse { .. } => "time_lapse",
            ResolutionPolicy::StreetView => "street_view",
            ResolutionPolicy::Vlog => "vlog",
        }
    }

    /// Aspect the render surface is laid out for
    pub fn aspect(&self) -> AspectRatio {
        match self {
            ResolutionPolicy::PlaneVideo { aspect, .. }
            | ResolutionPolicy::ScreenVideo { aspect }
            | ResolutionPolicy::TimeLapse { aspect } => *aspect,
            _ => AspectRatio::PANORAMA,
        }
    }

    pub fn lock_default_preview_fps(&self) -> bool {
        matches!(
            self,
            ResolutionPolicy::Photo | ResolutionPolicy::TimeLapse { .. } | ResolutionPolicy::Vlog
        )
    }

    pub fn field_of_view(&self) -> u32 {
        match self {
            ResolutionPolicy::PlaneVideo { field_of_view, .. } => *field_of_view,
            _ => DEFAULT_FIELD_OF_VIEW,
        }
    }

    pub fn lens_correction(&self, camera_id: u32) -> LensCorrectionMode {
        match self {
            ResolutionPolicy::PlaneVideo { .. } if camera_id == MAIN_CAMERA_ID => {
                LensCorrectionMode::PlaneMode0
            }
            ResolutionPolicy::PlaneVideo { .. } => LensCorrectionMode::PlaneMode1,
            _ => LensCorrectionMode::PanoMode2,
        }
    }

    /// Media height the stabilizer is calibrated against
    pub fn stabilization_height(&self, request: &ResolutionChangeRequest) -> u32 {
        match self {
            ResolutionPolicy::Photo => PHOTO_STABILIZATION_HEIGHT,
            ResolutionPolicy::PlaneVideo { .. } if request.fps == 60 => {
                HIGH_FPS_STABILIZATION_HEIGHT
            }
            ResolutionPolicy::TimeLapse { .. } | ResolutionPolicy::StreetView
                if request.width == FULL_RES_STABILIZATION_HEIGHT =>
            {
                FULL_RES_STABILIZATION_HEIGHT
            }
            _ => DEFAULT_STABILIZATION_HEIGHT,
        }
    }

    /// Preview settings applied once the engine confirms the switch
    pub fn preview_params(&self, request: &ResolutionChangeRequest) -> PreviewParams {
        PreviewParams {
            lens_correction: self.lens_correction(request.camera_id),
            field_of_view: self.field_of_view(),
            stabilization_height: self.stabilization_height(request),
        }
    }
}
