use super::*;
use crate::config::PanocapConfig;
use crate::context::PanoContext;
use crate::engine::{
    CameraBehavior, EngineCall, LensCorrectionMode, Outcome, PreviewParams, SimulatedEngine,
};
use crate::error::{error_code, PanocapError};
use crate::events::PanoEvent;
use crate::surface::{AspectRatio, RenderSurface, SimulatedSurface, SurfaceSize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, PartialEq)]
enum Heard {
    Filled([u32; 4]),
    Success(CameraBehavior),
    Error(i32),
}

struct RecordingListener {
    sender: mpsc::UnboundedSender<Heard>,
}

impl RecordingListener {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Heard>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }
}

impl ResolutionListener for RecordingListener {
    fn fill_params(&self, camera_id: u32, width: u32, height: u32, fps: u32) {
        let _ = self
            .sender
            .send(Heard::Filled([width, height, fps, camera_id]));
    }

    fn on_success(&self, behavior: CameraBehavior) {
        let _ = self.sender.send(Heard::Success(behavior));
    }

    fn on_error(&self, code: i32, _message: &str) {
        let _ = self.sender.send(Heard::Error(code));
    }
}

fn aspect(s: &str) -> AspectRatio {
    s.parse().unwrap()
}

fn setup(
    surface: SimulatedSurface,
) -> (Arc<SimulatedEngine>, PanoContext, ResolutionChangeCoordinator) {
    let engine = Arc::new(SimulatedEngine::new());
    let context = PanoContext::new(engine.clone(), PanocapConfig::default());
    let coordinator = ResolutionChangeCoordinator::new(&context, Arc::new(surface));
    (engine, context, coordinator)
}

#[test]
fn test_legacy_request_defaults_to_panoramic_camera() {
    let request = ResolutionChangeRequest::from_values(&[1920, 1080, 30], false).unwrap();
    assert_eq!(request.to_values(), [1920, 1080, 30, 2]);
    assert_eq!(request.camera_id, PANORAMA_CAMERA_ID);

    let request = ResolutionChangeRequest::from_values(&[2900, 2900, 30, 0], true).unwrap();
    assert_eq!(request.to_values(), [2900, 2900, 30, 0]);
    assert!(request.force_change);
}

#[test]
fn test_malformed_request_is_rejected() {
    for values in [&[][..], &[1920][..], &[1920, 1080][..], &[1, 2, 3, 4, 5][..]] {
        assert!(matches!(
            ResolutionChangeRequest::from_values(values, false),
            Err(PanocapError::InvalidRequest { .. })
        ));
    }
}

#[test]
fn test_presets() {
    assert_eq!(
        ResolutionChangeRequest::photo("5.7K").unwrap().to_values(),
        [3868, 1934, 30, 2]
    );
    assert_eq!(
        ResolutionChangeRequest::plane_video(true, 60).unwrap().to_values(),
        [1932, 1932, 60, 0]
    );
    assert_eq!(
        ResolutionChangeRequest::plane_video(false, 30).unwrap().to_values(),
        [2900, 2900, 30, 1]
    );
    assert_eq!(
        ResolutionChangeRequest::street_view("5.7K", 4).unwrap().to_values(),
        [2900, 2900, 16, 2]
    );
    assert_eq!(
        ResolutionChangeRequest::time_lapse("8K").unwrap().to_values(),
        [3868, 3868, 30, 2]
    );

    assert!(ResolutionChangeRequest::photo("8K").is_err());
    assert!(ResolutionChangeRequest::plane_video(true, 24).is_err());
    assert!(ResolutionChangeRequest::street_view("8K", 30).is_err());
    assert!(ResolutionChangeRequest::panorama_live(60).is_err());
}

#[test]
fn test_policy_configuration() {
    let photo = ResolutionChangeRequest::photo("12K").unwrap();
    assert_eq!(
        ResolutionPolicy::Photo.preview_params(&photo),
        PreviewParams {
            lens_correction: LensCorrectionMode::PanoMode2,
            field_of_view: 90,
            stabilization_height: 1934,
        }
    );
    assert!(ResolutionPolicy::Photo.lock_default_preview_fps());
    assert!(ResolutionPolicy::Photo.aspect().is_panorama());

    let plane = ResolutionPolicy::PlaneVideo {
        field_of_view: 120,
        aspect: aspect("16:9"),
    };
    let main_60 = ResolutionChangeRequest::plane_video(true, 60).unwrap();
    let sub_30 = ResolutionChangeRequest::plane_video(false, 30).unwrap();
    assert_eq!(
        plane.preview_params(&main_60),
        PreviewParams {
            lens_correction: LensCorrectionMode::PlaneMode0,
            field_of_view: 120,
            stabilization_height: 1932,
        }
    );
    assert_eq!(
        plane.preview_params(&sub_30).lens_correction,
        LensCorrectionMode::PlaneMode1
    );
    assert_eq!(plane.preview_params(&sub_30).stabilization_height, 2900);
    assert!(!plane.lock_default_preview_fps());

    let street_8k = ResolutionChangeRequest::street_view("8K", 5).unwrap();
    let street_57k = ResolutionChangeRequest::street_view("5.7K", 7).unwrap();
    assert_eq!(ResolutionPolicy::StreetView.stabilization_height(&street_8k), 3868);
    assert_eq!(ResolutionPolicy::StreetView.stabilization_height(&street_57k), 2900);
    assert!(!ResolutionPolicy::StreetView.lock_default_preview_fps());
    assert!(ResolutionPolicy::Vlog.lock_default_preview_fps());
}

#[tokio::test(start_paused = true)]
async fn test_engine_switch_waits_for_surface() {
    let surface = SimulatedSurface::new(SurfaceSize::new(1000, 500), Duration::from_millis(250));
    let (engine, context, coordinator) = setup(surface.clone());
    let mut events = context.event_bus.subscribe();
    let (listener, mut heard) = RecordingListener::new();

    let request = ResolutionChangeRequest::from_values(&[1920, 1080, 30], false).unwrap();
    let policy = ResolutionPolicy::ScreenVideo {
        aspect: aspect("16:9"),
    };
    coordinator.change_resolution(request, policy, listener.clone());

    assert_eq!(heard.recv().await, Some(Heard::Filled([1920, 1080, 30, 2])));
    // The engine is not asked before the surface settles
    assert_eq!(engine.calls(), vec![EngineCall::LockPreviewFps(false)]);

    assert_eq!(
        heard.recv().await,
        Some(Heard::Success(CameraBehavior::Switch))
    );
    assert_eq!(surface.observed_size(), SurfaceSize::new(889, 500));

    let calls = engine.calls();
    assert_eq!(
        calls[1],
        EngineCall::ChangeResolution {
            values: [1920, 1080, 30, 2],
            force: false
        }
    );
    assert!(matches!(calls[2], EngineCall::ApplyPreview(_)));

    let event = events.recv().await.unwrap();
    assert!(matches!(
        event.event,
        PanoEvent::ResolutionChanged {
            camera_id: 2,
            width: 1920,
            ..
        }
    ));
}

#[tokio::test]
async fn test_engine_error_is_forwarded() {
    let surface = SimulatedSurface::new(SurfaceSize::new(1000, 500), Duration::ZERO);
    let (engine, _context, coordinator) = setup(surface);
    engine.script_resolution(Outcome::fail_after(error_code::CAMERA_NOT_OPENED, 0));
    let (listener, mut heard) = RecordingListener::new();

    let request = ResolutionChangeRequest::photo("5.7K").unwrap().forced();
    coordinator
        .change_resolution(request, ResolutionPolicy::Photo, listener)
        .await
        .unwrap();

    assert_eq!(heard.recv().await, Some(Heard::Filled([3868, 1934, 30, 2])));
    assert_eq!(
        heard.recv().await,
        Some(Heard::Error(error_code::CAMERA_NOT_OPENED))
    );
    // Preview settings are left alone on failure
    assert!(!engine
        .calls()
        .iter()
        .any(|call| matches!(call, EngineCall::ApplyPreview(_))));
}

#[tokio::test]
async fn test_synchronous_refusal_reports_unknown() {
    let surface = SimulatedSurface::new(SurfaceSize::new(1000, 500), Duration::ZERO);
    let (engine, _context, coordinator) = setup(surface);
    engine.script_resolution(Outcome::reject("camera busy"));
    let (listener, mut heard) = RecordingListener::new();

    coordinator
        .change_resolution(ResolutionChangeRequest::vlog(), ResolutionPolicy::Vlog, listener)
        .await
        .unwrap();

    heard.recv().await;
    assert_eq!(heard.recv().await, Some(Heard::Error(error_code::UN_KNOWN)));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_pending_aborts_surface_wait() {
    let (engine, _context, coordinator) = setup(SimulatedSurface::frozen(SurfaceSize::new(1000, 500)));
    let (listener, mut heard) = RecordingListener::new();

    let policy = ResolutionPolicy::TimeLapse {
        aspect: aspect("4:3"),
    };
    let task = coordinator.change_resolution(
        ResolutionChangeRequest::time_lapse("5.7K").unwrap(),
        policy,
        listener,
    );
    tokio::time::sleep(Duration::from_millis(500)).await;
    coordinator.cancel_pending();
    task.await.unwrap();

    heard.recv().await;
    assert_eq!(heard.recv().await, Some(Heard::Error(error_code::UN_KNOWN)));
    assert!(!engine
        .calls()
        .iter()
        .any(|call| matches!(call, EngineCall::ChangeResolution { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_surface_timeout_never_reaches_engine() {
    let engine = Arc::new(SimulatedEngine::new());
    let mut config = PanocapConfig::default();
    config.surface.wait_timeout_ms = 1_000;
    let context = PanoContext::new(engine.clone(), config);
    let surface = SimulatedSurface::frozen(SurfaceSize::new(1000, 500));
    let coordinator = ResolutionChangeCoordinator::new(&context, Arc::new(surface));
    let (listener, mut heard) = RecordingListener::new();
    let policy = ResolutionPolicy::ScreenVideo {
        aspect: aspect("4:3"),
    };

    for _ in 0..2 {
        let request = ResolutionChangeRequest::screen_video();
        coordinator
            .change_resolution(request, policy, listener.clone())
            .await
            .unwrap();

        assert!(matches!(heard.recv().await, Some(Heard::Filled(_))));
        assert_eq!(heard.recv().await, Some(Heard::Error(error_code::TIME_OUT)));
    }

    assert!(!engine
        .calls()
        .iter()
        .any(|call| matches!(call, EngineCall::ChangeResolution { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_cancel_waits_for_surface() {
    let surface = SimulatedSurface::new(SurfaceSize::new(1000, 500), Duration::from_millis(250));
    let (engine, _context, coordinator) = setup(surface.clone());
    let (listener, mut heard) = RecordingListener::new();
    let policy = ResolutionPolicy::ScreenVideo {
        aspect: aspect("4:3"),
    };

    let first = coordinator.change_resolution(
        ResolutionChangeRequest::screen_video(),
        policy,
        listener.clone(),
    );
    coordinator.cancel_pending();
    first.await.unwrap();

    assert!(matches!(heard.recv().await, Some(Heard::Filled(_))));
    assert_eq!(heard.recv().await, Some(Heard::Error(error_code::UN_KNOWN)));

    let second = coordinator.change_resolution(
        ResolutionChangeRequest::screen_video(),
        policy,
        listener,
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    // Still waiting for the surface, so the engine has not been asked yet
    assert!(!engine
        .calls()
        .iter()
        .any(|call| matches!(call, EngineCall::ChangeResolution { .. })));

    second.await.unwrap();
    assert!(matches!(heard.recv().await, Some(Heard::Filled(_))));
    assert_eq!(
        heard.recv().await,
        Some(Heard::Success(CameraBehavior::Switch))
    );
    assert_eq!(surface.observed_size(), SurfaceSize::new(667, 500));
}
