use super::*;
use crate::config::PanocapConfig;
use crate::context::PanoContext;
use crate::engine::{CaptureRequest, EngineCall, MediaFormat, Outcome, SimulatedEngine};
use crate::error::{error_code, EngineError};
use crate::events::PanoEvent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, PartialEq)]
enum Heard {
    Start,
    Shot(u32),
    End,
    Success {
        hdr: bool,
        unstitched: Option<PathBuf>,
    },
    Error {
        hdr: bool,
        message: String,
    },
    ScreenPhoto(PathBuf),
    ScreenPhotoError(i32),
    Restored,
    RestoreError(i32),
}

struct RecordingListener {
    sender: mpsc::UnboundedSender<Heard>,
}

impl RecordingListener {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Heard>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }

    fn heard(&self, heard: Heard) {
        let _ = self.sender.send(heard);
    }
}

impl PhotoListener for RecordingListener {
    fn on_take_start(&self) {
        self.heard(Heard::Start);
    }

    fn on_take_shot(&self, index: u32) {
        self.heard(Heard::Shot(index));
    }

    fn on_take_end(&self) {
        self.heard(Heard::End);
    }

    fn on_take_success(&self, is_hdr: bool, _stitched: Option<PathBuf>, unstitched: Option<PathBuf>) {
        self.heard(Heard::Success {
            hdr: is_hdr,
            unstitched,
        });
    }

    fn on_take_error(&self, is_hdr: bool, message: &str) {
        self.heard(Heard::Error {
            hdr: is_hdr,
            message: message.to_string(),
        });
    }
}

impl ScreenPhotoListener for RecordingListener {
    fn on_screen_photo_success(&self, path: PathBuf) {
        self.heard(Heard::ScreenPhoto(path));
    }

    fn on_screen_photo_error(&self, code: i32) {
        self.heard(Heard::ScreenPhotoError(code));
    }
}

impl OperationListener for RecordingListener {
    fn on_success(&self) {
        self.heard(Heard::Restored);
    }

    fn on_error(&self, error: EngineError) {
        self.heard(Heard::RestoreError(error.code));
    }
}

fn setup() -> (Arc<SimulatedEngine>, PanoContext, CaptureOrchestrator) {
    let engine = Arc::new(SimulatedEngine::new());
    let context = PanoContext::new(engine.clone(), PanocapConfig::default());
    let orchestrator = CaptureOrchestrator::new(&context);
    (engine, context, orchestrator)
}

fn photo() -> CaptureRequest {
    CaptureRequest::photo("5.7K", "/media").with_basename("IMG_0001")
}

async fn assert_quiet(heard: &mut mpsc::UnboundedReceiver<Heard>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(heard.try_recv().is_err());
}

#[tokio::test]
async fn test_photo_success_sequence() {
    let (_engine, context, orchestrator) = setup();
    let mut events = context.event_bus.subscribe();
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.take_photo(photo(), listener);

    assert_eq!(heard.recv().await, Some(Heard::Start));
    assert_eq!(heard.recv().await, Some(Heard::Shot(0)));
    assert_eq!(heard.recv().await, Some(Heard::End));
    assert_eq!(
        heard.recv().await,
        Some(Heard::Success {
            hdr: false,
            unstitched: Some(PathBuf::from("/media/IMG_0001.jpg")),
        })
    );

    let started = events.recv().await.unwrap();
    assert!(matches!(started.event, PanoEvent::PhotoStarted { hdr: false, .. }));
    let finished = events.recv().await.unwrap();
    assert!(matches!(
        finished.event,
        PanoEvent::PhotoFinished {
            success: true,
            timed_out: false,
            ..
        }
    ));
}

#[tokio::test]
async fn test_dual_file_photo_completes_once() {
    let (_engine, _context, orchestrator) = setup();
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.take_photo(photo().with_format(MediaFormat::JpgDng), listener);

    let mut terminal = 0;
    while let Some(event) = heard.recv().await {
        if matches!(event, Heard::Success { .. } | Heard::Error { .. }) {
            terminal += 1;
            break;
        }
    }
    assert_eq!(terminal, 1);
    assert_quiet(&mut heard).await;
}

#[tokio::test]
async fn test_fatal_code_completes_without_second_file() {
    let (engine, _context, orchestrator) = setup();
    engine.script_photo(Outcome::fail_after(error_code::CAMERA_NOT_OPENED, 0));
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.take_photo(photo().with_format(MediaFormat::JpgRaw), listener);

    heard.recv().await;
    heard.recv().await;
    heard.recv().await;
    assert_eq!(
        heard.recv().await,
        Some(Heard::Error {
            hdr: false,
            message: format!("{} ({})", PHOTO_ERROR, error_code::CAMERA_NOT_OPENED),
        })
    );
    assert_quiet(&mut heard).await;
}

#[tokio::test]
async fn test_synchronous_refusal_reports_unknown() {
    let (engine, _context, orchestrator) = setup();
    engine.script_photo(Outcome::reject("camera closed"));
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.take_photo(photo().with_hdr_count(3), listener);

    assert_eq!(heard.recv().await, Some(Heard::Start));
    assert_eq!(
        heard.recv().await,
        Some(Heard::Error {
            hdr: true,
            message: format!("{}(-1,camera closed)", PHOTO_ERROR),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_silent_engine_times_out_once() {
    let (engine, context, orchestrator) = setup();
    engine.script_photo(Outcome::Hang);
    let mut events = context.event_bus.subscribe();
    let (listener, mut heard) = RecordingListener::new();
    let started = Instant::now();

    orchestrator.take_photo(photo(), listener);

    assert_eq!(heard.recv().await, Some(Heard::Start));
    assert_eq!(heard.recv().await, Some(Heard::Shot(0)));
    assert_eq!(heard.recv().await, Some(Heard::End));
    assert_eq!(
        heard.recv().await,
        Some(Heard::Error {
            hdr: false,
            message: PHOTO_TIMEOUT_ERROR.to_string(),
        })
    );
    assert!(started.elapsed() >= Duration::from_secs(40));

    events.recv().await.unwrap();
    let finished = events.recv().await.unwrap();
    assert!(matches!(
        finished.event,
        PanoEvent::PhotoFinished {
            timed_out: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_hdr_photo_reports_every_shot() {
    let (_engine, _context, orchestrator) = setup();
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.take_photo(photo().with_hdr_count(3), listener);

    assert_eq!(heard.recv().await, Some(Heard::Start));
    assert_eq!(heard.recv().await, Some(Heard::Shot(0)));
    assert_eq!(heard.recv().await, Some(Heard::Shot(1)));
    assert_eq!(heard.recv().await, Some(Heard::Shot(2)));
    assert_eq!(heard.recv().await, Some(Heard::End));
    assert!(matches!(
        heard.recv().await,
        Some(Heard::Success { hdr: true, .. })
    ));
}

#[tokio::test]
async fn test_photos_reach_engine_in_order() {
    let (engine, _context, orchestrator) = setup();
    let (listener, mut heard) = RecordingListener::new();

    let requests: Vec<CaptureRequest> = (0..3).map(|_| photo()).collect();
    let ids: Vec<_> = requests.iter().map(|request| request.id).collect();
    for request in requests {
        orchestrator.take_photo(request, listener.clone());
    }

    let mut successes = 0;
    while successes < 3 {
        if let Some(Heard::Success { .. }) = heard.recv().await {
            successes += 1;
        }
    }

    let dispatched: Vec<_> = engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EngineCall::TakePhoto { request_id } => Some(request_id),
            _ => None,
        })
        .collect();
    assert_eq!(dispatched, ids);
}

#[tokio::test]
async fn test_screen_photo() {
    let (engine, _context, orchestrator) = setup();
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.take_screen_photo(PathBuf::from("/media/screen.jpg"), 1280, 640, listener.clone());
    assert_eq!(
        heard.recv().await,
        Some(Heard::ScreenPhoto(PathBuf::from("/media/screen.jpg")))
    );

    engine.script_pick(Outcome::reject("no preview"));
    orchestrator.take_screen_photo(PathBuf::from("/media/screen2.jpg"), 1280, 640, listener);
    assert_eq!(
        heard.recv().await,
        Some(Heard::ScreenPhotoError(error_code::UN_KNOWN))
    );
}

#[tokio::test(start_paused = true)]
async fn test_restore_preview_waits_for_hdr_drain() {
    let (engine, _context, orchestrator) = setup();
    engine.set_hdr_skip_frames(5);
    let (listener, mut heard) = RecordingListener::new();

    let drainer = engine.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        drainer.set_hdr_skip_frames(0);
    });

    let started = Instant::now();
    orchestrator.restore_preview(listener);

    assert_eq!(heard.recv().await, Some(Heard::Restored));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(engine.calls(), vec![EngineCall::RestorePreview]);
}

#[tokio::test]
async fn test_restore_preview_error_is_immediate() {
    let (engine, _context, orchestrator) = setup();
    engine.set_hdr_skip_frames(5);
    engine.script_restore(Outcome::fail_after(error_code::CAMERA_SESSION_UPDATE_FAILED, 0));
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.restore_preview(listener);

    assert_eq!(
        heard.recv().await,
        Some(Heard::RestoreError(error_code::CAMERA_SESSION_UPDATE_FAILED))
    );
}

#[tokio::test]
async fn test_capture_failure_burst_stops_retries() {
    let (_engine, context, orchestrator) = setup();
    let mut events = context.event_bus.subscribe();

    for _ in 0..30 {
        assert!(orchestrator.on_capture_failed());
    }
    assert!(!orchestrator.on_capture_failed());

    let error = orchestrator.capture_failure_error().unwrap();
    assert_eq!(error.code, error_code::CAMERA_MANY_CAPTURE_FAILED);

    let event = events.recv().await.unwrap();
    assert!(matches!(
        event.event,
        PanoEvent::CaptureFailurePattern {
            failed_count: 30,
            ..
        }
    ));

    orchestrator.reset_capture_failures();
    assert!(orchestrator.capture_failure_error().is_none());
    assert!(orchestrator.on_capture_failed());
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_photo_releases_listener() {
    let (engine, _context, orchestrator) = setup();
    engine.script_photo(Outcome::Hang);
    let (listener, mut heard) = RecordingListener::new();

    orchestrator.take_photo(photo(), listener.clone());

    loop {
        if let Some(Heard::Error { message, .. }) = heard.recv().await {
            assert_eq!(message, PHOTO_TIMEOUT_ERROR);
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The engine still holds its stage sender, yet the watch has let go
    assert_eq!(Arc::strong_count(&listener), 1);
}
