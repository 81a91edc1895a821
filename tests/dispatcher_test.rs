//! 动作编排集成测试：用录制桩替换全部外部协作方，
//! 验证前置条件、忙碌丢弃、过期上传抑制与各动作序列。

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

use pastepipe::blob::ImageBlob;
use pastepipe::dispatch::{
    Action, ActionDispatcher, ActionOutcome, ClipboardSink, DownloadSink, NamedFile, Notifier,
    ToastKind, UploadService,
};
use pastepipe::error::AppError;
use pastepipe::pipeline::{OutputFormat, PipelineConfig, TransformPipeline};
use pastepipe::preview::{FixedViewport, PreviewController};
use pastepipe::session::SessionState;
use pastepipe::settings::SettingsStore;

fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 255) as u8, (y % 255) as u8, 0, 255])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

#[derive(Clone, Default)]
struct RecordingUploader {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl UploadService for RecordingUploader {
    async fn upload(&self, file: NamedFile) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(format!("https://cdn.example.com/{}", file.name))
    }
}

#[derive(Clone, Default)]
struct FailingUploader {
    delay: Option<Duration>,
}

impl UploadService for FailingUploader {
    async fn upload(&self, _file: NamedFile) -> Result<String, AppError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(AppError::Network("upstream unavailable".to_string()))
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    saved: Arc<Mutex<Vec<ImageBlob>>>,
}

impl DownloadSink for RecordingSink {
    fn save(&self, blob: &ImageBlob) -> Result<PathBuf, AppError> {
        self.saved
            .lock()
            .expect("sink lock should not be poisoned")
            .push(blob.clone());
        Ok(PathBuf::from("saved"))
    }
}

#[derive(Clone, Default)]
struct RecordingClipboard {
    written: Arc<Mutex<Vec<ImageBlob>>>,
}

impl ClipboardSink for RecordingClipboard {
    async fn write_image(&self, blob: &ImageBlob) -> Result<(), AppError> {
        self.written
            .lock()
            .expect("clipboard lock should not be poisoned")
            .push(blob.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    toasts: Arc<Mutex<Vec<(ToastKind, String)>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    fn toasts(&self) -> Vec<(ToastKind, String)> {
        self.toasts
            .lock()
            .expect("toast lock should not be poisoned")
            .clone()
    }

    fn urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .expect("url lock should not be poisoned")
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn toast(&self, kind: ToastKind, message: &str) {
        self.toasts
            .lock()
            .expect("toast lock should not be poisoned")
            .push((kind, message.to_string()));
    }

    fn publish_url(&self, url: &str) {
        self.urls
            .lock()
            .expect("url lock should not be poisoned")
            .push(url.to_string());
    }
}

struct Harness {
    dispatcher: ActionDispatcher<RecordingUploader, RecordingSink, RecordingClipboard, RecordingNotifier>,
    uploader: RecordingUploader,
    sink: RecordingSink,
    clipboard: RecordingClipboard,
    notifier: RecordingNotifier,
    settings: Arc<SettingsStore>,
    _tempdir: tempfile::TempDir,
}

fn harness_with_uploader(uploader: RecordingUploader) -> Harness {
    let tempdir = tempfile::tempdir().expect("tempdir should be created");
    let settings = Arc::new(
        SettingsStore::open(tempdir.path().join("settings.json")).expect("store should open"),
    );
    let sink = RecordingSink::default();
    let clipboard = RecordingClipboard::default();
    let notifier = RecordingNotifier::default();

    let dispatcher = ActionDispatcher::new(
        TransformPipeline::new(PipelineConfig::default()),
        uploader.clone(),
        sink.clone(),
        clipboard.clone(),
        notifier.clone(),
        Arc::clone(&settings),
    );

    Harness {
        dispatcher,
        uploader,
        sink,
        clipboard,
        notifier,
        settings,
        _tempdir: tempdir,
    }
}

fn harness() -> Harness {
    harness_with_uploader(RecordingUploader::default())
}

fn ingest_png(sessions: &mut SessionState) -> Arc<pastepipe::session::Session> {
    let session = sessions.ingest(ImageBlob::new(create_png_bytes(200, 100), "image/png"));
    PreviewController
        .initialize(&session, &FixedViewport { max_edge: 640.0 })
        .expect("preview init should succeed");
    session
}

#[tokio::test]
async fn action_without_session_performs_no_io() {
    let h = harness();

    for action in [
        Action::Upload,
        Action::Download,
        Action::RawDownload,
        Action::ClipboardCopy,
    ] {
        let result = h.dispatcher.dispatch(None, action).await;
        assert!(matches!(result, Err(AppError::Precondition)));
    }

    assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 0);
    assert!(h.sink.saved.lock().expect("lock").is_empty());
    assert!(h.clipboard.written.lock().expect("lock").is_empty());
    assert!(h
        .notifier
        .toasts()
        .iter()
        .any(|(kind, msg)| *kind == ToastKind::Danger && msg == "No image found"));
}

#[tokio::test(start_paused = true)]
async fn second_upload_trigger_is_dropped_while_busy() {
    let h = harness_with_uploader(RecordingUploader {
        calls: Arc::default(),
        delay: Some(Duration::from_millis(50)),
    });
    let mut sessions = SessionState::new();
    let session = ingest_png(&mut sessions);

    let (first, second) = tokio::join!(
        h.dispatcher.dispatch(Some(&session), Action::Upload),
        h.dispatcher.dispatch(Some(&session), Action::Upload),
    );

    let outcomes = [
        first.expect("first trigger should not error"),
        second.expect("second trigger should not error"),
    ];
    assert!(outcomes.contains(&ActionOutcome::Completed));
    assert!(outcomes.contains(&ActionOutcome::DroppedBusy));
    assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.notifier.urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_upload_result_is_not_published_to_new_session() {
    let h = harness_with_uploader(RecordingUploader {
        calls: Arc::default(),
        delay: Some(Duration::from_millis(100)),
    });
    let mut sessions = SessionState::new();
    let first = ingest_png(&mut sessions);

    let upload = h.dispatcher.dispatch(Some(&first), Action::Upload);
    let supersede = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        sessions.ingest(ImageBlob::new(create_png_bytes(64, 64), "image/png"));
    };

    let (result, _) = tokio::join!(upload, supersede);

    // 过期上传照常跑完，但 URL 不得发布
    assert!(matches!(result, Ok(ActionOutcome::Completed)));
    assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 1);
    assert!(h.notifier.urls().is_empty());
    assert!(!h
        .notifier
        .toasts()
        .iter()
        .any(|(_, msg)| msg == "Uploaded Image!"));
}

#[tokio::test]
async fn upload_success_publishes_url_once() {
    let h = harness();
    let mut sessions = SessionState::new();
    let session = ingest_png(&mut sessions);

    let result = h.dispatcher.dispatch(Some(&session), Action::Upload).await;

    assert!(matches!(result, Ok(ActionOutcome::Completed)));
    let urls = h.notifier.urls();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("https://cdn.example.com/image-"));
    assert!(urls[0].ends_with(".png"));
    assert!(!session.is_busy());
}

#[tokio::test]
async fn failed_upload_reports_error_and_clears_busy() {
    let tempdir = tempfile::tempdir().expect("tempdir should be created");
    let settings = Arc::new(
        SettingsStore::open(tempdir.path().join("settings.json")).expect("store should open"),
    );
    let notifier = RecordingNotifier::default();
    let dispatcher = ActionDispatcher::new(
        TransformPipeline::new(PipelineConfig::default()),
        FailingUploader::default(),
        RecordingSink::default(),
        RecordingClipboard::default(),
        notifier.clone(),
        settings,
    );

    let mut sessions = SessionState::new();
    let session = ingest_png(&mut sessions);

    let result = dispatcher.dispatch(Some(&session), Action::Upload).await;

    assert!(matches!(result, Err(AppError::Network(_))));
    assert!(notifier.urls().is_empty());
    assert!(notifier
        .toasts()
        .iter()
        .any(|(kind, _)| *kind == ToastKind::Danger));
    // 失败路径同样必须复位忙碌标志
    assert!(!session.is_busy());
}

#[tokio::test(start_paused = true)]
async fn stale_upload_failure_does_not_toast_new_session() {
    let tempdir = tempfile::tempdir().expect("tempdir should be created");
    let settings = Arc::new(
        SettingsStore::open(tempdir.path().join("settings.json")).expect("store should open"),
    );
    let notifier = RecordingNotifier::default();
    let dispatcher = ActionDispatcher::new(
        TransformPipeline::new(PipelineConfig::default()),
        FailingUploader {
            delay: Some(Duration::from_millis(100)),
        },
        RecordingSink::default(),
        RecordingClipboard::default(),
        notifier.clone(),
        settings,
    );

    let mut sessions = SessionState::new();
    let first = ingest_png(&mut sessions);

    let upload = dispatcher.dispatch(Some(&first), Action::Upload);
    let supersede = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        sessions.ingest(ImageBlob::new(create_png_bytes(64, 64), "image/png"));
    };

    let (result, _) = tokio::join!(upload, supersede);

    // 过期上传的失败照常返回错误，但不得向新会话弹出错误提示
    assert!(matches!(result, Err(AppError::Network(_))));
    assert!(!notifier
        .toasts()
        .iter()
        .any(|(kind, _)| *kind == ToastKind::Danger));
}

#[tokio::test]
async fn undecodable_blob_fails_without_sink_calls() {
    let h = harness();
    let mut sessions = SessionState::new();
    let session = sessions.ingest(ImageBlob::new(vec![0u8; 16], "image/png"));

    let result = h.dispatcher.dispatch(Some(&session), Action::Download).await;

    assert!(matches!(result, Err(AppError::Transform(_))));
    assert!(h.sink.saved.lock().expect("lock").is_empty());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn raw_download_saves_original_verbatim() {
    let h = harness();
    h.settings
        .set_download_type(OutputFormat::Jpeg)
        .expect("set should persist");

    let original = create_png_bytes(120, 80);
    let mut sessions = SessionState::new();
    let session = sessions.ingest(ImageBlob::new(original.clone(), "image/png"));

    let result = h
        .dispatcher
        .dispatch(Some(&session), Action::RawDownload)
        .await;

    assert!(matches!(result, Ok(ActionOutcome::Completed)));
    let saved = h.sink.saved.lock().expect("lock");
    assert_eq!(saved.len(), 1);
    // 原样下载完全跳过变换：字节与 MIME 均与摄入时一致
    assert_eq!(saved[0].bytes(), original.as_slice());
    assert_eq!(saved[0].mime(), "image/png");
}

#[tokio::test]
async fn download_applies_current_settings() {
    let h = harness();
    h.settings
        .set_download_type(OutputFormat::Jpeg)
        .expect("set should persist");

    let mut sessions = SessionState::new();
    let session = ingest_png(&mut sessions);
    PreviewController.set_scale(&session, 0.5);

    let result = h.dispatcher.dispatch(Some(&session), Action::Download).await;

    assert!(matches!(result, Ok(ActionOutcome::Completed)));
    let saved = h.sink.saved.lock().expect("lock");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].mime(), "image/jpeg");
    let decoded = image::load_from_memory(saved[0].bytes()).expect("output should decode");
    assert_eq!(decoded.width(), 100);
}

#[tokio::test]
async fn clipboard_copy_always_writes_png() {
    let h = harness();
    h.settings
        .set_download_type(OutputFormat::Jpeg)
        .expect("set should persist");

    let mut sessions = SessionState::new();
    let session = ingest_png(&mut sessions);

    let result = h
        .dispatcher
        .dispatch(Some(&session), Action::ClipboardCopy)
        .await;

    assert!(matches!(result, Ok(ActionOutcome::Completed)));
    let written = h.clipboard.written.lock().expect("lock");
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].mime(), "image/png");
    assert_eq!(
        image::guess_format(written[0].bytes()).expect("format should be known"),
        ImageFormat::Png
    );
}

#[tokio::test]
async fn super_compress_targets_display_box() {
    let h = harness();
    h.settings
        .set_should_super_compress(true)
        .expect("set should persist");

    let mut sessions = SessionState::new();
    // 自然 2000x1000，视口 640 → 显示盒 640x320
    let session = sessions.ingest(ImageBlob::new(create_png_bytes(2000, 1000), "image/png"));
    PreviewController
        .initialize(&session, &FixedViewport { max_edge: 640.0 })
        .expect("preview init should succeed");

    let result = h.dispatcher.dispatch(Some(&session), Action::Download).await;

    assert!(matches!(result, Ok(ActionOutcome::Completed)));
    let saved = h.sink.saved.lock().expect("lock");
    let decoded = image::load_from_memory(saved[0].bytes()).expect("output should decode");
    assert_eq!((decoded.width(), decoded.height()), (640, 320));
}
