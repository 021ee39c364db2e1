use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mask::MaskImage;

/// Extensions accepted for user-supplied masks.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Read,
    Decode,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Read => f.write_str("read"),
            LoadStage::Decode => f.write_str("decode"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MaskLoadError {
    #[error("{path}: unsupported file type (expected png, jpg, bmp or gif)")]
    InvalidFileType { path: PathBuf },
    #[error("{path}: {size} bytes exceeds the {limit} byte upload limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("mask {stage} timed out after {timeout:?}")]
    DecodeTimeout { stage: LoadStage, timeout: Duration },
    #[error("failed to decode mask: {0}")]
    DecodeFailure(String),
    #[error("{0} is not available")]
    MissingTarget(String),
    #[error("failed to read {path}: {source}")]
    ResourceLoadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Limits applied to every mask request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    pub read_timeout: Duration,
    pub decode_timeout: Duration,
    /// How long the loading indicator may stay up before it is forced off.
    pub failsafe: Duration,
    pub max_upload_bytes: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            decode_timeout: Duration::from_secs(5),
            failsafe: Duration::from_secs(10),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Where a mask request reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskSource {
    /// A file the user dropped or passed on the command line.
    Upload(PathBuf),
    /// Entry `index` (1-based) of the bundled catalogue.
    Bundled { index: usize, path: PathBuf },
}

impl MaskSource {
    pub fn path(&self) -> &Path {
        match self {
            MaskSource::Upload(path) => path,
            MaskSource::Bundled { path, .. } => path,
        }
    }

    /// Short label for window titles and logs.
    pub fn label(&self) -> String {
        match self {
            MaskSource::Upload(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            MaskSource::Bundled { index, .. } => format!("mask-{index}"),
        }
    }
}

pub type DecodeFn = Arc<dyn Fn(&[u8]) -> Result<MaskImage, MaskLoadError> + Send + Sync>;

fn default_decoder() -> DecodeFn {
    Arc::new(|bytes: &[u8]| {
        MaskImage::decode(bytes).map_err(|err| MaskLoadError::DecodeFailure(err.to_string()))
    })
}

/// Checks type and size of a user file before any loading starts.
pub fn validate_upload(path: &Path, max_bytes: u64) -> Result<u64, MaskLoadError> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false);
    if !supported {
        return Err(MaskLoadError::InvalidFileType {
            path: path.to_path_buf(),
        });
    }

    let size = fs::metadata(path)
        .map_err(|source| MaskLoadError::ResourceLoadFailure {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size > max_bytes {
        return Err(MaskLoadError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_bytes,
        });
    }
    Ok(size)
}

/// Runs `job` on its own thread and gives up after `timeout`.
///
/// A job that overruns keeps its thread until it finishes; the result is
/// dropped with the channel.
fn run_stage<T, F>(stage: LoadStage, timeout: Duration, job: F) -> Result<T, MaskLoadError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MaskLoadError> + Send + 'static,
{
    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name(format!("neuelava-mask-{stage}"))
        .spawn(move || {
            let _ = tx.send(job());
        })
        .map_err(|err| MaskLoadError::DecodeFailure(format!("failed to spawn {stage} worker: {err}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(MaskLoadError::DecodeTimeout { stage, timeout }),
        Err(RecvTimeoutError::Disconnected) => Err(MaskLoadError::DecodeFailure(format!(
            "{stage} worker exited without a result"
        ))),
    }
}

fn load_staged(
    path: PathBuf,
    settings: LoaderSettings,
    decoder: DecodeFn,
) -> Result<MaskImage, MaskLoadError> {
    let bytes = run_stage(LoadStage::Read, settings.read_timeout, move || {
        fs::read(&path).map_err(|source| MaskLoadError::ResourceLoadFailure { path, source })
    })?;
    run_stage(LoadStage::Decode, settings.decode_timeout, move || {
        decoder(&bytes)
    })
}

#[derive(Debug)]
pub enum LoaderEvent {
    Loaded {
        id: u64,
        source: MaskSource,
        mask: Arc<MaskImage>,
    },
    Failed {
        id: u64,
        source: MaskSource,
        error: MaskLoadError,
    },
    /// The loading indicator outlived the failsafe and was cleared.
    FailsafeExpired { id: u64, source: MaskSource },
}

struct LoadResult {
    id: u64,
    source: MaskSource,
    outcome: Result<MaskImage, MaskLoadError>,
}

struct PendingLoad {
    id: u64,
    source: MaskSource,
    started: Instant,
}

/// Decodes masks off the render thread.
///
/// Every request gets a fresh id and only the newest id may be applied;
/// results for older requests are dropped when they arrive.
pub struct MaskLoader {
    settings: LoaderSettings,
    decoder: DecodeFn,
    notify: Option<Arc<dyn Fn() + Send + Sync>>,
    next_id: u64,
    latest: Option<u64>,
    pending: Option<PendingLoad>,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl MaskLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        let (tx, rx) = unbounded();
        Self {
            settings,
            decoder: default_decoder(),
            notify: None,
            next_id: 1,
            latest: None,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn with_decoder(mut self, decoder: DecodeFn) -> Self {
        self.decoder = decoder;
        self
    }

    /// Called from the worker thread after each result is queued.
    pub fn with_notifier(mut self, notify: impl Fn() + Send + Sync + 'static) -> Self {
        self.notify = Some(Arc::new(notify));
        self
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_source(&self) -> Option<&MaskSource> {
        self.pending.as_ref().map(|pending| &pending.source)
    }

    /// Starts loading `source` in the background and returns its request id.
    ///
    /// Uploads are validated first; a rejected upload returns the error and
    /// leaves the loader exactly as it was.
    pub fn request(&mut self, source: MaskSource) -> Result<u64, MaskLoadError> {
        if let MaskSource::Upload(path) = &source {
            validate_upload(path, self.settings.max_upload_bytes)?;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.latest = Some(id);
        self.pending = Some(PendingLoad {
            id,
            source: source.clone(),
            started: Instant::now(),
        });
        debug!(id, source = %source.label(), "mask request queued");

        let tx = self.tx.clone();
        let settings = self.settings;
        let decoder = self.decoder.clone();
        let notify = self.notify.clone();
        let path = source.path().to_path_buf();
        thread::Builder::new()
            .name(format!("neuelava-mask-{id}"))
            .spawn(move || {
                let outcome = load_staged(path, settings, decoder);
                let _ = tx.send(LoadResult {
                    id,
                    source,
                    outcome,
                });
                if let Some(notify) = notify {
                    notify();
                }
            })
            .map_err(|err| {
                self.pending = None;
                MaskLoadError::DecodeFailure(format!("failed to spawn mask worker: {err}"))
            })?;
        Ok(id)
    }

    /// Loads `source` on the calling thread with the same checks and deadlines.
    pub fn load_blocking(&self, source: &MaskSource) -> Result<MaskImage, MaskLoadError> {
        if let MaskSource::Upload(path) = source {
            validate_upload(path, self.settings.max_upload_bytes)?;
        }
        load_staged(
            source.path().to_path_buf(),
            self.settings,
            self.decoder.clone(),
        )
    }

    /// Collects finished results and expires an overdue loading indicator.
    pub fn poll(&mut self, now: Instant) -> Vec<LoaderEvent> {
        let mut events = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            if let Some(event) = self.accept(result) {
                events.push(event);
            }
        }

        let expired = self
            .pending
            .as_ref()
            .is_some_and(|pending| now.saturating_duration_since(pending.started) >= self.settings.failsafe);
        if expired {
            if let Some(pending) = self.pending.take() {
                warn!(
                    id = pending.id,
                    source = %pending.source.label(),
                    failsafe = ?self.settings.failsafe,
                    "mask still loading after failsafe; clearing indicator"
                );
                events.push(LoaderEvent::FailsafeExpired {
                    id: pending.id,
                    source: pending.source,
                });
            }
        }
        events
    }

    /// Blocks until the newest request resolves or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoaderEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let result = self.rx.recv_timeout(remaining).ok()?;
            if let Some(event) = self.accept(result) {
                return Some(event);
            }
        }
    }

    fn accept(&mut self, result: LoadResult) -> Option<LoaderEvent> {
        if self.latest != Some(result.id) {
            debug!(
                id = result.id,
                latest = ?self.latest,
                source = %result.source.label(),
                "discarding stale mask result"
            );
            return None;
        }
        if self.pending.as_ref().is_some_and(|pending| pending.id == result.id) {
            self.pending = None;
        }

        let LoadResult { id, source, outcome } = result;
        match outcome {
            Ok(mask) => {
                info!(
                    id,
                    source = %source.label(),
                    width = mask.width(),
                    height = mask.height(),
                    aspect = mask.aspect(),
                    "mask loaded"
                );
                Some(LoaderEvent::Loaded {
                    id,
                    source,
                    mask: Arc::new(mask),
                })
            }
            Err(error) => {
                warn!(id, source = %source.label(), %error, "mask load failed");
                Some(LoaderEvent::Failed { id, source, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).expect("write fixture");
        path
    }

    fn png_bytes() -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(4, 2, image::Rgba([200, 0, 0, 255]))
            .write_to(&mut cursor, image::ImageFormat::Png)
            .expect("encode png");
        cursor.into_inner()
    }

    /// Sleeps whenever the file starts with `s`.
    fn sleepy_decoder(delay: Duration) -> DecodeFn {
        Arc::new(move |bytes: &[u8]| {
            if bytes.first() == Some(&b's') {
                thread::sleep(delay);
            }
            Ok(MaskImage::from_fn(2, 1, |_| 1.0))
        })
    }

    #[test]
    fn rejects_unsupported_extension_before_loading() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "notes.txt", b"hello");
        let mut loader = MaskLoader::new(LoaderSettings::default());
        let err = loader.request(MaskSource::Upload(path)).unwrap_err();
        assert!(matches!(err, MaskLoadError::InvalidFileType { .. }));
        assert!(!loader.is_loading());
    }

    #[test]
    fn rejects_oversized_upload() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "big.png", &[0u8; 64]);
        let settings = LoaderSettings {
            max_upload_bytes: 32,
            ..LoaderSettings::default()
        };
        let mut loader = MaskLoader::new(settings);
        let err = loader.request(MaskSource::Upload(path)).unwrap_err();
        assert!(matches!(err, MaskLoadError::FileTooLarge { size: 64, limit: 32, .. }));
        assert!(!loader.is_loading());
    }

    #[test]
    fn extension_check_ignores_case() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "MASK.PNG", &png_bytes());
        assert!(validate_upload(&path, 1024 * 1024).is_ok());
    }

    #[test]
    fn loads_png_in_background() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "mask.png", &png_bytes());
        let mut loader = MaskLoader::new(LoaderSettings::default());
        let id = loader.request(MaskSource::Upload(path)).unwrap();
        assert!(loader.is_loading());
        match loader.wait(Duration::from_secs(5)) {
            Some(LoaderEvent::Loaded { id: loaded, mask, .. }) => {
                assert_eq!(loaded, id);
                assert_eq!(mask.aspect(), 2.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!loader.is_loading());
    }

    #[test]
    fn stale_results_are_discarded() {
        let dir = TempDir::new().unwrap();
        let slow = write(&dir, "slow.png", b"slow");
        let fast = write(&dir, "fast.png", b"fast");
        let mut loader = MaskLoader::new(LoaderSettings::default())
            .with_decoder(sleepy_decoder(Duration::from_millis(200)));

        let first = loader.request(MaskSource::Upload(slow)).unwrap();
        let second = loader.request(MaskSource::Upload(fast)).unwrap();
        assert!(second > first);

        match loader.wait(Duration::from_secs(5)) {
            Some(LoaderEvent::Loaded { id, .. }) => assert_eq!(id, second),
            other => panic!("unexpected event {other:?}"),
        }
        // the slow result arrives later and must not surface
        assert!(loader.wait(Duration::from_millis(600)).is_none());
    }

    #[test]
    fn slow_decode_times_out() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "slow.png", b"slow");
        let settings = LoaderSettings {
            decode_timeout: Duration::from_millis(50),
            ..LoaderSettings::default()
        };
        let loader =
            MaskLoader::new(settings).with_decoder(sleepy_decoder(Duration::from_millis(500)));
        let err = loader
            .load_blocking(&MaskSource::Upload(path))
            .unwrap_err();
        assert!(matches!(
            err,
            MaskLoadError::DecodeTimeout {
                stage: LoadStage::Decode,
                ..
            }
        ));
    }

    #[test]
    fn missing_bundled_mask_is_a_resource_failure() {
        let dir = TempDir::new().unwrap();
        let loader = MaskLoader::new(LoaderSettings::default());
        let source = MaskSource::Bundled {
            index: 3,
            path: dir.path().join("mask-3.png"),
        };
        let err = loader.load_blocking(&source).unwrap_err();
        assert!(matches!(err, MaskLoadError::ResourceLoadFailure { .. }));
    }

    #[test]
    fn corrupt_file_fails_to_decode() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.png", b"not a png");
        let mut loader = MaskLoader::new(LoaderSettings::default());
        loader.request(MaskSource::Upload(path)).unwrap();
        match loader.wait(Duration::from_secs(5)) {
            Some(LoaderEvent::Failed { error, .. }) => {
                assert!(matches!(error, MaskLoadError::DecodeFailure(_)))
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn failsafe_clears_indicator_but_late_result_still_applies() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "slow.png", b"slow");
        let settings = LoaderSettings {
            failsafe: Duration::from_millis(20),
            ..LoaderSettings::default()
        };
        let mut loader =
            MaskLoader::new(settings).with_decoder(sleepy_decoder(Duration::from_millis(150)));
        let id = loader.request(MaskSource::Upload(path)).unwrap();

        let events = loader.poll(Instant::now() + Duration::from_millis(25));
        assert!(matches!(
            events.as_slice(),
            [LoaderEvent::FailsafeExpired { id: expired, .. }] if *expired == id
        ));
        assert!(!loader.is_loading());

        match loader.wait(Duration::from_secs(5)) {
            Some(LoaderEvent::Loaded { id: loaded, .. }) => assert_eq!(loaded, id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn bundled_label_uses_catalogue_index() {
        let source = MaskSource::Bundled {
            index: 4,
            path: PathBuf::from("masks/mask-4.png"),
        };
        assert_eq!(source.label(), "mask-4");
        assert_eq!(
            MaskSource::Upload(PathBuf::from("/tmp/logo.png")).label(),
            "logo.png"
        );
    }
}
