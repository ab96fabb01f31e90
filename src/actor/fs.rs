//! File watcher actor.
//!
//! Watches the source file for changes, re-renders into the cache, then
//! pings the WebSocket actor so viewers re-fetch.
//!
//! ```text
//! notify → Debouncer → read + render → RenderCache → WsMsg::Changed
//! ```
//!
//! Bursts of events (editors often fire several per save) coalesce into
//! a single re-render pass; the render always reads the file's latest
//! content, so nothing is lost by collapsing the burst.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::messages::WsMsg;
use crate::cache::RenderCache;
use crate::config::ServeConfig;
use crate::{debug, log, logger};

/// Debounce configuration
const DEBOUNCE_MS: u64 = 150;
const RENDER_COOLDOWN_MS: u64 = 400;

/// FileSystem Actor - watches the source file for changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    /// Channel to the WebSocket actor
    ws_tx: mpsc::Sender<WsMsg>,
    /// Shared render cache
    cache: Arc<RenderCache>,
    /// Serve configuration (watched path)
    config: Arc<ServeConfig>,
    /// Debouncer state
    debouncer: Debouncer,
}

impl FsActor {
    /// Create a new FsActor.
    ///
    /// The watch is installed on the file's parent directory and events
    /// are filtered down to the target; a watch on the file itself goes
    /// silent once an editor saves by renaming over a new inode.
    pub fn new(
        config: Arc<ServeConfig>,
        cache: Arc<RenderCache>,
        ws_tx: mpsc::Sender<WsMsg>,
    ) -> notify::Result<Self> {
        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(&config.watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            notify_rx,
            _watcher: watcher,
            ws_tx,
            cache,
            config,
            debouncer: Debouncer::new(),
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            _watcher,
            ws_tx,
            cache,
            config,
            mut debouncer,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => {
                    if is_relevant(&event, &config.file) {
                        debug!("watch"; "{:?} {:?}", event.kind, event.paths);
                        debouncer.add_event();
                    }
                }
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if debouncer.take_if_ready() && !flush(&config, &cache, &ws_tx).await {
                        break;
                    }
                }
            }
        }
    }
}

/// Re-render after a debounced burst and publish the change event.
///
/// Returns `false` once the WsActor is gone (shutdown in progress).
async fn flush(config: &ServeConfig, cache: &RenderCache, ws_tx: &mpsc::Sender<WsMsg>) -> bool {
    match refresh_cache(&config.file, cache) {
        Ok(()) => {
            logger::status_success(&format!("re-rendered {}", config.display_name));
            ws_tx.send(WsMsg::Changed).await.is_ok()
        }
        Err(e) => {
            // Previous render stays authoritative; the next change retries.
            logger::status_error(
                &format!("cannot read {}", config.file.display()),
                &e.to_string(),
            );
            true
        }
    }
}

/// Read the watched file and replace the cached render.
///
/// On read failure the cache is left untouched.
fn refresh_cache(path: &Path, cache: &RenderCache) -> std::io::Result<()> {
    let text = std::fs::read_to_string(path)?;
    cache.update(&text);
    Ok(())
}

/// Only events touching the watched file matter; the directory watch
/// also reports siblings and editor temp files.
fn is_relevant(event: &notify::Event, file: &Path) -> bool {
    use notify::EventKind;
    use notify::event::ModifyKind;

    match &event.kind {
        EventKind::Access(_) => return false,
        // mtime/atime/chmod noise; content changes arrive as
        // Modify(Data) or as rename/create events
        EventKind::Modify(ModifyKind::Metadata(_)) => return false,
        _ => {}
    }

    let name = file.file_name();
    event
        .paths
        .iter()
        .any(|p| p == file || (name.is_some() && p.file_name() == name))
}

// =============================================================================
// Debouncer - timing and burst coalescing
// =============================================================================

/// Collapses a burst of filesystem events into a single re-render.
///
/// Pure timing: the caller reads the file when a flush becomes due, so
/// the collapsed burst always resolves to the latest on-disk content.
struct Debouncer {
    dirty: bool,
    last_event: Option<Instant>,
    last_render: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            dirty: false,
            last_event: None,
            last_render: None,
        }
    }

    /// Record that the watched file changed.
    fn add_event(&mut self) {
        self.dirty = true;
        self.last_event = Some(Instant::now());
    }

    /// Consume the pending change if the quiet period has elapsed.
    fn take_if_ready(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.dirty = false;
        self.last_event = None;
        self.last_render = Some(Instant::now());
        true
    }

    fn is_ready(&self) -> bool {
        if !self.dirty {
            return false;
        }
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }
        if let Some(last_render) = self.last_render
            && last_render.elapsed() < Duration::from_millis(RENDER_COOLDOWN_MS)
        {
            return false;
        }
        true
    }

    /// Precise sleep duration until the next possible flush.
    fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_render
            .map(|t| Duration::from_millis(RENDER_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

// =============================================================================
// Tests
// =============================================================================
