use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;

use stampdb_codec::{read_document, write_document, DocumentStats, FromValue, Value};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::file::FileStampProvider;
use crate::provider::StampProvider;

/// Where the store is in its load cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoadPhase {
    /// A load was requested and its worker has not taken the lock yet.
    Pending,
    /// The load body is running.
    Loading,
    /// No load in flight; accessors may proceed.
    Loaded,
}

/// Everything behind the store's single lock.
struct State<S> {
    phase: LoadPhase,
    entries: HashMap<String, Value>,
    /// Stamp observed at the start of the last load, or right after the last
    /// successful save.
    last_stamp: Option<S>,
}

struct Shared<P: StampProvider> {
    provider: P,
    config: StoreConfig,
    state: Mutex<State<P::Stamp>>,
    /// Signalled when a load finishes.
    ready: Condvar,
    /// Lock-free mirror of `phase == Loaded`, for observation only.
    loaded: AtomicBool,
}

/// A typed key-value store persisted as one document through a
/// [`StampProvider`].
///
/// Construction starts a background load and returns immediately. Every
/// accessor waits for an in-flight load before touching the mapping, so no
/// caller ever sees a half-merged document. Mutations stay in memory until
/// [`commit`](Self::commit) or [`apply`](Self::apply).
///
/// `Store` is a cheap handle: clones share the same mapping and provider.
pub struct Store<P: StampProvider> {
    shared: Arc<Shared<P>>,
}

impl<P: StampProvider> Clone for Store<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Store<FileStampProvider> {
    /// Open a store backed by the file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(FileStampProvider::new(path))
    }
}

impl<P: StampProvider> Store<P> {
    /// Create a store over `provider` and start loading it.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, HashMap::new(), StoreConfig::default())
    }

    /// Create a store whose mapping starts as `entries`. The first load
    /// merges the backend's document on top.
    pub fn with_entries(provider: P, entries: HashMap<String, Value>) -> Self {
        Self::with_config(provider, entries, StoreConfig::default())
    }

    /// Create a store with initial `entries` and explicit settings.
    pub fn with_config(provider: P, entries: HashMap<String, Value>, config: StoreConfig) -> Self {
        let store = Self::unstarted(provider, entries, config);
        store.spawn_load();
        store
    }

    /// A store in the `Pending` phase whose load has not been spawned.
    fn unstarted(provider: P, entries: HashMap<String, Value>, config: StoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                config,
                state: Mutex::new(State {
                    phase: LoadPhase::Pending,
                    entries,
                    last_stamp: None,
                }),
                ready: Condvar::new(),
                loaded: AtomicBool::new(false),
            }),
        }
    }

    pub fn provider(&self) -> &P {
        &self.shared.provider
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    // -----------------------------------------------------------------------
    // Load cycle
    // -----------------------------------------------------------------------

    /// Reload if the backend changed since the last load or save.
    ///
    /// Returns `true` if a background reload was started. Returns `false`
    /// when the stamp is unchanged, or when a load is queued but has not
    /// started (that load will observe the latest stamp itself).
    ///
    /// A load that is already running holds the lock, so this call waits
    /// for it to finish and then compares against the stamp it recorded.
    /// The reload this call starts is not waited for.
    pub fn reload(&self) -> bool {
        let state = self.lock();
        if state.phase != LoadPhase::Loaded {
            debug!("load already queued; reload ignored");
            return false;
        }
        let current = self.shared.provider.current_stamp();
        if state.last_stamp.as_ref() == Some(&current) {
            return false;
        }
        debug!(?current, last = ?state.last_stamp, "backend changed; reloading");
        self.schedule_load(state);
        true
    }

    /// Start a reload regardless of the stamp.
    ///
    /// Returns `false` if a load is already queued.
    pub fn force_reload(&self) -> bool {
        let state = self.lock();
        if state.phase != LoadPhase::Loaded {
            return false;
        }
        self.schedule_load(state);
        true
    }

    /// Returns `true` if no load is queued or running. Never blocks.
    pub fn is_loaded(&self) -> bool {
        self.shared.loaded.load(Ordering::Acquire)
    }

    /// Block until any in-flight load has finished.
    pub fn wait_loaded(&self) {
        drop(self.loaded_state());
    }

    /// Stamp recorded by the last completed load or save.
    pub fn last_stamp(&self) -> Option<P::Stamp> {
        self.loaded_state().last_stamp.clone()
    }

    fn schedule_load(&self, mut state: MutexGuard<'_, State<P::Stamp>>) {
        state.phase = LoadPhase::Pending;
        self.shared.loaded.store(false, Ordering::Release);
        drop(state);
        self.spawn_load();
    }

    fn spawn_load(&self) {
        let worker = self.clone();
        let spawned = thread::Builder::new()
            .name(self.shared.config.load_thread_name())
            .spawn(move || worker.load());
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn load worker; loading inline");
            self.load();
        }
    }

    /// Load body. Holds the lock from start to finish.
    fn load(&self) {
        let mut state = self.lock();
        if state.phase == LoadPhase::Loaded {
            return;
        }
        state.phase = LoadPhase::Loading;

        // Taken before reading: if the backend changes mid-read, the next
        // reload() still sees a stamp mismatch.
        state.last_stamp = Some(self.shared.provider.current_stamp());

        match self.read_into(&mut state.entries) {
            Ok(stats) => self.report_loaded(&stats, state.entries.len()),
            Err(e) if e.is_not_found() => debug!("no document yet; starting empty"),
            Err(e) => warn!(error = %e, entries = state.entries.len(), "failed to load document"),
        }

        state.phase = LoadPhase::Loaded;
        self.shared.loaded.store(true, Ordering::Release);
        drop(state);
        self.shared.ready.notify_all();
    }

    /// Merge the backend's document into `entries`. Keys absent from the
    /// document are left alone.
    fn read_into(&self, entries: &mut HashMap<String, Value>) -> StoreResult<DocumentStats> {
        let mut input = self.shared.provider.open_input()?;
        let stats = read_document(&mut input, |key, value| {
            entries.insert(key, value);
        })?;
        Ok(stats)
    }

    fn report_loaded(&self, stats: &DocumentStats, total: usize) {
        if stats.skipped > 0 && self.shared.config.warn_on_skipped {
            warn!(
                decoded = stats.decoded,
                skipped = stats.skipped,
                "dropped entries with unrecognized value tags"
            );
        }
        debug!(
            decoded = stats.decoded,
            skipped = stats.skipped,
            total,
            "document loaded"
        );
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<Value> {
        self.loaded_state().entries.get(key).cloned()
    }

    /// Typed get: `default` if `key` is absent or holds another kind.
    pub fn get_or<V: FromValue>(&self, key: &str, default: V) -> V {
        self.loaded_state()
            .entries
            .get(key)
            .and_then(V::from_value)
            .unwrap_or(default)
    }

    /// Typed get that stores `default` when `key` is absent or holds another
    /// kind. Check and insert happen under one lock acquisition.
    pub fn get_or_put<V>(&self, key: &str, default: V) -> V
    where
        V: FromValue + Into<Value> + Clone,
    {
        let mut state = self.loaded_state();
        if let Some(existing) = state.entries.get(key).and_then(V::from_value) {
            return existing;
        }
        state.entries.insert(key.to_owned(), default.clone().into());
        default
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.loaded_state().entries.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.loaded_state().entries.remove(key)
    }

    pub fn clear(&self) {
        self.loaded_state().entries.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.loaded_state().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.loaded_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded_state().entries.is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.loaded_state().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// A copy of the whole mapping.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.loaded_state().entries.clone()
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Write the whole mapping to the backend, blocking until done.
    ///
    /// On success the recorded stamp is refreshed from the provider after the
    /// write, so an outside write racing this one is still seen as a change.
    /// On failure the stamp is left alone and the in-memory mapping is kept
    /// as is.
    pub fn try_commit(&self) -> StoreResult<()> {
        let mut state = self.loaded_state();
        let provider = &self.shared.provider;

        let mut output = provider.open_output()?;
        write_document(&mut output, &state.entries)?;
        provider.finish_output(output)?;

        state.last_stamp = Some(provider.current_stamp());
        debug!(entries = state.entries.len(), "document committed");
        Ok(())
    }

    /// [`try_commit`](Self::try_commit), reporting success as a bool.
    pub fn commit(&self) -> bool {
        match self.try_commit() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to commit document");
                false
            }
        }
    }

    /// Commit on a background thread without waiting. The outcome is only
    /// logged.
    pub fn apply(&self) {
        let worker = self.clone();
        let spawned = thread::Builder::new()
            .name(self.shared.config.save_thread_name())
            .spawn(move || {
                worker.commit();
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn save worker; saving inline");
            self.commit();
        }
    }

    /// [`try_commit`](Self::try_commit) on tokio's blocking pool.
    pub async fn try_commit_async(&self) -> StoreResult<()> {
        let worker = self.clone();
        tokio::task::spawn_blocking(move || worker.try_commit())
            .await
            .map_err(|_| StoreError::WorkerPanicked)?
    }

    /// [`commit`](Self::commit) on tokio's blocking pool.
    pub async fn commit_async(&self) -> bool {
        match self.try_commit_async().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to commit document");
                false
            }
        }
    }

    /// [`wait_loaded`](Self::wait_loaded) without blocking the async runtime.
    pub async fn loaded_async(&self) {
        if self.is_loaded() {
            return;
        }
        let worker = self.clone();
        if tokio::task::spawn_blocking(move || worker.wait_loaded())
            .await
            .is_err()
        {
            warn!("load wait task panicked");
        }
    }

    // -----------------------------------------------------------------------
    // Locking
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, State<P::Stamp>> {
        self.shared.state.lock().expect("store lock poisoned")
    }

    /// Take the lock, then wait until no load is queued or running.
    fn loaded_state(&self) -> MutexGuard<'_, State<P::Stamp>> {
        let guard = self.lock();
        self.shared
            .ready
            .wait_while(guard, |s| s.phase != LoadPhase::Loaded)
            .expect("store lock poisoned")
    }
}

impl<P: StampProvider + std::fmt::Debug> std::fmt::Debug for Store<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Store");
        s.field("provider", &self.shared.provider)
            .field("loaded", &self.is_loaded());
        // A running load holds the lock for its whole body; don't wait on it.
        match self.shared.state.try_lock() {
            Ok(state) => s.field("entry_count", &state.entries.len()),
            Err(_) => s.field("entry_count", &"<locked>"),
        };
        s.finish()
    }
}
