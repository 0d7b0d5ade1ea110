// High-level media device management and public API
//
// MediaDeviceManager ties the registry, the preference repository, the
// change emitter and the track registry to an injected hardware port. It
// owns the single in-flight enumeration, the reference-counted device change
// subscription and the acquisition flow. State lives behind short-held std
// mutexes; no lock is held across an `.await`.

use colored::*;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::constraints::StreamConstraints;
use super::devices::diagnostics::DeviceReport;
use super::devices::notifications::DeviceChangeSubscription;
use super::devices::registry::DeviceRegistry;
use super::devices::types::{Device, DeviceDiff, DeviceInfo, DeviceKind, DeviceSelection};
use super::error::{MediaDeviceError, Result};
use super::events::{ChangeEmitter, ChangeEvent, Field, FieldValue, ListenerId};
use super::hardware::{DeviceChangeListener, MediaDevices, MediaStream, MediaTrack};
use super::streams::{
    conflicting_tracks, negotiated_changes, resolve_request, NegotiatedChange, TrackRegistry,
};
use crate::config::DeviceManagerConfig;
use crate::db::{DevicePreferenceRepository, JsonFileStore, KeyValueStore};
use crate::utils::lock;

type SharedRefresh = Shared<BoxFuture<'static, Result<DeviceDiff>>>;

struct InFlightRefresh {
    generation: u64,
    future: SharedRefresh,
}

struct ManagerInner {
    config: DeviceManagerConfig,
    hardware: Arc<dyn MediaDevices>,
    repository: DevicePreferenceRepository,
    registry: Mutex<DeviceRegistry>,
    in_flight: Mutex<Option<InFlightRefresh>>,
    generation: AtomicU64,
    emitter: ChangeEmitter,
    tracks: TrackRegistry,
    notifications: DeviceChangeSubscription,
}

/// Hardware listener that schedules a refresh on the ambient runtime
struct RefreshOnDeviceChange {
    inner: Weak<ManagerInner>,
}

impl DeviceChangeListener for RefreshOnDeviceChange {
    fn on_device_change(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("⚠️ Device change reported outside a tokio runtime, skipping refresh");
                return;
            }
        };

        info!("🔄 {}: re-enumerating devices", "DEVICE_CHANGE".purple());
        let refresh = inner.start_refresh(true);
        handle.spawn(async move {
            if let Err(err) = refresh.await {
                warn!("⚠️ Background device refresh failed: {}", err);
            }
        });
    }
}

impl ManagerInner {
    /// Shared handle to the running enumeration, starting one if needed.
    ///
    /// `force` starts a new enumeration even when one is in flight; the new
    /// one takes over the in-flight slot.
    fn start_refresh(self: &Arc<Self>, force: bool) -> SharedRefresh {
        let mut slot = lock(&self.in_flight);
        if !force {
            if let Some(pending) = slot.as_ref() {
                crate::device_debug!("Joining in-flight enumeration #{}", pending.generation);
                return pending.future.clone();
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(self);
        let future = async move {
            let result = inner.run_enumeration().await;
            inner.finish_refresh(generation);
            result
        }
        .boxed()
        .shared();

        *slot = Some(InFlightRefresh {
            generation,
            future: future.clone(),
        });
        future
    }

    fn pending_refresh(&self) -> Option<SharedRefresh> {
        lock(&self.in_flight)
            .as_ref()
            .map(|pending| pending.future.clone())
    }

    fn finish_refresh(&self, generation: u64) {
        let mut slot = lock(&self.in_flight);
        if slot.as_ref().map(|pending| pending.generation) == Some(generation) {
            *slot = None;
        }
    }

    async fn run_enumeration(&self) -> Result<DeviceDiff> {
        if !self.hardware.is_supported() {
            return Err(MediaDeviceError::NotSupported);
        }

        let enumerated = match self.hardware.enumerate_devices().await {
            Ok(devices) => devices,
            Err(err) => {
                warn!("❌ {}: {}", "ENUMERATION_FAILED".red(), err);
                return Err(MediaDeviceError::EnumerationFailed(err));
            }
        };

        crate::device_debug!("Enumerated {} devices: {:?}", enumerated.len(), enumerated);
        Ok(self.apply_enumeration(&enumerated))
    }

    /// Run the diff engine, persist grown preference lists and notify
    fn apply_enumeration(&self, enumerated: &[DeviceInfo]) -> DeviceDiff {
        let (outcome, changed_lists) = {
            let mut registry = lock(&self.registry);
            let outcome = registry.apply_enumeration(enumerated);
            let lists: Vec<_> = outcome
                .changed_preferences
                .iter()
                .filter_map(|kind| {
                    registry
                        .preference_list(*kind)
                        .map(|list| (*kind, list.clone()))
                })
                .collect();
            (outcome, lists)
        };

        for (kind, list) in &changed_lists {
            if let Err(err) = self.repository.save_preferences(*kind, list) {
                warn!("⚠️ Failed to persist {} preferences: {}", kind, err);
            }
        }

        if outcome.devices_changed() {
            info!(
                "📋 Device list changed: +{} ~{} -{} ({} devices)",
                outcome.diff.added.len(),
                outcome.diff.updated.len(),
                outcome.diff.removed.len(),
                outcome.devices.len()
            );
            self.emitter.emit(ChangeEvent::Devices(outcome.devices.clone()));
        }

        for (kind, selection) in outcome.selection_changes {
            self.emitter.emit(ChangeEvent::Selection { kind, selection });
        }

        outcome.diff
    }

    fn selection(&self, kind: DeviceKind) -> DeviceSelection {
        lock(&self.registry).selection(kind).clone()
    }

    /// Adopt the device the platform actually opened, unless the selection
    /// moved away from the requested one while the request was in flight
    fn adopt_negotiated(&self, change: NegotiatedChange) {
        let NegotiatedChange {
            kind,
            requested,
            negotiated,
        } = change;

        let list = {
            let mut registry = lock(&self.registry);
            let expected = DeviceSelection::from_default(requested);
            if *registry.selection(kind) != expected {
                debug!(
                    "{} selection changed during acquisition ({:?} -> {:?}), keeping it over '{}'",
                    kind,
                    expected,
                    registry.selection(kind),
                    negotiated
                );
                return;
            }
            registry.set_selection(kind, DeviceSelection::pinned(negotiated.as_str()));
            registry.promote(kind, &negotiated);
            registry.preference_list(kind).cloned()
        };

        info!(
            "🎯 {}: {} negotiated '{}'",
            "SELECTION_RECONCILED".cyan(),
            kind,
            negotiated
        );

        if let Some(list) = list {
            if let Err(err) = self.repository.save_preferences(kind, &list) {
                warn!("⚠️ Failed to persist {} preferences: {}", kind, err);
            }
        }

        self.emitter.emit(ChangeEvent::Selection {
            kind,
            selection: DeviceSelection::Pinned(negotiated),
        });
    }

    /// Wait for a refresh for at most `enumeration_wait_ms`. A refresh that
    /// outlives the wait keeps running on the runtime.
    async fn settle_refresh(&self, refresh: SharedRefresh, context: &str) {
        let wait = Duration::from_millis(self.config.enumeration_wait_ms);
        match tokio::time::timeout(wait, refresh.clone()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => debug!("{} enumeration failed: {}", context, err),
            Err(_) => {
                warn!(
                    "⏱️ {} enumeration still running after {}ms, continuing without it",
                    context,
                    wait.as_millis()
                );
                tokio::spawn(async move {
                    let _ = refresh.await;
                });
            }
        }
    }
}

/// Capture device manager: enumeration, preferences, selection and streams
#[derive(Clone)]
pub struct MediaDeviceManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for MediaDeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDeviceManager")
            .field("devices", &lock(&self.inner.registry).devices().len())
            .field("tracks", &self.inner.tracks)
            .field("emitter", &self.inner.emitter)
            .finish()
    }
}

impl MediaDeviceManager {
    /// Create a manager with preferences and selections restored from `store`.
    ///
    /// No enumeration runs until `refresh`, `acquire` or a device change.
    pub fn new(
        config: DeviceManagerConfig,
        hardware: Arc<dyn MediaDevices>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let repository = DevicePreferenceRepository::new(
            store,
            config.storage_keys.clone(),
            config.disabled_sentinel.clone(),
        );
        let (preferences, audio_input, video_input) = repository.load_state();
        info!(
            "🎛️ Restored device state: audioInputId={} videoInputId={}",
            audio_input, video_input
        );
        let registry = DeviceRegistry::restore(preferences, audio_input, video_input);

        let inner = Arc::new_cyclic(|weak: &Weak<ManagerInner>| {
            let listener: Arc<dyn DeviceChangeListener> = Arc::new(RefreshOnDeviceChange {
                inner: weak.clone(),
            });
            ManagerInner {
                emitter: ChangeEmitter::new(config.event_capacity),
                notifications: DeviceChangeSubscription::new(Arc::clone(&hardware), listener),
                config,
                hardware,
                repository,
                registry: Mutex::new(registry),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                tracks: TrackRegistry::new(),
            }
        });

        Self { inner }
    }

    /// Create a manager and run the initial enumeration if configured.
    /// Enumeration failures are logged; the manager starts with no devices.
    pub async fn start(
        config: DeviceManagerConfig,
        hardware: Arc<dyn MediaDevices>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let refresh_on_start = config.refresh_on_start;
        let manager = Self::new(config, hardware, store);

        if refresh_on_start {
            if let Err(err) = manager.refresh().await {
                warn!("⚠️ Initial device enumeration failed: {}", err);
            }
        }
        manager
    }

    /// Start a manager backed by the JSON store at `config.store_path()`
    pub async fn open(
        config: DeviceManagerConfig,
        hardware: Arc<dyn MediaDevices>,
    ) -> anyhow::Result<Self> {
        let path = config.store_path();
        let store = JsonFileStore::open(&path).map_err(|err| {
            anyhow::anyhow!("Failed to open device store at {}: {}", path.display(), err)
        })?;
        Ok(Self::start(config, hardware, Arc::new(store)).await)
    }

    pub fn config(&self) -> &DeviceManagerConfig {
        &self.inner.config
    }

    /// Enumerate hardware and reconcile the device list.
    ///
    /// Concurrent callers share one enumeration and see the same outcome.
    pub async fn refresh(&self) -> Result<DeviceDiff> {
        self.inner.start_refresh(false).await
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.inner.in_flight).is_some()
    }

    /// Snapshot of the live device list
    pub fn devices(&self) -> Vec<Device> {
        lock(&self.inner.registry).devices().to_vec()
    }

    pub fn device(&self, kind: DeviceKind, device_id: &str) -> Option<Device> {
        lock(&self.inner.registry).device(kind, device_id).cloned()
    }

    pub fn selection(&self, kind: DeviceKind) -> DeviceSelection {
        self.inner.selection(kind)
    }

    /// Set a selection explicitly, persist it and notify.
    ///
    /// Notifies on every call. The in-memory value is updated even when
    /// persisting it fails; the store error is returned.
    pub fn set_selection(&self, kind: DeviceKind, selection: DeviceSelection) -> Result<()> {
        if !kind.is_input() {
            return Err(MediaDeviceError::InvalidValue(kind.to_string()));
        }

        lock(&self.inner.registry).set_selection(kind, selection.clone());
        info!("🎚️ {} selection set to {}", kind, selection);

        self.inner.emitter.emit(ChangeEvent::Selection {
            kind,
            selection: selection.clone(),
        });

        self.inner.repository.save_selection(kind, &selection)?;
        Ok(())
    }

    /// Current value of an observable field
    pub fn get(&self, field: Field) -> FieldValue {
        match field.selection_kind() {
            Some(kind) => FieldValue::Selection(self.selection(kind)),
            None => FieldValue::Devices(self.devices()),
        }
    }

    /// Set an observable field; `devices` is read-only
    pub fn set(&self, field: Field, value: FieldValue) -> Result<()> {
        let Some(kind) = field.selection_kind() else {
            return Err(MediaDeviceError::ReadOnlyField(field.to_string()));
        };

        match value {
            FieldValue::Selection(selection) => self.set_selection(kind, selection),
            FieldValue::Devices(_) => Err(MediaDeviceError::InvalidValue(field.to_string())),
        }
    }

    /// Ranked device ids for an input kind
    pub fn preferences(&self, kind: DeviceKind) -> Vec<String> {
        lock(&self.inner.registry)
            .preference_list(kind)
            .map(|list| list.ids().to_vec())
            .unwrap_or_default()
    }

    pub fn has_confirmed_preference(&self, kind: DeviceKind) -> bool {
        self.inner.repository.is_confirmed(kind)
    }

    /// Promote the current selection to top preference and mark the kind
    /// as user-confirmed.
    pub fn update_preferences(&self, kind: DeviceKind) -> Result<()> {
        if !kind.is_input() {
            return Err(MediaDeviceError::InvalidValue(kind.to_string()));
        }

        let promoted = {
            let mut registry = lock(&self.inner.registry);
            let selected = registry.selection(kind).device_id().map(str::to_string);
            match selected {
                Some(device_id) => {
                    registry.promote(kind, &device_id);
                    registry.preference_list(kind).cloned()
                }
                None => None,
            }
        };

        match &promoted {
            Some(list) => {
                info!("⭐ {} preferences confirmed: {:?}", kind, list.ids());
                self.inner.repository.save_preferences(kind, list)?;
            }
            None => debug!("No {} device selected, confirming preferences as-is", kind),
        }

        self.inner.repository.set_confirmed(kind)?;
        Ok(())
    }

    /// Subscribe to hardware topology changes. Returns the subscriber count.
    pub fn enable_device_events(&self) -> usize {
        self.inner.notifications.enable()
    }

    /// Release a subscription from `enable_device_events`
    pub fn disable_device_events(&self) -> usize {
        self.inner.notifications.disable()
    }

    pub fn device_events_enabled(&self) -> bool {
        self.inner.notifications.is_active()
    }

    /// Acquire a capture stream honoring the stored selections.
    pub async fn acquire(&self, requested: StreamConstraints) -> Result<MediaStream> {
        let inner = &self.inner;
        if !inner.hardware.is_supported() {
            return Err(MediaDeviceError::NotSupported);
        }

        // Advisory ordering: let a running enumeration settle first
        if let Some(pending) = inner.pending_refresh() {
            inner.settle_refresh(pending, "In-flight").await;
        }

        let plan = {
            let registry = lock(&inner.registry);
            resolve_request(&requested, |kind| registry.selection(kind).clone())
        };
        if plan.is_empty() {
            warn!("⚠️ Acquisition skipped, no media kind left to request");
            return Err(MediaDeviceError::NoMediaRequested);
        }

        let conflicts = conflicting_tracks(&inner.tracks.active_tracks(), &plan.constraints);
        if !conflicts.is_empty() {
            inner.tracks.stop_tracks(&conflicts);
        }

        info!(
            "🎬 Requesting media (audio: {}, video: {})",
            plan.constraints.audio.is_requested(),
            plan.constraints.video.is_requested()
        );

        let result = inner.hardware.get_user_media(plan.constraints.clone()).await;
        let stream = match result {
            Ok(stream) => stream,
            Err(err) => {
                error!("❌ {}: {}", "ACQUISITION_FAILED".red(), err);
                self.refresh_after_acquisition().await;
                return Err(MediaDeviceError::AcquisitionFailed(err));
            }
        };

        for track in &stream.tracks {
            inner.tracks.register(Arc::clone(track));
        }

        for change in negotiated_changes(&stream, &plan.reconcile) {
            inner.adopt_negotiated(change);
        }

        info!(
            "✅ Acquired stream {} with {} tracks",
            stream.id,
            stream.tracks.len()
        );
        self.refresh_after_acquisition().await;
        Ok(stream)
    }

    /// Labels and permissions change with an acquisition, so re-enumerate
    async fn refresh_after_acquisition(&self) {
        let refresh = self.inner.start_refresh(true);
        self.inner.settle_refresh(refresh, "Post-acquisition").await;
    }

    /// Diagnostic dump of a fresh enumeration against the stored state.
    /// Does not touch the device list.
    pub async fn list_devices(&self) -> Result<DeviceReport> {
        if !self.inner.hardware.is_supported() {
            return Err(MediaDeviceError::NotSupported);
        }

        let enumerated = self
            .inner
            .hardware
            .enumerate_devices()
            .await
            .map_err(MediaDeviceError::EnumerationFailed)?;

        let report = {
            let registry = lock(&self.inner.registry);
            DeviceReport::build(&enumerated, &registry)
        };
        info!("📋 {}\n{}", "DEVICE_REPORT".blue(), report);
        Ok(report)
    }

    pub fn active_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.inner.tracks.active_tracks()
    }

    /// Listen for `change:<field>` notifications
    pub fn on<F>(&self, field: Field, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.inner.emitter.on(field, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.emitter.off(id)
    }

    /// Broadcast receiver for every change event
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.emitter.subscribe()
    }

    /// Stop all tracks and release the device change listener
    pub fn shutdown(&self) {
        info!("🛑 Shutting down media device manager");
        self.inner.tracks.stop_all();
        self.inner.notifications.reset();
        lock(&self.inner.in_flight).take();
    }
}
