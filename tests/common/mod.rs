// Shared test doubles for the hardware port
#![allow(dead_code)]

use async_trait::async_trait;
use sendin_devices_lib::{
    DeviceChangeListener, DeviceInfo, DeviceKind, HardwareError, MediaDevices, MediaStream,
    MediaTrack, StreamConstraints, TrackKind, TrackObserver,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn mic(id: &str) -> DeviceInfo {
    DeviceInfo::new(id, DeviceKind::AudioInput)
}

pub fn cam(id: &str) -> DeviceInfo {
    DeviceInfo::new(id, DeviceKind::VideoInput)
}

pub fn speaker(id: &str) -> DeviceInfo {
    DeviceInfo::new(id, DeviceKind::AudioOutput)
}

/// Track whose lifecycle the test drives by hand
pub struct FakeTrack {
    id: String,
    kind: TrackKind,
    device_id: Option<String>,
    live: AtomicBool,
    observer: Mutex<Option<Arc<dyn TrackObserver>>>,
}

impl std::fmt::Debug for FakeTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl FakeTrack {
    pub fn new(id: &str, kind: TrackKind, device_id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            device_id: device_id.map(str::to_string),
            live: AtomicBool::new(true),
            observer: Mutex::new(None),
        })
    }

    /// Simulate the platform ending the track (device unplugged, permission revoked)
    pub fn end(&self) {
        if !self.live.swap(false, Ordering::SeqCst) {
            return;
        }
        let observer = self.observer.lock().unwrap().clone();
        if let Some(observer) = observer {
            observer.on_ended(&self.id);
        }
    }

    pub fn clone_as(&self, id: &str) -> Arc<FakeTrack> {
        let clone = FakeTrack::new(id, self.kind, self.device_id.as_deref());
        let observer = self.observer.lock().unwrap().clone();
        if let Some(observer) = observer {
            observer.on_cloned(clone.clone());
        }
        clone
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn device_id(&self) -> Option<String> {
        self.device_id.clone()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.end();
    }

    fn set_observer(&self, observer: Arc<dyn TrackObserver>) {
        *self.observer.lock().unwrap() = Some(observer);
    }
}

/// Scriptable hardware: a mutable device list, recorded requests and
/// a manually fired device-change listener
#[derive(Default)]
pub struct FakeMediaDevices {
    pub unsupported: AtomicBool,
    /// Enumerations never complete while set
    pub stall_enumeration: AtomicBool,
    devices: Mutex<Vec<DeviceInfo>>,
    enumeration_error: Mutex<Option<HardwareError>>,
    acquisition_error: Mutex<Option<HardwareError>>,
    /// Device id the platform opens instead of the requested one
    negotiated: Mutex<Vec<(TrackKind, String)>>,
    requests: Mutex<Vec<StreamConstraints>>,
    listener: Mutex<Option<Arc<dyn DeviceChangeListener>>>,
    tracks: Mutex<Vec<Arc<FakeTrack>>>,
    pub enumerations: AtomicUsize,
    pub listener_installs: AtomicUsize,
    pub listener_removals: AtomicUsize,
    next_track: AtomicUsize,
}

impl FakeMediaDevices {
    pub fn with_devices(devices: Vec<DeviceInfo>) -> Arc<Self> {
        let fake = Self::default();
        *fake.devices.lock().unwrap() = devices;
        Arc::new(fake)
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn fail_enumeration(&self, error: Option<HardwareError>) {
        *self.enumeration_error.lock().unwrap() = error;
    }

    pub fn fail_next_acquisition(&self, error: HardwareError) {
        *self.acquisition_error.lock().unwrap() = Some(error);
    }

    pub fn negotiate(&self, kind: TrackKind, device_id: &str) {
        self.negotiated
            .lock()
            .unwrap()
            .push((kind, device_id.to_string()));
    }

    pub fn requests(&self) -> Vec<StreamConstraints> {
        self.requests.lock().unwrap().clone()
    }

    pub fn tracks(&self) -> Vec<Arc<FakeTrack>> {
        self.tracks.lock().unwrap().clone()
    }

    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }

    /// Deliver a topology change to the installed listener
    pub fn fire_device_change(&self) -> bool {
        let listener = self.listener.lock().unwrap().clone();
        match listener {
            Some(listener) => {
                listener.on_device_change();
                true
            }
            None => false,
        }
    }

    fn pick_device(&self, kind: TrackKind, constraints: &StreamConstraints) -> Option<String> {
        if let Some((_, id)) = self
            .negotiated
            .lock()
            .unwrap()
            .iter()
            .find(|(negotiated_kind, _)| *negotiated_kind == kind)
        {
            return Some(id.clone());
        }

        if let Some(requested) = constraints.get(kind).device_id() {
            return Some(requested.device_id().to_string());
        }

        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|device| device.kind == kind.device_kind())
            .map(|device| device.device_id.clone())
    }
}

#[async_trait]
impl MediaDevices for FakeMediaDevices {
    fn is_supported(&self) -> bool {
        !self.unsupported.load(Ordering::SeqCst)
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, HardwareError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to observe the in-flight enumeration
        tokio::task::yield_now().await;
        if self.stall_enumeration.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if let Some(error) = self.enumeration_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn get_user_media(
        &self,
        constraints: StreamConstraints,
    ) -> Result<MediaStream, HardwareError> {
        self.requests.lock().unwrap().push(constraints.clone());
        tokio::task::yield_now().await;

        if let Some(error) = self.acquisition_error.lock().unwrap().take() {
            return Err(error);
        }

        let mut tracks: Vec<Arc<dyn MediaTrack>> = Vec::new();
        for kind in [TrackKind::Audio, TrackKind::Video] {
            if !constraints.get(kind).is_requested() {
                continue;
            }
            let Some(device_id) = self.pick_device(kind, &constraints) else {
                return Err(HardwareError::not_found(format!("no {} device", kind)));
            };
            let n = self.next_track.fetch_add(1, Ordering::SeqCst) + 1;
            let track = FakeTrack::new(&format!("{}-{}", kind, n), kind, Some(&device_id));
            self.tracks.lock().unwrap().push(track.clone());
            tracks.push(track);
        }

        Ok(MediaStream::new(
            format!("stream-{}", self.next_track.load(Ordering::SeqCst)),
            tracks,
        ))
    }

    fn add_device_change_listener(&self, listener: Arc<dyn DeviceChangeListener>) {
        self.listener_installs.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn remove_device_change_listener(&self) {
        self.listener_removals.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = None;
    }
}
