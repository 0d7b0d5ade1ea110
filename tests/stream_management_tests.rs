mod common;

use common::{cam, mic, FakeMediaDevices};
use sendin_devices_lib::{
    DeviceKind, DeviceManagerConfig, DeviceSelection, Field, HardwareError, MediaDeviceError,
    MediaDeviceManager, MediaTrack, MemoryStore, StreamConstraints, TrackConstraints, TrackKind,
};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Test stream acquisition and track lifecycle
#[cfg(test)]
mod stream_management_tests {
    use super::*;

    fn create_test_manager(fake: &Arc<FakeMediaDevices>) -> MediaDeviceManager {
        MediaDeviceManager::new(
            DeviceManagerConfig::default(),
            fake.clone(),
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    #[serial]
    async fn test_exact_request_stops_conflicting_track_first() {
        let fake = FakeMediaDevices::with_devices(vec![cam("cam1"), cam("cam2")]);
        let manager = create_test_manager(&fake);
        manager.refresh().await.unwrap();

        let first = manager.acquire(StreamConstraints::video_only()).await.unwrap();
        let cam1_track = first.tracks[0].clone();
        assert_eq!(cam1_track.device_id().as_deref(), Some("cam1"));

        let second = manager
            .acquire(StreamConstraints::default().with_video(TrackConstraints::exact("cam2")))
            .await
            .unwrap();

        assert!(!cam1_track.is_live(), "cam1 track should be stopped");
        let active = manager.active_tracks();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), second.tracks[0].id());
        assert_eq!(active[0].device_id().as_deref(), Some("cam2"));

        // An explicit caller device does not rewrite the stored selection
        assert_eq!(manager.selection(DeviceKind::VideoInput), DeviceSelection::pinned("cam1"));
    }

    #[tokio::test]
    #[serial]
    async fn test_same_device_request_keeps_existing_track() {
        let fake = FakeMediaDevices::with_devices(vec![cam("cam1")]);
        let manager = create_test_manager(&fake);
        manager.refresh().await.unwrap();

        let first = manager.acquire(StreamConstraints::video_only()).await.unwrap();
        manager.acquire(StreamConstraints::video_only()).await.unwrap();

        assert!(first.tracks[0].is_live());
        assert_eq!(manager.active_tracks().len(), 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_acquisition_failure_refreshes_and_propagates() {
        let fake = FakeMediaDevices::with_devices(vec![mic("mic1")]);
        let manager = create_test_manager(&fake);
        manager.refresh().await.unwrap();
        let before = fake.enumeration_count();

        let rejection = HardwareError::not_allowed("Permission denied");
        fake.fail_next_acquisition(rejection.clone());
        let err = manager
            .acquire(StreamConstraints::audio_only())
            .await
            .unwrap_err();

        assert_eq!(err, MediaDeviceError::AcquisitionFailed(rejection.clone()));
        assert_eq!(err.hardware_error(), Some(&rejection));
        assert_eq!(err.to_string(), "NotAllowedError: Permission denied");
        assert_eq!(fake.enumeration_count(), before + 1);
        assert!(manager.active_tracks().is_empty());
    }

    #[test]
    #[serial]
    fn test_unsupported_environment_rejects_without_hardware_call() {
        let fake = FakeMediaDevices::with_devices(vec![mic("mic1")]);
        fake.unsupported.store(true, Ordering::SeqCst);
        let manager = create_test_manager(&fake);

        let result = tokio_test::block_on(manager.acquire(StreamConstraints::audio_video()));
        assert_eq!(result.unwrap_err(), MediaDeviceError::NotSupported);
        assert!(fake.requests().is_empty());
        assert_eq!(fake.enumeration_count(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_negotiated_device_becomes_selection() {
        let fake = FakeMediaDevices::with_devices(vec![mic("mic1"), mic("mic2")]);
        fake.negotiate(TrackKind::Audio, "mic2");
        let manager = create_test_manager(&fake);
        let mut rx = manager.subscribe();

        manager.acquire(StreamConstraints::audio_only()).await.unwrap();

        assert_eq!(manager.selection(DeviceKind::AudioInput), DeviceSelection::pinned("mic2"));
        assert_eq!(manager.preferences(DeviceKind::AudioInput), vec!["mic2", "mic1"]);
        assert_eq!(rx.try_recv().unwrap().field(), Field::AudioInputId);
    }

    #[tokio::test]
    #[serial]
    async fn test_caller_device_id_is_never_overridden() {
        let fake = FakeMediaDevices::with_devices(vec![cam("cam1"), cam("cam2")]);
        let manager = create_test_manager(&fake);
        manager.refresh().await.unwrap();

        manager
            .acquire(StreamConstraints::default().with_video(TrackConstraints::ideal("cam2")))
            .await
            .unwrap();

        let request = &fake.requests()[0];
        assert_eq!(request.video.exact_device_id(), None);
        assert_eq!(request.video.device_id().map(|c| c.device_id()), Some("cam2"));
    }

    #[tokio::test]
    #[serial]
    async fn test_disabled_kind_is_not_requested() {
        let fake = FakeMediaDevices::with_devices(vec![mic("mic1"), cam("cam1")]);
        let manager = create_test_manager(&fake);
        manager.refresh().await.unwrap();
        manager
            .set_selection(DeviceKind::AudioInput, DeviceSelection::Disabled)
            .unwrap();

        let stream = manager.acquire(StreamConstraints::audio_video()).await.unwrap();

        let request = &fake.requests()[0];
        assert!(!request.audio.is_requested());
        assert_eq!(request.video.exact_device_id(), Some("cam1"));
        assert!(stream.track(TrackKind::Audio).is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_acquire_waits_for_in_flight_enumeration() {
        let fake = FakeMediaDevices::with_devices(vec![cam("cam1")]);
        let manager = create_test_manager(&fake);

        let (refreshed, acquired) = tokio::join!(
            manager.refresh(),
            manager.acquire(StreamConstraints::video_only())
        );
        refreshed.unwrap();
        acquired.unwrap();

        // The selection made by the in-flight enumeration is in the request
        assert_eq!(fake.requests()[0].video.exact_device_id(), Some("cam1"));
    }

    #[tokio::test]
    #[serial]
    async fn test_selection_changed_during_acquisition_is_kept() {
        let fake = FakeMediaDevices::with_devices(vec![cam("cam1"), cam("cam2")]);
        let manager = create_test_manager(&fake);
        manager.refresh().await.unwrap();
        assert_eq!(manager.selection(DeviceKind::VideoInput), DeviceSelection::pinned("cam1"));

        // The hardware call yields, so the pin lands while cam1 is being opened
        let (acquired, _) = tokio::join!(manager.acquire(StreamConstraints::video_only()), async {
            manager
                .set_selection(DeviceKind::VideoInput, DeviceSelection::pinned("cam2"))
                .unwrap()
        });

        let stream = acquired.unwrap();
        assert_eq!(stream.tracks[0].device_id().as_deref(), Some("cam1"));
        assert_eq!(manager.selection(DeviceKind::VideoInput), DeviceSelection::pinned("cam2"));
    }

    #[tokio::test]
    #[serial]
    async fn test_negotiated_device_does_not_override_new_pin() {
        let fake = FakeMediaDevices::with_devices(vec![mic("mic1"), mic("mic2")]);
        fake.negotiate(TrackKind::Audio, "mic2");
        let manager = create_test_manager(&fake);

        let (acquired, _) = tokio::join!(manager.acquire(StreamConstraints::audio_only()), async {
            manager
                .set_selection(DeviceKind::AudioInput, DeviceSelection::pinned("mic1"))
                .unwrap()
        });

        acquired.unwrap();
        assert_eq!(manager.selection(DeviceKind::AudioInput), DeviceSelection::pinned("mic1"));
        assert_eq!(manager.preferences(DeviceKind::AudioInput), vec!["mic1", "mic2"]);
    }

    #[tokio::test]
    #[serial]
    async fn test_acquire_stops_waiting_on_stalled_enumeration() {
        let fake = FakeMediaDevices::with_devices(vec![cam("cam1")]);
        fake.stall_enumeration.store(true, Ordering::SeqCst);
        let config = DeviceManagerConfig {
            enumeration_wait_ms: 50,
            ..DeviceManagerConfig::default()
        };
        let manager = MediaDeviceManager::new(config, fake.clone(), Arc::new(MemoryStore::new()));

        manager.enable_device_events();
        assert!(fake.fire_device_change());
        assert!(manager.is_refreshing());

        let acquired = tokio::time::timeout(
            Duration::from_secs(2),
            manager.acquire(StreamConstraints::video_only()),
        )
        .await
        .expect("acquire should not wait on the stalled enumeration");

        let stream = acquired.unwrap();
        assert_eq!(stream.tracks[0].device_id().as_deref(), Some("cam1"));
        assert_eq!(fake.requests().len(), 1);
        // The stalled enumeration keeps running
        assert!(manager.is_refreshing());
    }

    #[tokio::test]
    #[serial]
    async fn test_clones_and_ended_tracks() {
        let fake = FakeMediaDevices::with_devices(vec![cam("cam1")]);
        let manager = create_test_manager(&fake);
        manager.acquire(StreamConstraints::video_only()).await.unwrap();

        let original = fake.tracks()[0].clone();
        let clone = original.clone_as("video-clone");
        assert_eq!(manager.active_tracks().len(), 2);

        original.end();
        let active = manager.active_tracks();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), "video-clone");

        clone.end();
        assert!(manager.active_tracks().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_shutdown_stops_every_track() {
        let fake = FakeMediaDevices::with_devices(vec![mic("mic1"), cam("cam1")]);
        let manager = create_test_manager(&fake);
        manager.refresh().await.unwrap();
        manager.acquire(StreamConstraints::audio_video()).await.unwrap();
        assert_eq!(manager.active_tracks().len(), 2);

        manager.shutdown();
        assert!(manager.active_tracks().is_empty());
        assert!(fake.tracks().iter().all(|track| !track.is_live()));
    }
}
