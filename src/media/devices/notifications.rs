// Device topology notifications
//
// Several consumers may ask for hot-plug events at once. The hardware only
// carries one listener, so enable/disable calls are counted and the listener
// is installed on the first enable and removed when the last one is released.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::media::hardware::{DeviceChangeListener, MediaDevices};
use crate::utils::lock;

/// Reference-counted hardware device-change subscription
pub struct DeviceChangeSubscription {
    hardware: Arc<dyn MediaDevices>,
    listener: Arc<dyn DeviceChangeListener>,
    subscribers: Mutex<usize>,
}

impl DeviceChangeSubscription {
    pub fn new(hardware: Arc<dyn MediaDevices>, listener: Arc<dyn DeviceChangeListener>) -> Self {
        Self {
            hardware,
            listener,
            subscribers: Mutex::new(0),
        }
    }

    /// Add a subscriber. Returns the new count.
    pub fn enable(&self) -> usize {
        let mut subscribers = lock(&self.subscribers);
        *subscribers += 1;

        if *subscribers == 1 {
            info!("🎧 Starting device change monitoring");
            self.hardware
                .add_device_change_listener(Arc::clone(&self.listener));
        } else {
            debug!("Device change monitoring already active ({} subscribers)", *subscribers);
        }
        *subscribers
    }

    /// Release a subscriber. Returns the new count.
    pub fn disable(&self) -> usize {
        let mut subscribers = lock(&self.subscribers);
        if *subscribers == 0 {
            warn!("⚠️ disable_device_events called with no active subscribers");
            return 0;
        }

        *subscribers -= 1;
        if *subscribers == 0 {
            info!("🛑 Stopping device change monitoring");
            self.hardware.remove_device_change_listener();
        }
        *subscribers
    }

    /// Drop every subscriber and remove the listener if installed
    pub fn reset(&self) {
        let mut subscribers = lock(&self.subscribers);
        if *subscribers > 0 {
            *subscribers = 0;
            self.hardware.remove_device_change_listener();
        }
    }

    pub fn subscribers(&self) -> usize {
        *lock(&self.subscribers)
    }

    pub fn is_active(&self) -> bool {
        self.subscribers() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::hardware::MockMediaDevices;

    struct NoopListener;

    impl DeviceChangeListener for NoopListener {
        fn on_device_change(&self) {}
    }

    fn subscription(installs: usize, removals: usize) -> DeviceChangeSubscription {
        let mut hardware = MockMediaDevices::new();
        hardware
            .expect_add_device_change_listener()
            .times(installs)
            .return_const(());
        hardware
            .expect_remove_device_change_listener()
            .times(removals)
            .return_const(());
        DeviceChangeSubscription::new(Arc::new(hardware), Arc::new(NoopListener))
    }

    #[test]
    fn test_listener_installed_once_for_nested_enables() {
        let subscription = subscription(1, 1);

        assert_eq!(subscription.enable(), 1);
        assert_eq!(subscription.enable(), 2);
        assert_eq!(subscription.disable(), 1);
        assert!(subscription.is_active());
        assert_eq!(subscription.disable(), 0);
        assert!(!subscription.is_active());
    }

    #[test]
    fn test_unbalanced_disable_is_ignored() {
        let subscription = subscription(0, 0);
        assert_eq!(subscription.disable(), 0);
    }

    #[test]
    fn test_reenable_after_release_installs_again() {
        let subscription = subscription(2, 2);
        subscription.enable();
        subscription.disable();
        subscription.enable();
        subscription.reset();
        assert_eq!(subscription.subscribers(), 0);
    }
}
