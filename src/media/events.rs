// Change notifications for the device manager's observable fields
//
// Consumers either register a listener for one field (`on`/`off`) or take a
// broadcast receiver carrying every change. Listeners run synchronously on
// the thread that applied the change, after all internal locks are released.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::devices::types::{Device, DeviceKind, DeviceSelection};
use crate::utils::lock;

/// Observable attributes of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "devices")]
    Devices,
    #[serde(rename = "audioInputId")]
    AudioInputId,
    #[serde(rename = "videoInputId")]
    VideoInputId,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Devices => "devices",
            Field::AudioInputId => "audioInputId",
            Field::VideoInputId => "videoInputId",
        }
    }

    /// Selection field for an input kind
    pub fn for_kind(kind: DeviceKind) -> Option<Field> {
        match kind {
            DeviceKind::AudioInput => Some(Field::AudioInputId),
            DeviceKind::VideoInput => Some(Field::VideoInputId),
            DeviceKind::AudioOutput => None,
        }
    }

    /// Input kind behind a selection field
    pub fn selection_kind(self) -> Option<DeviceKind> {
        match self {
            Field::Devices => None,
            Field::AudioInputId => Some(DeviceKind::AudioInput),
            Field::VideoInputId => Some(DeviceKind::VideoInput),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "devices" => Ok(Field::Devices),
            "audioInputId" => Ok(Field::AudioInputId),
            "videoInputId" => Ok(Field::VideoInputId),
            other => Err(format!("unknown field: {}", other)),
        }
    }
}

/// Value of an observable field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldValue {
    Devices(Vec<Device>),
    Selection(DeviceSelection),
}

/// A `change:<field>` notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChangeEvent {
    Devices(Vec<Device>),
    Selection {
        kind: DeviceKind,
        selection: DeviceSelection,
    },
}

impl ChangeEvent {
    pub fn field(&self) -> Field {
        match self {
            ChangeEvent::Devices(_) => Field::Devices,
            ChangeEvent::Selection { kind, .. } => {
                Field::for_kind(*kind).unwrap_or(Field::Devices)
            }
        }
    }

    pub fn value(&self) -> FieldValue {
        match self {
            ChangeEvent::Devices(devices) => FieldValue::Devices(devices.clone()),
            ChangeEvent::Selection { selection, .. } => FieldValue::Selection(selection.clone()),
        }
    }
}

/// Handle returned by `ChangeEmitter::on`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Fan-out of change events to keyed listeners and broadcast subscribers
pub struct ChangeEmitter {
    sender: broadcast::Sender<ChangeEvent>,
    listeners: Mutex<Vec<(ListenerId, Field, Listener)>>,
}

impl ChangeEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Receiver for every change event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Register a listener for one field
    pub fn on<F>(&self, field: Field, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        lock(&self.listeners).push((id, field, Arc::new(listener)));
        debug!("➕ Added change:{} listener", field);
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn emit(&self, event: ChangeEvent) {
        let field = event.field();
        let targets: Vec<Listener> = lock(&self.listeners)
            .iter()
            .filter(|(_, listener_field, _)| *listener_field == field)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        crate::device_debug!("change:{} -> {} listener(s)", field, targets.len());
        for listener in targets {
            listener(&event);
        }

        // No receivers is fine; broadcast subscribers are optional
        let _ = self.sender.send(event);
    }
}

impl fmt::Debug for ChangeEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEmitter")
            .field("listeners", &self.listener_count())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
