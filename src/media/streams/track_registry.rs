// Active track lifecycle
//
// Every track handed out by an acquisition is registered here. The registry
// installs an observer on each track: an ended track drops out of the set and
// a clone is registered as an independent entry.

use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info};

use crate::media::hardware::{MediaTrack, TrackObserver};
use crate::utils::lock;

#[derive(Default)]
struct TrackSet {
    tracks: Mutex<Vec<Arc<dyn MediaTrack>>>,
}

impl TrackSet {
    fn register(self: &Arc<Self>, track: Arc<dyn MediaTrack>) -> bool {
        if !track.is_live() {
            debug!("Skipping ended {} track {}", track.kind(), track.id());
            return false;
        }

        {
            let mut tracks = lock(&self.tracks);
            if tracks.iter().any(|existing| existing.id() == track.id()) {
                return false;
            }
            tracks.push(Arc::clone(&track));
        }

        track.set_observer(Arc::new(TrackSetObserver {
            set: Arc::downgrade(self),
        }));
        crate::device_debug!("Registered {} track {}", track.kind(), track.id());
        true
    }

    fn remove(&self, track_id: &str) -> Option<Arc<dyn MediaTrack>> {
        let mut tracks = lock(&self.tracks);
        let index = tracks.iter().position(|track| track.id() == track_id)?;
        Some(tracks.remove(index))
    }
}

struct TrackSetObserver {
    set: Weak<TrackSet>,
}

impl TrackObserver for TrackSetObserver {
    fn on_ended(&self, track_id: &str) {
        if let Some(set) = self.set.upgrade() {
            if set.remove(track_id).is_some() {
                debug!("Track {} ended", track_id);
            }
        }
    }

    fn on_cloned(&self, clone: Arc<dyn MediaTrack>) {
        if let Some(set) = self.set.upgrade() {
            set.register(clone);
        }
    }
}

/// Owner of the active track set
#[derive(Clone, Default)]
pub struct TrackRegistry {
    set: Arc<TrackSet>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a live track. Returns false for ended or already-tracked tracks.
    pub fn register(&self, track: Arc<dyn MediaTrack>) -> bool {
        self.set.register(track)
    }

    pub fn remove(&self, track_id: &str) -> Option<Arc<dyn MediaTrack>> {
        self.set.remove(track_id)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        lock(&self.set.tracks).iter().any(|track| track.id() == track_id)
    }

    /// Snapshot of the active tracks, in registration order
    pub fn active_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        lock(&self.set.tracks).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.set.tracks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and stop the listed tracks
    pub fn stop_tracks(&self, track_ids: &[String]) -> usize {
        let stopped: Vec<Arc<dyn MediaTrack>> = track_ids
            .iter()
            .filter_map(|track_id| self.set.remove(track_id))
            .collect();

        for track in &stopped {
            info!(
                "⏹️ Stopping {} track {} on {}",
                track.kind(),
                track.id(),
                track.device_id().unwrap_or_default()
            );
            track.stop();
        }
        stopped.len()
    }

    /// Stop every active track and empty the set
    pub fn stop_all(&self) -> usize {
        let tracks = std::mem::take(&mut *lock(&self.set.tracks));
        for track in &tracks {
            track.stop();
        }
        if !tracks.is_empty() {
            info!("⏹️ Stopped {} active tracks", tracks.len());
        }
        tracks.len()
    }
}

impl std::fmt::Debug for TrackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackRegistry")
            .field("tracks", &self.len())
            .finish()
    }
}
