pub mod acquisition;
pub mod track_registry;

pub use acquisition::{
    conflicting_tracks, negotiated_changes, resolve_request, AcquisitionPlan, NegotiatedChange,
};
pub use track_registry::TrackRegistry;
