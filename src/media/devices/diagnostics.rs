// Troubleshooting dump of an enumeration correlated with stored state

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::registry::DeviceRegistry;
use super::types::{DeviceInfo, DeviceKind, DeviceSelection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReportEntry {
    pub device_id: String,
    pub kind: DeviceKind,
    pub group_id: String,
    /// Label as reported by this enumeration (empty without permission)
    pub label: String,
    pub fallback_label: Option<String>,
    /// Zero-based rank in the kind's preference list
    pub preference_rank: Option<usize>,
    pub selected: bool,
    /// Whether the device is in the known-device cache
    pub known: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<DeviceReportEntry>,
    pub audio_input: DeviceSelection,
    pub video_input: DeviceSelection,
    pub audio_input_preferences: Vec<String>,
    pub video_input_preferences: Vec<String>,
}

impl DeviceReport {
    pub fn build(enumerated: &[DeviceInfo], registry: &DeviceRegistry) -> Self {
        let entries = enumerated
            .iter()
            .map(|info| {
                let known = registry.known_devices().get(info.kind, &info.device_id);
                DeviceReportEntry {
                    device_id: info.device_id.clone(),
                    kind: info.kind,
                    group_id: info.group_id.clone(),
                    label: info.label.clone(),
                    fallback_label: known.map(|device| device.fallback_label.clone()),
                    preference_rank: registry
                        .preference_list(info.kind)
                        .and_then(|list| list.rank_of(&info.device_id)),
                    selected: registry.selection(info.kind).device_id()
                        == Some(info.device_id.as_str()),
                    known: known.is_some(),
                }
            })
            .collect();

        let ids = |kind| {
            registry
                .preference_list(kind)
                .map(|list| list.ids().to_vec())
                .unwrap_or_default()
        };

        Self {
            generated_at: Utc::now(),
            entries,
            audio_input: registry.selection(DeviceKind::AudioInput).clone(),
            video_input: registry.selection(DeviceKind::VideoInput).clone(),
            audio_input_preferences: ids(DeviceKind::AudioInput),
            video_input_preferences: ids(DeviceKind::VideoInput),
        }
    }
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device report at {}", self.generated_at.to_rfc3339())?;
        writeln!(f, "  audioInputId: {}", self.audio_input)?;
        writeln!(f, "  videoInputId: {}", self.video_input)?;
        for entry in &self.entries {
            let label = if entry.label.is_empty() {
                entry.fallback_label.as_deref().unwrap_or("<no label>")
            } else {
                entry.label.as_str()
            };
            let rank = entry
                .preference_rank
                .map(|rank| format!("#{}", rank + 1))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "  {} {:<12} {:<4} {} ({}){}",
                if entry.selected { "*" } else { " " },
                entry.kind.as_str(),
                rank,
                label,
                entry.device_id,
                if entry.known { "" } else { " [new]" }
            )?;
        }
        Ok(())
    }
}
