//! Combat logging
//!
//! Records combat events for post-round analysis and the headless JSON report.

use bevy::prelude::*;
use serde::Serialize;
use std::path::Path;

/// A single entry in the combat log
#[derive(Debug, Clone, Serialize)]
pub struct CombatLogEntry {
    /// Seconds since the round started
    pub timestamp: f32,
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CombatLogEventType {
    /// Damage dealt
    Damage,
    /// Someone swung
    Attack,
    /// An enemy grabbed or released the player
    Hold,
    /// A character died
    Death,
    /// Round event (start, wave, end)
    RoundEvent,
}

/// Summary written alongside the entries when the log is saved
#[derive(Debug, Clone, Serialize)]
pub struct RoundMetadata {
    pub outcome: String,
    pub waves_cleared: u32,
    pub final_player_health: f32,
    pub random_seed: Option<u64>,
}

#[derive(Serialize)]
struct SavedLog<'a> {
    metadata: &'a RoundMetadata,
    duration: f32,
    entries: &'a [CombatLogEntry],
}

/// The combat log resource storing all events
#[derive(Resource, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current round time
    pub round_time: f32,
}

impl CombatLog {
    /// Clear the log for a new round
    pub fn clear(&mut self) {
        self.entries.clear();
        self.round_time = 0.0;
    }

    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.round_time,
            event_type,
            message,
        });
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn count(&self, event_type: CombatLogEventType) -> usize {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    pub fn to_json(&self, metadata: &RoundMetadata) -> Result<String, String> {
        let saved = SavedLog {
            metadata,
            duration: self.round_time,
            entries: &self.entries,
        };
        serde_json::to_string_pretty(&saved).map_err(|e| format!("Failed to serialize log: {}", e))
    }

    /// Write the log as JSON. Without an explicit path a timestamped file is
    /// created under `round_logs/`. Returns the path written.
    pub fn save_to_file(
        &self,
        metadata: &RoundMetadata,
        output_path: Option<&str>,
    ) -> Result<String, String> {
        let path = match output_path {
            Some(path) => path.to_string(),
            None => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                format!("round_logs/round_{}.json", stamp)
            }
        };

        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {}", e))?;
            }
        }

        let json = self.to_json(metadata)?;
        std::fs::write(&path, json).map_err(|e| format!("Failed to write log: {}", e))?;
        Ok(path)
    }
}
