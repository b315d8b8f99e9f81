// src/storage/mod.rs
pub mod calendar;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Timelike};

use crate::extractors::QuizRecord;
use crate::timetable::Unit;
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates the output directory if needed.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir)?;
            tracing::debug!("Created output directory {}", base_dir.display());
        }
        Ok(Self { base_dir })
    }

    /// Saves every unit with its grouped classes as `units.json`
    pub fn save_units(&self, units: &[Unit]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("units.json");

        let content = serde_json::to_string_pretty(units)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, content)?;

        tracing::info!("Saved {} units to {}", units.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves the one-line-per-class summary as `classes.json`
    pub fn save_class_summary(&self, units: &[Unit]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("classes.json");

        let content = serde_json::to_string_pretty(&class_summary(units))
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, content)?;

        tracing::info!("Saved class summary to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves a subject's quizzes as an iCalendar file
    pub fn save_calendar(&self, file_name: &str, subject: &str, quizzes: &[QuizRecord]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(file_name);

        let ics = calendar::quizzes_as_ics(quizzes, subject, chrono::Utc::now());
        fs::write(&file_path, ics)?;

        tracing::info!("Saved calendar to {}", file_path.display());
        Ok(file_path)
    }
}

/// Maps `"<unit name> - <class group>"` to `"<day>, <start> till <end>"` for each session.
///
/// A group repeated under the same unit name in a later unit replaces the earlier one.
pub fn class_summary(units: &[Unit]) -> BTreeMap<String, Vec<String>> {
    let mut summary = BTreeMap::new();
    for unit in units {
        for (group, sessions) in unit.classes.iter() {
            let times = sessions
                .iter()
                .map(|s| format!("{}, {} till {}", s.day, short_time(s.start), short_time(s.end)))
                .collect();
            summary.insert(format!("{} - {}", unit.unit_name, group), times);
        }
    }
    summary
}

// 09:00 -> "09", 13:30 -> "13:30"
fn short_time(time: NaiveTime) -> String {
    if time.minute() == 0 {
        time.format("%H").to_string()
    } else {
        time.format("%H:%M").to_string()
    }
}
