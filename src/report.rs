use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one window update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub time_ms: i64,
    pub new_slices: usize,
    /// Mean feature value of the newest slice
    pub newest_slice_mean: f32,
}

impl UpdateRecord {
    pub fn new(time_ms: i64, new_slices: usize, newest_slice: &[i8]) -> Self {
        let newest_slice_mean = if newest_slice.is_empty() {
            0.0
        } else {
            newest_slice.iter().map(|&v| v as f32).sum::<f32>() / newest_slice.len() as f32
        };
        Self {
            time_ms,
            new_slices,
            newest_slice_mean,
        }
    }
}

/// A complete replay session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updates: Vec<UpdateRecord>,

    // Stats
    pub total_new_slices: usize,
    pub audio_duration_ms: i64,
    pub error: Option<String>,
}

impl SessionReport {
    pub fn new(source: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            source,
            started_at: Utc::now(),
            ended_at: None,
            updates: Vec::new(),
            total_new_slices: 0,
            audio_duration_ms: 0,
            error: None,
        }
    }

    pub fn add_update(&mut self, update: UpdateRecord) {
        self.total_new_slices += update.new_slices;
        self.audio_duration_ms = self.audio_duration_ms.max(update.time_ms);
        self.updates.push(update);
    }

    pub fn finalize(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Slices computed per update on average, or 0 with no updates
    pub fn mean_new_slices(&self) -> f64 {
        if self.updates.is_empty() {
            return 0.0;
        }
        self.total_new_slices as f64 / self.updates.len() as f64
    }
}
