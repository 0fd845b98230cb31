use crate::classifier::known_diseases;
use crate::model::{PredictionRecord, PredictionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Published accuracy of the classification model.
pub const MODEL_ACCURACY: f32 = 0.952;
/// Number of recent records the derived rates are computed over.
pub const STATS_WINDOW: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_predictions: u64,
    pub window_size: usize,
    pub healthy: usize,
    pub diseased: usize,
    pub failed: usize,
    pub healthy_rate: Option<f32>,
    pub mean_confidence: Option<f32>,
    pub distinct_labels: usize,
    pub model_accuracy: f32,
    pub diseases_covered: usize,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self::from_count(0)
    }
}

impl StatsSnapshot {
    pub fn from_count(total_predictions: u64) -> Self {
        Self::compute(total_predictions, &[])
    }

    /// Pure over its inputs: the owner's total count and a window of their
    /// most recent records. Only completed records feed the rates.
    pub fn compute(total_predictions: u64, recent: &[PredictionRecord]) -> Self {
        let completed: Vec<&PredictionRecord> = recent
            .iter()
            .filter(|r| r.status == PredictionStatus::Completed)
            .collect();
        let healthy = completed.iter().filter(|r| r.is_healthy()).count();
        let diseased = completed.len() - healthy;
        let failed = recent
            .iter()
            .filter(|r| r.status == PredictionStatus::Failed)
            .count();

        let (healthy_rate, mean_confidence) = if completed.is_empty() {
            (None, None)
        } else {
            let n = completed.len() as f32;
            let confidence_sum: f32 = completed.iter().map(|r| r.confidence).sum();
            (Some(healthy as f32 / n), Some(confidence_sum / n))
        };

        let distinct_labels = completed
            .iter()
            .map(|r| r.predicted_label.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            total_predictions,
            window_size: recent.len(),
            healthy,
            diseased,
            failed,
            healthy_rate,
            mean_confidence,
            distinct_labels,
            model_accuracy: MODEL_ACCURACY,
            diseases_covered: known_diseases().len(),
        }
    }
}
