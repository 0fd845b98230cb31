use crate::model::{AnalysisRequest, AnalysisResult, HEALTHY_LABEL, PlantCategory};
use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::sync::Mutex;
use strum::IntoEnumIterator;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub label: &'static str,
    pub confidence: f32,
}

const fn candidate(label: &'static str, confidence: f32) -> Candidate {
    Candidate { label, confidence }
}

const TOMATO: &[Candidate] = &[
    candidate("Early Blight", 0.89),
    candidate("Late Blight", 0.76),
    candidate("Leaf Mold", 0.82),
    candidate("Septoria Leaf Spot", 0.71),
    candidate("Bacterial Spot", 0.68),
    candidate(HEALTHY_LABEL, 0.95),
];

const POTATO: &[Candidate] = &[
    candidate("Early Blight", 0.87),
    candidate("Late Blight", 0.91),
    candidate(HEALTHY_LABEL, 0.93),
];

const PEPPER: &[Candidate] = &[
    candidate("Bacterial Spot", 0.84),
    candidate(HEALTHY_LABEL, 0.88),
];

impl PlantCategory {
    pub fn candidates(self) -> &'static [Candidate] {
        match self {
            PlantCategory::Tomato => TOMATO,
            PlantCategory::Potato => POTATO,
            PlantCategory::Pepper => PEPPER,
        }
    }
}

/// Every non-healthy label the stand-in can report, across all categories.
pub fn known_diseases() -> BTreeSet<&'static str> {
    PlantCategory::iter()
        .flat_map(|category| category.candidates().iter())
        .map(|c| c.label)
        .filter(|label| *label != HEALTHY_LABEL)
        .collect()
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
    #[error("Image rejected: {0}")]
    Rejected(String),
    #[error("Confidence {0} is outside [0, 1]")]
    InvalidConfidence(f32),
}

#[async_trait(?Send)]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisResult, ClassifyError>;
}

/// Stand-in for a real model: draws uniformly from the category's table and
/// ignores the image bytes.
pub struct StandInClassifier<R = SmallRng> {
    rng: Mutex<R>,
}

impl StandInClassifier<SmallRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> StandInClassifier<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng: Mutex::new(rng) }
    }

    pub fn pick(&self, category: PlantCategory) -> Result<Candidate, ClassifyError> {
        let candidates = category.candidates();
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ClassifyError::Unavailable("random source poisoned".into()))?;
        let index = rng.random_range(0..candidates.len());
        Ok(candidates[index])
    }
}

#[async_trait(?Send)]
impl<R: Rng + Send> Classifier for StandInClassifier<R> {
    async fn classify(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisResult, ClassifyError> {
        let picked = self.pick(request.category)?;
        log::debug!(
            "Stand-in classifier picked {} ({}) for {}",
            picked.label,
            picked.confidence,
            request.image.image_ref
        );
        AnalysisResult::new(picked.label, picked.confidence)
            .ok_or(ClassifyError::InvalidConfidence(picked.confidence))
    }
}
