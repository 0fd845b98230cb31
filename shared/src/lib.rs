pub mod api;
pub mod auth;
pub mod classifier;
pub mod controller;
pub mod model;
pub mod progress;
pub mod stats;
pub mod store;

pub use auth::{AuthSession, CurrentUser};
pub use classifier::{Candidate, ClassifyError, Classifier, StandInClassifier};
pub use controller::{
    AnalysisController, AnalysisError, ControllerState, StatsLoader, StatsUpdate, ValidationRejected,
};
pub use model::{
    AnalysisRequest, AnalysisResult, ImageRef, ImageSelection, NewPrediction, OwnerId,
    PlantCategory, PredictionRecord, PredictionStatus,
};
pub use stats::StatsSnapshot;
pub use store::{MemoryRecordStore, RecordStore, StoreError};
