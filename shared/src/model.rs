use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};
use uuid::Uuid;

/// Media types are accepted on prefix alone; no extension allow-list.
pub const IMAGE_MEDIA_PREFIX: &str = "image/";

pub fn is_image_media_type(media_type: &str) -> bool {
    media_type.starts_with(IMAGE_MEDIA_PREFIX)
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    EnumIter,
    AsRefStr
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PlantCategory {
    #[default]
    Tomato,
    Potato,
    Pepper,
}

impl PlantCategory {
    /// Resolves a free-form plant hint. Unknown hints fall back to the default
    /// category; an empty hint means nothing was chosen.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim();
        if hint.is_empty() {
            return None;
        }
        Some(Self::from_str(hint).unwrap_or_default())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    AsRefStr
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PredictionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

/// Session-local handle to an uploaded image, derived from its content.
/// The bytes themselves are never stored alongside the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(format!("local:sha256:{}", hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSelection {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub image_ref: ImageRef,
}

impl ImageSelection {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let image_ref = ImageRef::from_bytes(&bytes);
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
            image_ref,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_image(&self) -> bool {
        is_image_media_type(&self.media_type)
    }

    /// Size in megabytes with two decimals, as shown under the drop zone.
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.byte_size() as f64 / 1024.0 / 1024.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub image: &'a ImageSelection,
    pub category: PlantCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub label: String,
    pub confidence: f32,
}

pub const HEALTHY_LABEL: &str = "Healthy";

impl AnalysisResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Option<Self> {
        is_valid_confidence(confidence).then(|| Self {
            label: label.into(),
            confidence,
        })
    }

    pub fn has_valid_confidence(&self) -> bool {
        is_valid_confidence(self.confidence)
    }

    pub fn is_healthy(&self) -> bool {
        self.label == HEALTHY_LABEL
    }

    pub fn confidence_percent(&self) -> String {
        format_percent(self.confidence)
    }
}

pub fn is_valid_confidence(confidence: f32) -> bool {
    (0.0..=1.0).contains(&confidence)
}

pub fn format_percent(ratio: f32) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Insert payload for the record store. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub owner_id: OwnerId,
    pub image_ref: ImageRef,
    pub plant_category: PlantCategory,
    pub predicted_label: String,
    pub confidence: f32,
    pub status: PredictionStatus,
}

impl NewPrediction {
    pub fn completed(
        owner_id: OwnerId,
        image_ref: ImageRef,
        plant_category: PlantCategory,
        result: &AnalysisResult,
    ) -> Self {
        Self {
            owner_id,
            image_ref,
            plant_category,
            predicted_label: result.label.clone(),
            confidence: result.confidence,
            status: PredictionStatus::Completed,
        }
    }

    pub fn owned_by(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = owner_id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub image_ref: ImageRef,
    pub plant_category: PlantCategory,
    pub predicted_label: String,
    pub confidence: f32,
    pub status: PredictionStatus,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn from_new(new: NewPrediction, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            image_ref: new.image_ref,
            plant_category: new.plant_category,
            predicted_label: new.predicted_label,
            confidence: new.confidence,
            status: new.status,
            created_at,
        }
    }

    pub fn analysis_result(&self) -> AnalysisResult {
        AnalysisResult {
            label: self.predicted_label.clone(),
            confidence: self.confidence,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.predicted_label == HEALTHY_LABEL
    }
}
