use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use chrono::{DateTime, SecondsFormat, Utc};
use shared::store::validate_new;
use shared::{
    ImageRef, NewPrediction, OwnerId, PlantCategory, PredictionRecord, PredictionStatus,
    RecordStore, StoreError,
};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// Global secondary index keyed on `user_id` with `created_at` as sort key.
pub const OWNER_INDEX: &str = "user_id-created_at-index";

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbRepository {
    client: Client,
    predictions_table: String,
}

impl DynamoDbRepository {
    pub fn new(client: Client, predictions_table: String) -> Self {
        Self {
            client,
            predictions_table,
        }
    }
}

fn map_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    log::error!("DynamoDB {} failed: {:?}", operation, err);
    match err.code() {
        Some("AccessDeniedException") | Some("UnrecognizedClientException") => {
            StoreError::Unauthorized
        }
        _ => StoreError::Unavailable(format!("{}: {}", operation, err)),
    }
}

#[async_trait(?Send)]
impl RecordStore for DynamoDbRepository {
    async fn insert(&self, record: NewPrediction) -> Result<PredictionRecord, StoreError> {
        validate_new(&record)?;
        let stored = PredictionRecord::from_new(record, Uuid::new_v4(), Utc::now());

        log::info!(
            "Storing prediction {} for user {} in table '{}'",
            stored.id,
            stored.owner_id,
            self.predictions_table
        );

        match self
            .client
            .put_item()
            .table_name(&self.predictions_table)
            .set_item(Some(record_to_item(&stored)))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
        {
            Ok(_) => Ok(stored),
            Err(e) => {
                if let Some(service_err) = e.as_service_error() {
                    if service_err.is_conditional_check_failed_exception() {
                        return Err(StoreError::Constraint(format!(
                            "prediction {} already exists",
                            stored.id
                        )));
                    }
                }
                Err(map_sdk_error("put_item", e))
            }
        }
    }

    async fn list_by_owner(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StoreError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX).max(1);
        let result = self
            .client
            .query()
            .table_name(&self.predictions_table)
            .index_name(OWNER_INDEX)
            .key_condition_expression("user_id = :user_id")
            .expression_attribute_values(":user_id", AttributeValue::S(owner.to_string()))
            .scan_index_forward(false)
            .limit(limit)
            .send()
            .await
            .map_err(|e| map_sdk_error("query", e))?;

        result
            .items
            .unwrap_or_default()
            .into_iter()
            .map(item_to_record)
            .collect()
    }

    async fn count_by_owner(&self, owner: OwnerId) -> Result<u64, StoreError> {
        let mut total: u64 = 0;
        let mut start_key: Option<Item> = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(&self.predictions_table)
                .index_name(OWNER_INDEX)
                .key_condition_expression("user_id = :user_id")
                .expression_attribute_values(":user_id", AttributeValue::S(owner.to_string()))
                .select(Select::Count)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| map_sdk_error("query count", e))?;

            total += result.count.max(0) as u64;
            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        log::debug!("User {} has {} predictions", owner, total);
        Ok(total)
    }
}

/// Timestamps are written at nanosecond precision with a `Z` suffix so the
/// sort key orders lexically the same way it orders in time.
pub fn record_to_item(record: &PredictionRecord) -> Item {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(record.id.to_string()));
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(record.owner_id.to_string()),
    );
    item.insert(
        "image_ref".to_string(),
        AttributeValue::S(record.image_ref.to_string()),
    );
    item.insert(
        "plant_type".to_string(),
        AttributeValue::S(record.plant_category.to_string()),
    );
    item.insert(
        "predicted_disease".to_string(),
        AttributeValue::S(record.predicted_label.clone()),
    );
    item.insert(
        "confidence_score".to_string(),
        AttributeValue::N(record.confidence.to_string()),
    );
    item.insert(
        "status".to_string(),
        AttributeValue::S(record.status.to_string()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(record.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true)),
    );
    item
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a String, StoreError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StoreError::Malformed(format!("Invalid {}", name)))
}

pub fn item_to_record(item: Item) -> Result<PredictionRecord, StoreError> {
    let id = Uuid::parse_str(string_attr(&item, "id")?)
        .map_err(|_| StoreError::Malformed("Invalid id".to_string()))?;

    let owner_id = Uuid::parse_str(string_attr(&item, "user_id")?)
        .map(OwnerId)
        .map_err(|_| StoreError::Malformed("Invalid user_id".to_string()))?;

    let image_ref = ImageRef::from(string_attr(&item, "image_ref")?.clone());

    let plant_category = PlantCategory::from_str(string_attr(&item, "plant_type")?)
        .map_err(|_| StoreError::Malformed("Invalid plant_type".to_string()))?;

    let predicted_label = string_attr(&item, "predicted_disease")?.clone();

    let confidence = item
        .get("confidence_score")
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<f32>().ok())
        .ok_or_else(|| StoreError::Malformed("Invalid confidence_score".to_string()))?;

    // Rows written before statuses were recorded are completed predictions.
    let status = match item.get("status") {
        None => PredictionStatus::Completed,
        Some(value) => value
            .as_s()
            .ok()
            .and_then(|s| PredictionStatus::from_str(s).ok())
            .ok_or_else(|| StoreError::Malformed("Invalid status".to_string()))?,
    };

    let created_at = DateTime::parse_from_rfc3339(string_attr(&item, "created_at")?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Malformed("Invalid created_at".to_string()))?;

    Ok(PredictionRecord {
        id,
        owner_id,
        image_ref,
        plant_category,
        predicted_label,
        confidence,
        status,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> PredictionRecord {
        PredictionRecord {
            id: Uuid::new_v4(),
            owner_id: OwnerId(Uuid::new_v4()),
            image_ref: ImageRef::from_bytes(b"leaf"),
            plant_category: PlantCategory::Potato,
            predicted_label: "Late Blight".into(),
            confidence: 0.91,
            status: PredictionStatus::Completed,
            created_at: Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
        }
    }

    #[test]
    fn test_item_uses_table_attribute_names() {
        let item = record_to_item(&record());
        assert_eq!(item["plant_type"].as_s().unwrap(), "potato");
        assert_eq!(item["predicted_disease"].as_s().unwrap(), "Late Blight");
        assert_eq!(item["confidence_score"].as_n().unwrap(), "0.91");
        assert_eq!(item["status"].as_s().unwrap(), "completed");
        assert_eq!(
            item["created_at"].as_s().unwrap(),
            "2023-11-14T22:13:20.123456789Z"
        );
    }

    #[test]
    fn test_item_converts_back_to_record() {
        let original = record();
        let parsed = item_to_record(record_to_item(&original)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_missing_attribute_is_malformed() {
        let mut item = record_to_item(&record());
        item.remove("user_id");
        assert!(matches!(item_to_record(item), Err(StoreError::Malformed(_))));

        let mut item = record_to_item(&record());
        item.insert("plant_type".into(), AttributeValue::S("cactus".into()));
        assert!(matches!(item_to_record(item), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_status_is_strict_when_present() {
        let mut item = record_to_item(&record());
        item.insert("status".into(), AttributeValue::S("done-ish".into()));
        assert!(matches!(item_to_record(item), Err(StoreError::Malformed(_))));

        let mut item = record_to_item(&record());
        item.insert("status".into(), AttributeValue::N("2".into()));
        assert!(matches!(item_to_record(item), Err(StoreError::Malformed(_))));

        let mut failed = record();
        failed.status = PredictionStatus::Failed;
        let parsed = item_to_record(record_to_item(&failed)).unwrap();
        assert_eq!(parsed.status, PredictionStatus::Failed);

        let mut item = record_to_item(&record());
        item.remove("status");
        assert_eq!(item_to_record(item).unwrap().status, PredictionStatus::Completed);
    }

    #[test]
    fn test_timestamps_sort_lexically_in_time_order() {
        let mut earlier = record();
        let mut later = record();
        earlier.created_at = Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap();
        later.created_at = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        let a = record_to_item(&earlier)["created_at"].as_s().unwrap().clone();
        let b = record_to_item(&later)["created_at"].as_s().unwrap().clone();
        assert!(a < b);
    }
}
