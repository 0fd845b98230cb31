use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use gloo_storage::{LocalStorage, Storage};
use shared::api::{CATEGORY_FIELD, CountResponse, ErrorResponse, IMAGE_FIELD, UserInfo};
use shared::{
    AnalysisRequest, AnalysisResult, AuthSession, ClassifyError, Classifier, CurrentUser,
    NewPrediction, OwnerId, PredictionRecord, RecordStore, StoreError,
};
use wasm_bindgen::JsValue;

pub const TOKEN_KEY: &str = "auth_token";

pub fn stored_token() -> Option<String> {
    LocalStorage::get::<String>(TOKEN_KEY)
        .ok()
        .filter(|t| !t.is_empty())
}

pub fn clear_token() {
    LocalStorage::delete(TOKEN_KEY);
}

/// The identity provider redirects back with `?token=...`. Moves it into
/// local storage and strips it from the address bar.
pub fn capture_token_from_url() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let location = window.location();
    let Ok(search) = location.search() else {
        return;
    };
    let Ok(params) = web_sys::UrlSearchParams::new_with_str(&search) else {
        return;
    };
    let Some(token) = params.get("token") else {
        return;
    };

    if let Err(e) = LocalStorage::set(TOKEN_KEY, &token) {
        log::error!("Failed to store auth token: {:?}", e);
        return;
    }
    log::info!("Auth token captured from redirect (length: {})", token.len());

    if let Ok(history) = window.history() {
        let path = location.pathname().unwrap_or_else(|_| "/".to_string());
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&path));
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => format!("{} - {}", status, body.error),
        Err(_) => format!("Server error: {}", status),
    }
}

pub async fn fetch_user_info(token: &str) -> Result<UserInfo, String> {
    let response = Request::get("/auth/me")
        .header("Authorization", &bearer(token))
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if !response.ok() {
        let message = error_message(response).await;
        log::warn!("/auth/me failed: {}", message);
        return Err(message);
    }
    response
        .json::<UserInfo>()
        .await
        .map_err(|e| format!("Failed to parse user info: {}", e))
}

/// Session backed by the bearer token in local storage.
pub struct TokenSession;

#[async_trait(?Send)]
impl AuthSession for TokenSession {
    async fn current_user(&self) -> Option<CurrentUser> {
        let token = stored_token()?;
        match fetch_user_info(&token).await {
            Ok(info) => Some(CurrentUser { id: info.id }),
            Err(e) => {
                log::warn!("Session is not authenticated: {}", e);
                None
            }
        }
    }
}

/// Posts the image to the backend classifier service.
pub struct HttpClassifier;

#[async_trait(?Send)]
impl Classifier for HttpClassifier {
    async fn classify(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisResult, ClassifyError> {
        let token = stored_token().ok_or_else(|| ClassifyError::Rejected("not signed in".into()))?;

        let form_data = web_sys::FormData::new()
            .map_err(|e| ClassifyError::Unavailable(format!("{:?}", e)))?;
        form_data
            .append_with_str(CATEGORY_FIELD, request.category.as_ref())
            .map_err(|e| ClassifyError::Unavailable(format!("{:?}", e)))?;
        let blob = gloo_file::Blob::new_with_options(
            request.image.bytes.as_slice(),
            Some(request.image.media_type.as_str()),
        );
        form_data
            .append_with_blob_and_filename(IMAGE_FIELD, blob.as_ref(), &request.image.file_name)
            .map_err(|e| ClassifyError::Unavailable(format!("{:?}", e)))?;

        let response = Request::post("/api/classify")
            .header("Authorization", &bearer(&token))
            .body(form_data)
            .map_err(|e| ClassifyError::Unavailable(e.to_string()))?
            .send()
            .await
            .map_err(|e| ClassifyError::Unavailable(format!("Network error: {}", e)))?;

        match response.status() {
            200 => response
                .json::<AnalysisResult>()
                .await
                .map_err(|e| ClassifyError::Unavailable(format!("Failed to parse response: {}", e))),
            400 | 401 | 413 | 422 => Err(ClassifyError::Rejected(error_message(response).await)),
            _ => Err(ClassifyError::Unavailable(error_message(response).await)),
        }
    }
}

/// Record store reached through the backend API. The owner is implied by the
/// bearer token; the `owner` arguments are only used for logging.
pub struct HttpRecordStore;

impl HttpRecordStore {
    fn token() -> Result<String, StoreError> {
        stored_token().ok_or(StoreError::Unauthorized)
    }

    async fn store_error(response: Response) -> StoreError {
        let status = response.status();
        let message = error_message(response).await;
        match status {
            400 => StoreError::Constraint(message),
            401 | 403 => StoreError::Unauthorized,
            _ => StoreError::Unavailable(message),
        }
    }
}

#[async_trait(?Send)]
impl RecordStore for HttpRecordStore {
    async fn insert(&self, record: NewPrediction) -> Result<PredictionRecord, StoreError> {
        let response = Request::post("/api/predictions")
            .header("Authorization", &bearer(&Self::token()?))
            .json(&record)
            .map_err(|e| StoreError::Malformed(e.to_string()))?
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Network error: {}", e)))?;

        if !response.ok() {
            return Err(Self::store_error(response).await);
        }
        response
            .json::<PredictionRecord>()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn list_by_owner(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StoreError> {
        log::debug!("Fetching {} predictions for {}", limit, owner);
        let response = Request::get("/api/predictions")
            .query([("limit", limit.to_string())])
            .header("Authorization", &bearer(&Self::token()?))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Network error: {}", e)))?;

        if !response.ok() {
            return Err(Self::store_error(response).await);
        }
        response
            .json::<Vec<PredictionRecord>>()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn count_by_owner(&self, owner: OwnerId) -> Result<u64, StoreError> {
        log::debug!("Counting predictions for {}", owner);
        let response = Request::get("/api/predictions/count")
            .header("Authorization", &bearer(&Self::token()?))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Network error: {}", e)))?;

        if !response.ok() {
            return Err(Self::store_error(response).await);
        }
        response
            .json::<CountResponse>()
            .await
            .map(|body| body.count)
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }
}
