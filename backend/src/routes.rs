use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use shared::api::{CATEGORY_FIELD, CountResponse, ErrorResponse, HistoryQuery, IMAGE_FIELD};
use shared::model::is_image_media_type;
use shared::stats::STATS_WINDOW;
use shared::{
    AnalysisRequest, ClassifyError, Classifier, ImageSelection, NewPrediction, PlantCategory,
    RecordStore, StatsSnapshot, StoreError,
};

use crate::auth::middleware::AuthenticatedUser;
use crate::auth::routes::me;

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_image_bytes: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    configure_api(cfg);
    cfg.service(Files::new("/static", frontend_dir).index_file("index.html"));
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/classify").route(web::post().to(classify)))
        .service(
            web::resource("/api/predictions")
                .route(web::post().to(create_prediction))
                .route(web::get().to(list_predictions)),
        )
        .service(web::resource("/api/predictions/count").route(web::get().to(count_predictions)))
        .service(web::resource("/api/stats").route(web::get().to(get_stats)))
        .service(web::resource("/auth/me").route(web::get().to(me)));
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new(message))
}

fn classify_error_response(err: &ClassifyError) -> HttpResponse {
    error!("Classification failed: {}", err);
    let body = ErrorResponse::new(err.to_string());
    match err {
        ClassifyError::Unavailable(_) => HttpResponse::ServiceUnavailable().json(body),
        ClassifyError::Rejected(_) => HttpResponse::UnprocessableEntity().json(body),
        ClassifyError::InvalidConfidence(_) => HttpResponse::BadGateway().json(body),
    }
}

fn store_error_response(err: &StoreError) -> HttpResponse {
    let body = ErrorResponse::new(err.to_string());
    match err {
        StoreError::Constraint(_) => {
            warn!("Rejected prediction record: {}", err);
            HttpResponse::BadRequest().json(body)
        }
        StoreError::Unauthorized => {
            error!("Record store refused access: {}", err);
            HttpResponse::Forbidden().json(body)
        }
        StoreError::Unavailable(_) => {
            error!("Record store unavailable: {}", err);
            HttpResponse::ServiceUnavailable().json(body)
        }
        StoreError::Malformed(_) => {
            error!("Record store returned malformed data: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

async fn classify(
    user: AuthenticatedUser,
    classifier: web::Data<dyn Classifier>,
    limits: web::Data<UploadLimits>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut image: Option<ImageSelection> = None;
    let mut category: Option<PlantCategory> = None;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let media_type = field
                .content_type()
                .map(|mime| mime.essence_str().to_string())
                .unwrap_or_default();
            if !is_image_media_type(&media_type) {
                return Ok(bad_request(format!("Unsupported media type '{}'", media_type)));
            }
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .unwrap_or("upload")
                .to_string();

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let data = chunk?;
                if bytes.len() + data.len() > limits.max_image_bytes {
                    warn!(
                        "Upload from {} exceeds {} bytes",
                        user.0.id, limits.max_image_bytes
                    );
                    return Ok(HttpResponse::PayloadTooLarge().json(ErrorResponse::new(format!(
                        "Image exceeds {} bytes",
                        limits.max_image_bytes
                    ))));
                }
                bytes.extend_from_slice(&data);
            }
            image = Some(ImageSelection::new(file_name, media_type, bytes));
        } else if name == CATEGORY_FIELD {
            let mut raw = Vec::new();
            while let Some(chunk) = field.next().await {
                raw.extend_from_slice(&chunk?);
            }
            category = PlantCategory::from_hint(&String::from_utf8_lossy(&raw));
        } else {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
        }
    }

    let Some(image) = image else {
        return Ok(bad_request("Missing image field"));
    };
    if image.bytes.is_empty() {
        return Ok(bad_request("Image is empty"));
    }
    let Some(category) = category else {
        return Ok(bad_request("Missing plant_category field"));
    };

    info!(
        "Classifying {} ({}) as {} for user {}",
        image.file_name,
        image.size_label(),
        category,
        user.0.id
    );

    let request = AnalysisRequest {
        image: &image,
        category,
    };
    match classifier.classify(&request).await {
        Ok(result) if result.has_valid_confidence() => Ok(HttpResponse::Ok().json(result)),
        Ok(result) => Ok(classify_error_response(&ClassifyError::InvalidConfidence(
            result.confidence,
        ))),
        Err(e) => Ok(classify_error_response(&e)),
    }
}

async fn create_prediction(
    user: AuthenticatedUser,
    store: web::Data<dyn RecordStore>,
    body: web::Json<NewPrediction>,
) -> HttpResponse {
    let new = body.into_inner().owned_by(user.0.owner_id());
    match store.insert(new).await {
        Ok(record) => {
            info!("Created prediction {} for user {}", record.id, record.owner_id);
            HttpResponse::Created().json(record)
        }
        Err(e) => store_error_response(&e),
    }
}

async fn list_predictions(
    user: AuthenticatedUser,
    store: web::Data<dyn RecordStore>,
    query: web::Query<HistoryQuery>,
) -> HttpResponse {
    match store
        .list_by_owner(user.0.owner_id(), query.effective_limit())
        .await
    {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => store_error_response(&e),
    }
}

async fn count_predictions(
    user: AuthenticatedUser,
    store: web::Data<dyn RecordStore>,
) -> HttpResponse {
    match store.count_by_owner(user.0.owner_id()).await {
        Ok(count) => HttpResponse::Ok().json(CountResponse { count }),
        Err(e) => store_error_response(&e),
    }
}

async fn get_stats(user: AuthenticatedUser, store: web::Data<dyn RecordStore>) -> HttpResponse {
    let owner = user.0.owner_id();
    let total = match store.count_by_owner(owner).await {
        Ok(total) => total,
        Err(e) => return store_error_response(&e),
    };
    match store.list_by_owner(owner, STATS_WINDOW).await {
        Ok(recent) => HttpResponse::Ok().json(StatsSnapshot::compute(total, &recent)),
        Err(e) => store_error_response(&e),
    }
}
