use crate::{
    api::local_now,
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::attendance::AttendanceLog,
    selfie::{
        caption::OverlayCaption,
        overlay::burn_caption,
        window::{SelfieWindow, SelfieWindowState},
    },
    store::{
        LogFeed, LogFilter,
        mysql::{MySqlStore, PhotoUpdate},
        photos::PhotoStore,
    },
};
use actix_web::{HttpResponse, http::header, web};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelfieUpload {
    /// Base64 JPEG, optionally as a `data:image/jpeg;base64,` URL
    pub image: String,
    #[schema(example = 18.6298)]
    pub latitude: Option<f64>,
    #[schema(example = 73.7997)]
    pub longitude: Option<f64>,
    #[schema(example = "Pimpri, Pune, Maharashtra, 411018, India")]
    pub address: Option<String>,
}

impl SelfieUpload {
    fn validate_position(&self) -> Result<(), AppError> {
        let lat_ok = self.latitude.is_none_or(|v| (-90.0..=90.0).contains(&v));
        let lon_ok = self.longitude.is_none_or(|v| (-180.0..=180.0).contains(&v));
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(AppError::BadRequest("Coordinates out of range".into()))
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SelfieReceipt {
    #[schema(example = "/photos/selfies/A1B2C3D4_1792137852000.jpg")]
    pub photo_url: String,
    pub caption: OverlayCaption,
    pub log: AttendanceLog,
}

/// The log a selfie may attach to right now.
fn admit_selfie(
    today: Option<&AttendanceLog>,
    now: NaiveDateTime,
    window_secs: u32,
) -> Result<&AttendanceLog, AppError> {
    let log = today.ok_or_else(|| {
        AppError::NotFound("No matching attendance record found for today".into())
    })?;

    if SelfieWindow::for_log(Some(log), now, window_secs).is_open() {
        Ok(log)
    } else {
        Err(AppError::SelfieWindowClosed)
    }
}

async fn todays_log(
    store: &MySqlStore,
    rfid_uid: &str,
    now: NaiveDateTime,
) -> Result<Option<AttendanceLog>, AppError> {
    let logs = store
        .fetch(&LogFilter::on(now.date()).for_student(rfid_uid))
        .await?;
    Ok(logs.into_iter().next_back())
}

/// Selfie window for the logged-in student
#[utoipa::path(
    get,
    path = "/api/selfie/window",
    responses(
        (status = 200, description = "Whether a selfie may be taken now", body = SelfieWindowState),
        (status = 403, description = "Students only")
    ),
    security(("bearer_auth" = [])),
    tag = "Selfie"
)]
pub async fn window(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let (_, rfid_uid) = auth.require_student()?;
    let now = local_now();

    let today = todays_log(&store, rfid_uid, now).await?;
    let state = SelfieWindow::for_log(today.as_ref(), now, config.selfie_window_secs);

    Ok(HttpResponse::Ok().json(SelfieWindowState::from(state)))
}

/// Upload a geotagged selfie for today's check-in
#[utoipa::path(
    post,
    path = "/api/selfie",
    request_body = SelfieUpload,
    responses(
        (status = 200, description = "Selfie stored", body = SelfieReceipt),
        (status = 400, description = "Invalid image or coordinates"),
        (status = 403, description = "Selfie window is closed"),
        (status = 404, description = "No check-in today"),
        (status = 413, description = "Image too large")
    ),
    security(("bearer_auth" = [])),
    tag = "Selfie"
)]
#[instrument(name = "selfie_upload", skip_all, fields(rfid_uid = auth.rfid_uid.as_deref().unwrap_or_default()))]
pub async fn upload(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    photos: web::Data<PhotoStore>,
    config: web::Data<Config>,
    payload: web::Json<SelfieUpload>,
) -> Result<HttpResponse, AppError> {
    let (_, rfid_uid) = auth.require_student()?;
    payload.validate_position()?;
    let now = local_now();

    let today = todays_log(&store, rfid_uid, now).await?;
    let log = admit_selfie(today.as_ref(), now, config.selfie_window_secs)?;

    let bytes = photos.decode(&payload.image)?;
    let caption = OverlayCaption::new(payload.address.as_deref(), now);
    let stamped = {
        let caption = caption.clone();
        web::block(move || burn_caption(&bytes, &caption))
            .await
            .map_err(|e| AppError::Internal(format!("caption worker: {e}")))??
    };
    let photo_url = photos
        .save(rfid_uid, &stamped, Local::now().timestamp_millis())
        .await?;

    let update = PhotoUpdate {
        photo_url: photo_url.clone(),
        latitude: payload.latitude,
        longitude: payload.longitude,
        address: payload.address.clone(),
    };
    let log = store
        .attach_photo(log.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("No matching attendance record found for today".into()))?;

    info!(log_id = log.id, "Selfie attached");
    Ok(HttpResponse::Ok().json(SelfieReceipt {
        photo_url,
        caption,
        log,
    }))
}

/// Stored selfie image
#[utoipa::path(
    get,
    path = "/photos/selfies/{file}",
    params(("file" = String, Path, description = "File name from a `photo_url`")),
    responses(
        (status = 200, description = "JPEG image", content_type = "image/jpeg"),
        (status = 404, description = "Photo not found")
    ),
    tag = "Selfie"
)]
pub async fn photo(
    photos: web::Data<PhotoStore>,
    file: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let bytes = photos.read(&file).await?;

    Ok(HttpResponse::Ok()
        .content_type("image/jpeg")
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
