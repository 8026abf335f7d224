use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::AppError,
    model::student::Student,
    store::mysql::MySqlStore,
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollStudent {
    #[schema(example = "Asha Patil")]
    pub name: String,
    #[schema(example = "A1B2C3D4")]
    pub rfid_uid: String,
    #[schema(example = "asha@college.edu")]
    pub email: String,
    #[schema(example = "changeme")]
    pub password: String,
}

impl EnrollStudent {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.rfid_uid.trim().is_empty() {
            return Err(AppError::BadRequest("Name and RFID tag are required".into()));
        }
        if !self.email.contains('@') {
            return Err(AppError::BadRequest("A valid email is required".into()));
        }
        if self.password.len() < 6 {
            return Err(AppError::BadRequest(
                "Password must be at least 6 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentListResponse {
    pub data: Vec<Student>,
    pub total: usize,
}

/// List the class roster
#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "Roster ordered by name", body = StudentListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn list_students(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;

    let data = store.roster().await?;
    Ok(HttpResponse::Ok().json(StudentListResponse {
        total: data.len(),
        data,
    }))
}

/// Enroll a student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = EnrollStudent,
    responses(
        (status = 201, description = "Student enrolled", body = Object, example = json!({
            "id": 7
        })),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Teachers only"),
        (status = 409, description = "Email or RFID tag already enrolled")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn enroll_student(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<EnrollStudent>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    payload.validate()?;

    let password_hash = hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("password hash: {e}")))?;

    let id = store
        .enroll(
            payload.name.trim(),
            payload.rfid_uid.trim(),
            payload.email.trim(),
            &password_hash,
        )
        .await?;

    info!(student_id = id, rfid_uid = %payload.rfid_uid.trim(), "Student enrolled");
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id })))
}

/// The logged-in student's profile
#[utoipa::path(
    get,
    path = "/api/students/me",
    responses(
        (status = 200, description = "Profile", body = Student),
        (status = 403, description = "Students only"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn me(auth: AuthUser, store: web::Data<MySqlStore>) -> Result<HttpResponse, AppError> {
    let (student_id, _) = auth.require_student()?;

    let student = store
        .student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".into()))?;

    Ok(HttpResponse::Ok().json(student))
}
