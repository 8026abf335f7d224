use crate::config::Config;
use crate::error::AppError;
use crate::{auth::jwt::verify_token, model::role::Role, models::TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub role: Role,

    /// Present only if this user is a student
    pub student_id: Option<u64>,
    pub rfid_uid: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already resolved by the auth middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(Self::from_headers(req))
    }
}

impl AuthUser {
    pub fn teacher(username: &str) -> Self {
        AuthUser {
            subject: username.to_string(),
            role: Role::Teacher,
            student_id: None,
            rfid_uid: None,
        }
    }

    pub fn student(id: u64, email: &str, rfid_uid: &str) -> Self {
        AuthUser {
            subject: email.to_string(),
            role: Role::Student,
            student_id: Some(id),
            rfid_uid: Some(rfid_uid.to_string()),
        }
    }

    fn from_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized("Missing token"))?;

        let config = req
            .app_data::<Data<Config>>()
            .ok_or_else(|| AppError::Internal("Config missing".into()))?;

        let claims = verify_token(token, &config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid token"))?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized("Invalid token"));
        }

        let role = Role::from_id(claims.role).ok_or(AppError::Unauthorized("Invalid role"))?;

        Ok(AuthUser {
            subject: claims.sub,
            role,
            student_id: claims.student_id,
            rfid_uid: claims.rfid_uid,
        })
    }

    pub fn require_teacher(&self) -> Result<(), AppError> {
        if self.role == Role::Teacher {
            Ok(())
        } else {
            Err(AppError::Forbidden("Teacher only"))
        }
    }

    /// Student id and RFID tag, or 403 for anyone else.
    pub fn require_student(&self) -> Result<(u64, &str), AppError> {
        match (self.role, self.student_id, self.rfid_uid.as_deref()) {
            (Role::Student, Some(id), Some(rfid)) => Ok((id, rfid)),
            _ => Err(AppError::Forbidden("No student profile")),
        }
    }
}
