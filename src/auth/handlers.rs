use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        ledger::RefreshLedger,
        password::verify_password,
    },
    config::Config,
    error::AppError,
    model::role::Role,
    models::{LoginResponse, StudentLoginDto, TeacherLoginDto, TokenType},
    store::mysql::MySqlStore,
};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, error, info, instrument};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access/refresh pair and records the refresh token id.
async fn issue_tokens<L: RefreshLedger>(
    user: &AuthUser,
    ledger: &L,
    config: &Config,
) -> Result<LoginResponse, AppError> {
    let access_token = generate_access_token(user, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| AppError::Internal(format!("access token: {e}")))?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| AppError::Internal(format!("refresh token: {e}")))?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    ledger.record(&refresh_claims).await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Trades a live refresh token for a new pair. The old token is revoked
/// in the same statement that checks it.
async fn rotate<L: RefreshLedger>(
    ledger: &L,
    token: &str,
    config: &Config,
) -> Result<LoginResponse, AppError> {
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Invalid token"));
    }

    if !ledger.consume(&claims.jti).await? {
        info!(jti = %claims.jti, "Refresh token reused or unknown");
        return Err(AppError::Unauthorized("Refresh token revoked"));
    }

    let role = Role::from_id(claims.role).ok_or(AppError::Unauthorized("Invalid role"))?;
    let user = AuthUser {
        subject: claims.sub,
        role,
        student_id: claims.student_id,
        rfid_uid: claims.rfid_uid,
    };

    issue_tokens(&user, ledger, config).await
}

/// Compares every byte instead of stopping at the first mismatch.
fn same_secret(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn teacher_credentials_match(config: &Config, login: &TeacherLoginDto) -> bool {
    same_secret(login.username.trim(), &config.teacher_username)
        & same_secret(&login.password, &config.teacher_password)
}

/// Student login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = StudentLoginDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "student_login", skip(store, config, login), fields(email = %login.email))]
pub async fn student_login(
    login: web::Json<StudentLoginDto>,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let email = login.email.trim();
    if email.is_empty() || login.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let Some(student) = store.student_credentials(email).await? else {
        info!("Invalid credentials: student not found");
        return Err(AppError::Unauthorized("Invalid credentials"));
    };

    if let Err(e) = verify_password(&login.password, &student.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    let user = AuthUser::student(student.id, &student.email, &student.rfid_uid);
    let tokens = issue_tokens(&user, store.get_ref(), &config).await?;

    info!(student_id = student.id, name = %student.name, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Teacher login against the configured account
#[utoipa::path(
    post,
    path = "/auth/teacher/login",
    request_body = TeacherLoginDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    ),
    tag = "Auth"
)]
#[instrument(name = "teacher_login", skip(store, config, login), fields(username = %login.username))]
pub async fn teacher_login(
    login: web::Json<TeacherLoginDto>,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    if !teacher_credentials_match(&config, &login) {
        info!("Invalid teacher credentials");
        return Err(AppError::Unauthorized("Invalid username or password"));
    }

    let user = AuthUser::teacher(&config.teacher_username);
    let tokens = issue_tokens(&user, store.get_ref(), &config).await?;

    info!("Teacher login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Rotates a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = bearer(&req).ok_or(AppError::Unauthorized("No token"))?;
    let tokens = rotate(store.get_ref(), token, &config).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes a refresh token. Always 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    store: web::Data<MySqlStore>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(claims) = bearer(&req).and_then(|t| verify_token(t, &config.jwt_secret).ok()) else {
        return HttpResponse::NoContent().finish();
    };

    // Only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = store.consume(&claims.jti).await {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ledger::memory::MemoryLedger;
    use futures::future::join;

    fn login(username: &str, password: &str) -> TeacherLoginDto {
        TeacherLoginDto {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn teacher_credentials_must_both_match() {
        let config = Config::for_tests();
        assert!(teacher_credentials_match(&config, &login("teacher", "pass")));
        assert!(teacher_credentials_match(&config, &login(" teacher ", "pass")));
        assert!(!teacher_credentials_match(&config, &login("teacher", "pas")));
        assert!(!teacher_credentials_match(&config, &login("student", "pass")));
        assert!(!teacher_credentials_match(&config, &login("", "")));
    }

    #[test]
    fn secret_comparison() {
        assert!(same_secret("abc", "abc"));
        assert!(!same_secret("abc", "abd"));
        assert!(!same_secret("abc", "abcd"));
    }

    #[test]
    fn bearer_header_parsing() {
        let req = actix_web::test::TestRequest::default()
            .insert_header(("Authorization", "Bearer xyz"))
            .to_http_request();
        assert_eq!(bearer(&req), Some("xyz"));

        let req = actix_web::test::TestRequest::default()
            .insert_header(("Authorization", "Basic xyz"))
            .to_http_request();
        assert_eq!(bearer(&req), None);
    }

    #[actix_web::test]
    async fn rotation_revokes_the_old_token() {
        let config = Config::for_tests();
        let ledger = MemoryLedger::default();
        let first = issue_tokens(&AuthUser::student(3, "bela@college.edu", "B2"), &ledger, &config)
            .await
            .unwrap();

        let second = rotate(&ledger, &first.refresh_token, &config).await.unwrap();
        let reused = rotate(&ledger, &first.refresh_token, &config).await;
        assert!(matches!(reused, Err(AppError::Unauthorized("Refresh token revoked"))));

        let claims = verify_token(&second.refresh_token, &config.jwt_secret).unwrap();
        assert_eq!(claims.rfid_uid.as_deref(), Some("B2"));
        assert!(rotate(&ledger, &second.refresh_token, &config).await.is_ok());
    }

    #[actix_web::test]
    async fn racing_rotations_yield_one_pair() {
        let config = Config::for_tests();
        let ledger = MemoryLedger::default();
        let issued = issue_tokens(&AuthUser::teacher("teacher"), &ledger, &config)
            .await
            .unwrap();

        let (a, b) = join(
            rotate(&ledger, &issued.refresh_token, &config),
            rotate(&ledger, &issued.refresh_token, &config),
        )
        .await;
        assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    }

    #[actix_web::test]
    async fn access_and_unknown_tokens_cannot_rotate() {
        let config = Config::for_tests();
        let ledger = MemoryLedger::default();
        let user = AuthUser::teacher("teacher");

        let access = generate_access_token(&user, &config.jwt_secret, 60).unwrap();
        assert!(matches!(
            rotate(&ledger, &access, &config).await,
            Err(AppError::Unauthorized("Invalid token"))
        ));

        // signed but never recorded
        let (stray, _) = generate_refresh_token(&user, &config.jwt_secret, 60).unwrap();
        assert!(matches!(
            rotate(&ledger, &stray, &config).await,
            Err(AppError::Unauthorized("Refresh token revoked"))
        ));
    }
}
