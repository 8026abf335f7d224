use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct StudentLoginDto {
    #[schema(example = "asha@college.edu")]
    pub email: String,
    #[schema(example = "secret")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TeacherLoginDto {
    #[schema(example = "teacher")]
    pub username: String,
    #[schema(example = "secret")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Student email or teacher username
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only for students
    pub student_id: Option<u64>,
    pub rfid_uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
