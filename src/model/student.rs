use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Asha Patil",
        "rfid_uid": "A1B2C3D4",
        "email": "asha@college.edu"
    })
)]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Asha Patil")]
    pub name: String,

    #[schema(example = "A1B2C3D4")]
    pub rfid_uid: String,

    #[schema(example = "asha@college.edu")]
    pub email: String,
}

/// Student row including the password hash, used only for login.
#[derive(sqlx::FromRow)]
pub struct StudentCredentials {
    pub id: u64,
    pub name: String,
    pub rfid_uid: String,
    pub email: String,
    pub password_hash: String,
}
