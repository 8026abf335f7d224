//! Server-side record of issued refresh tokens.

use std::future::Future;

use crate::{error::AppError, models::Claims, store::mysql::MySqlStore};

pub trait RefreshLedger: Send + Sync {
    fn record(&self, claims: &Claims) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Revokes `jti`. `true` only for the single call that flipped it, so
    /// two requests racing on one token cannot both rotate it.
    fn consume(&self, jti: &str) -> impl Future<Output = Result<bool, AppError>> + Send;
}

impl RefreshLedger for MySqlStore {
    async fn record(&self, claims: &Claims) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (subject, role_id, student_id, rfid_uid, jti, expires_at)
            VALUES (?, ?, ?, ?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(&claims.sub)
        .bind(claims.role)
        .bind(claims.student_id)
        .bind(claims.rfid_uid.as_deref())
        .bind(&claims.jti)
        .bind(claims.exp as i64)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn consume(&self, jti: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE")
                .bind(jti)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() == 1)
    }
}
