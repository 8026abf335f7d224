use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    auth::auth::AuthUser,
    models::{Claims, TokenType},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

fn claims_for(user: &AuthUser, token_type: TokenType, ttl: usize) -> Claims {
    Claims {
        sub: user.subject.clone(),
        role: user.role.id(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        student_id: user.student_id,
        rfid_uid: user.rfid_uid.clone(),
    }
}

pub fn generate_access_token(user: &AuthUser, secret: &str, ttl: usize) -> Result<String, Error> {
    let claims = claims_for(user, TokenType::Access, ttl);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_refresh_token(
    user: &AuthUser,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims_for(user, TokenType::Refresh, ttl);

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    #[test]
    fn refresh_claims_round_trip() {
        let user = AuthUser::student(3, "bela@college.edu", "B2");
        let (token, issued) = generate_refresh_token(&user, "s3cret", 60).unwrap();

        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.role, Role::Student.id());
        assert_eq!(claims.student_id, Some(3));
        assert_eq!(claims.rfid_uid.as_deref(), Some("B2"));
    }

    #[test]
    fn each_token_gets_a_fresh_jti() {
        let user = AuthUser::teacher("teacher");
        let (_, a) = generate_refresh_token(&user, "s3cret", 60).unwrap();
        let (_, b) = generate_refresh_token(&user, "s3cret", 60).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let token = generate_access_token(&AuthUser::teacher("teacher"), "s3cret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
