use std::{io::ErrorKind, path::PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::info;

use crate::{config::Config, error::AppError};

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Selfie storage on a local directory served under a public base URL.
#[derive(Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    base_url: String,
    max_bytes: usize,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>, max_bytes: usize) -> Self {
        PhotoStore {
            dir: dir.into(),
            base_url: base_url.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        PhotoStore::new(
            config.photo_dir.clone(),
            config.photo_base_url.clone(),
            config.max_photo_bytes,
        )
    }

    /// Route pattern the service answers for its own photo URLs. `None`
    /// when photos are published elsewhere, e.g. behind a CDN.
    pub fn route(&self) -> Option<String> {
        self.base_url
            .starts_with('/')
            .then(|| format!("{}/selfies/{{file}}", self.base_url))
    }

    /// Decodes a base64 JPEG, with or without a `data:` URL prefix.
    pub fn decode(&self, payload: &str) -> Result<Vec<u8>, AppError> {
        let encoded = payload
            .split_once(";base64,")
            .map_or(payload, |(_, data)| data)
            .trim();

        // base64 inflates by 4/3; reject before allocating for oversized input
        if encoded.len() / 4 * 3 > self.max_bytes + 3 {
            return Err(AppError::PhotoTooLarge(self.max_bytes));
        }

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| AppError::BadRequest("Selfie is not valid base64".into()))?;

        if bytes.len() > self.max_bytes {
            return Err(AppError::PhotoTooLarge(self.max_bytes));
        }
        if !bytes.starts_with(&JPEG_MAGIC) {
            return Err(AppError::BadRequest("Selfie must be a JPEG image".into()));
        }
        Ok(bytes)
    }

    /// Writes the image and returns its public URL.
    pub async fn save(&self, rfid_uid: &str, bytes: &[u8], taken_at_millis: i64) -> Result<String, AppError> {
        let file_name = format!("{}_{}.jpg", sanitize(rfid_uid), taken_at_millis);
        let dir = self.dir.join("selfies");

        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        info!(file = %file_name, size = bytes.len(), "Stored selfie");
        Ok(format!("{}/selfies/{}", self.base_url, file_name))
    }

    /// Reads back a file written by [`PhotoStore::save`]. Names that `save`
    /// could not have produced are treated as missing.
    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>, AppError> {
        let not_found = || AppError::NotFound("Photo not found".into());

        let stem = file_name.strip_suffix(".jpg").ok_or_else(not_found)?;
        if stem.is_empty() || sanitize(stem) != stem {
            return Err(not_found());
        }

        match tokio::fs::read(self.dir.join("selfies").join(file_name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }
}

fn sanitize(rfid_uid: &str) -> String {
    let cleaned: String = rfid_uid
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg() -> Vec<u8> {
        let mut bytes = JPEG_MAGIC.to_vec();
        bytes.extend_from_slice(b"not really a picture");
        bytes
    }

    #[test]
    fn decodes_data_url_and_raw_base64() {
        let store = PhotoStore::new("unused", "/photos", 1024);
        let encoded = STANDARD.encode(jpeg());

        assert_eq!(store.decode(&encoded).unwrap(), jpeg());
        assert_eq!(
            store.decode(&format!("data:image/jpeg;base64,{encoded}")).unwrap(),
            jpeg()
        );
    }

    #[test]
    fn rejects_non_jpeg_and_garbage() {
        let store = PhotoStore::new("unused", "/photos", 1024);
        assert!(matches!(
            store.decode(&STANDARD.encode(b"\x89PNG....")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(store.decode("***"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_oversized_images() {
        let store = PhotoStore::new("unused", "/photos", 8);
        let encoded = STANDARD.encode(jpeg());
        assert!(matches!(store.decode(&encoded), Err(AppError::PhotoTooLarge(8))));
    }

    #[test]
    fn sanitizes_file_prefix() {
        assert_eq!(sanitize("A1:B2/../x"), "A1B2x");
        assert_eq!(sanitize("../"), "unknown");
    }

    #[actix_web::test]
    async fn saves_under_selfies_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path(), "https://cdn.example/photos", 1024);

        let url = store.save("A1B2", &jpeg(), 1_760_600_000_000).await.unwrap();

        assert_eq!(url, "https://cdn.example/photos/selfies/A1B2_1760600000000.jpg");
        let written = std::fs::read(dir.path().join("selfies/A1B2_1760600000000.jpg")).unwrap();
        assert_eq!(written, jpeg());
    }

    #[actix_web::test]
    async fn reads_back_only_stored_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path(), "/photos", 1024);
        store.save("A1", &jpeg(), 7).await.unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"x").unwrap();

        assert_eq!(store.read("A1_7.jpg").await.unwrap(), jpeg());
        for name in ["A1_8.jpg", "../secret.txt", "..%2Fsecret.jpg", ".jpg", "A1_7.png"] {
            assert!(
                matches!(store.read(name).await, Err(AppError::NotFound(_))),
                "{name}"
            );
        }
    }

    #[test]
    fn local_base_url_gets_a_route() {
        assert_eq!(
            PhotoStore::new("p", "/photos", 1).route().as_deref(),
            Some("/photos/selfies/{file}")
        );
        assert!(PhotoStore::new("p", "https://cdn.example/photos", 1).route().is_none());
    }
}
