use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

/// Text burned into the bottom band of a selfie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OverlayCaption {
    #[schema(example = "Pimpri, Pune, Maharashtra")]
    pub location: String,
    #[schema(example = "16/10/2026, 09:04:12")]
    pub captured_at: String,
}

impl OverlayCaption {
    pub fn new(address: Option<&str>, captured_at: NaiveDateTime) -> Self {
        OverlayCaption {
            location: short_address(address),
            captured_at: captured_at.format("%d/%m/%Y, %H:%M:%S").to_string(),
        }
    }
}

/// First three comma-separated parts of a geocoded address.
fn short_address(address: Option<&str>) -> String {
    let parts: Vec<&str> = address
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(3)
        .collect();

    if parts.is_empty() {
        "Unknown location".to_string()
    } else {
        parts.join(", ")
    }
}
