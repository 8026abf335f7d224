use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Row as read from `attendance_logs`. Date and times are selected as text
/// because the hardware pipeline does not write them consistently.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceLogRow {
    pub id: u64,
    pub student_name: String,
    pub rfid_uid: String,
    pub date_: Option<String>,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub photo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "student_name": "Asha Patil",
    "rfid_uid": "A1B2C3D4",
    "date": "2026-10-16",
    "time_in": "09:00:00",
    "time_out": null,
    "photo_url": null,
    "latitude": null,
    "longitude": null,
    "address": null
}))]
pub struct AttendanceLog {
    pub id: u64,
    pub student_name: String,
    pub rfid_uid: String,
    pub date: NaiveDate,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub photo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

impl AttendanceLog {
    /// A log counts as attended once the badge was scanned in.
    pub fn is_present(&self) -> bool {
        self.time_in.is_some()
    }

    /// Full check-in timestamp, local to the day of the log.
    pub fn check_in_at(&self) -> Option<NaiveDateTime> {
        self.time_in.map(|t| self.date.and_time(t))
    }
}

impl TryFrom<AttendanceLogRow> for AttendanceLog {
    type Error = String;

    fn try_from(row: AttendanceLogRow) -> Result<Self, Self::Error> {
        let date = row
            .date_
            .as_deref()
            .map(str::trim)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| format!("unparsable date {:?}", row.date_))?;

        Ok(AttendanceLog {
            id: row.id,
            student_name: row.student_name,
            rfid_uid: row.rfid_uid,
            date,
            time_in: row.time_in.as_deref().and_then(parse_time_of_day),
            time_out: row.time_out.as_deref().and_then(parse_time_of_day),
            photo_url: row.photo_url.filter(|u| !u.is_empty()),
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
        })
    }
}

/// Accepts `HH:MM`, `HH:MM:SS`, fractional seconds, or a full ISO timestamp.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local().time());
        }
        return NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|dt| dt.time());
    }

    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}
