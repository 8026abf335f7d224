use chrono::NaiveDate;
use sqlx::MySqlPool;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{LogChange, LogFeed, LogFilter};
use crate::{
    error::AppError,
    model::{
        attendance::{AttendanceLog, AttendanceLogRow},
        student::{Student, StudentCredentials},
    },
};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

const LOG_COLUMNS: &str = r#"
    id,
    student_name,
    rfid_uid,
    CAST(date_ AS CHAR) AS date_,
    CAST(time_in AS CHAR) AS time_in,
    CAST(time_out AS CHAR) AS time_out,
    photo_url,
    latitude,
    longitude,
    address
"#;

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    Date(NaiveDate),
    Str(&'a str),
}

/// Geotagged selfie to attach to a log.
#[derive(Debug, Clone)]
pub struct PhotoUpdate {
    pub photo_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

pub struct MySqlStore {
    pool: MySqlPool,
    changes: broadcast::Sender<LogChange>,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        MySqlStore { pool, changes }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn changes(&self) -> &broadcast::Sender<LogChange> {
        &self.changes
    }

    /// Fans a change out to live subscribers. Nobody listening is fine.
    pub fn publish(&self, change: LogChange) {
        if let Ok(n) = self.changes.send(change) {
            debug!(subscribers = n, "Published attendance change");
        }
    }

    pub async fn roster(&self) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, name, rfid_uid, email
            FROM students
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    pub async fn student(&self, id: u64) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT id, name, rfid_uid, email FROM students WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    pub async fn student_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StudentCredentials>, AppError> {
        let creds = sqlx::query_as::<_, StudentCredentials>(
            r#"
            SELECT id, name, rfid_uid, email, password_hash
            FROM students
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(creds)
    }

    /// Inserts a student. Duplicate email or RFID tag is a conflict.
    pub async fn enroll(
        &self,
        name: &str,
        rfid_uid: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO students (name, rfid_uid, email, password_hash)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(rfid_uid)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_id()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
                Err(AppError::Conflict("Student with this email or RFID already exists"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Sets the selfie on a log and returns the updated record.
    pub async fn attach_photo(
        &self,
        log_id: u64,
        photo: &PhotoUpdate,
    ) -> Result<Option<AttendanceLog>, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_logs
            SET photo_url = ?, latitude = ?, longitude = ?, address = ?
            WHERE id = ?
            "#,
        )
        .bind(&photo.photo_url)
        .bind(photo.latitude)
        .bind(photo.longitude)
        .bind(photo.address.as_deref())
        .bind(log_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let sql = format!("SELECT {LOG_COLUMNS} FROM attendance_logs WHERE id = ?");
        let row = sqlx::query_as::<_, AttendanceLogRow>(&sql)
            .bind(log_id)
            .fetch_optional(&self.pool)
            .await?;

        let log = row.and_then(|r| AttendanceLog::try_from(r).ok());
        if let Some(log) = &log {
            self.publish(LogChange::Upserted(log.clone()));
        }
        Ok(log)
    }
}

impl LogFeed for MySqlStore {
    async fn fetch(&self, filter: &LogFilter) -> Result<Vec<AttendanceLog>, AppError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(date) = filter.date {
            where_sql.push_str(" AND date_ = ?");
            args.push(FilterValue::Date(date));
        }
        if let Some(from) = filter.from {
            where_sql.push_str(" AND date_ >= ?");
            args.push(FilterValue::Date(from));
        }
        if let Some(to) = filter.to {
            where_sql.push_str(" AND date_ <= ?");
            args.push(FilterValue::Date(to));
        }
        if let Some(rfid) = filter.rfid_uid.as_deref() {
            where_sql.push_str(" AND rfid_uid = ?");
            args.push(FilterValue::Str(rfid));
        }

        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM attendance_logs{where_sql} ORDER BY date_ ASC, id ASC"
        );

        let mut query = sqlx::query_as::<_, AttendanceLogRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::Date(d) => query.bind(d),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        let total = rows.len();

        let logs: Vec<AttendanceLog> = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                AttendanceLog::try_from(row)
                    .inspect_err(|reason| warn!(log_id = id, %reason, "Skipping attendance log"))
                    .ok()
            })
            .collect();

        debug!(fetched = total, kept = logs.len(), ?filter, "Fetched attendance logs");
        Ok(logs)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<LogChange>> {
        Some(self.changes.subscribe())
    }
}
