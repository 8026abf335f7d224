use crate::{
    analytics::aggregate::{AttendanceSummary, month_bounds, summarize},
    api::{date_or_today, local_now},
    auth::auth::AuthUser,
    error::AppError,
    model::attendance::AttendanceLog,
    report::daily_sheet,
    store::{LogFeed, LogFilter, mysql::MySqlStore},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const RECENT_LOGS: usize = 5;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// `YYYY-MM-DD`, defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Single day, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Inclusive start, `YYYY-MM-DD`
    pub from: Option<String>,
    /// Inclusive end, `YYYY-MM-DD`
    pub to: Option<String>,
    pub rfid_uid: Option<String>,
}

impl LogQuery {
    fn to_filter(&self) -> Result<LogFilter, AppError> {
        fn day(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
            match raw.map(str::trim).filter(|s| !s.is_empty()) {
                None => Ok(None),
                Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|_| AppError::BadRequest(format!("Invalid date '{s}'"))),
            }
        }

        let filter = LogFilter {
            date: day(self.date.as_deref())?,
            from: day(self.from.as_deref())?,
            to: day(self.to.as_deref())?,
            rfid_uid: self
                .rfid_uid
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        if matches!((filter.from, filter.to), (Some(from), Some(to)) if from > to) {
            return Err(AppError::BadRequest("'from' must not be after 'to'".into()));
        }
        Ok(filter)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogListResponse {
    pub data: Vec<AttendanceLog>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyAttendance {
    pub today: Option<AttendanceLog>,
    /// Current calendar month.
    pub month: AttendanceSummary,
    /// Most recent first.
    pub recent: Vec<AttendanceLog>,
}

impl MyAttendance {
    /// Builds the dashboard view from one student's logs for the month.
    fn from_month(logs: Vec<AttendanceLog>, today: NaiveDate) -> Self {
        let month = summarize(&logs);
        let today_log = logs.iter().find(|l| l.date == today).cloned();
        let recent = logs.into_iter().rev().take(RECENT_LOGS).collect();

        MyAttendance {
            today: today_log,
            month,
            recent,
        }
    }
}

/// Daily attendance table for the whole class
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(DateQuery),
    responses(
        (status = 200, description = "One row per enrolled student", body = crate::report::DailyReport),
        (status = 400, description = "Invalid date"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn daily_table(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let date = date_or_today(query.date.as_deref())?;

    let students = store.roster().await?;
    let logs = store.fetch(&LogFilter::on(date)).await?;

    Ok(HttpResponse::Ok().json(daily_sheet(&students, &logs, date)))
}

/// Raw attendance logs
#[utoipa::path(
    get,
    path = "/api/attendance/logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Logs ordered by date", body = LogListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_logs(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<LogQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let filter = query.to_filter()?;

    let data = store.fetch(&filter).await?;
    Ok(HttpResponse::Ok().json(LogListResponse {
        total: data.len(),
        data,
    }))
}

/// The logged-in student's attendance
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    responses(
        (status = 200, description = "Today's log, month summary and recent logs", body = MyAttendance),
        (status = 403, description = "Students only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
) -> Result<HttpResponse, AppError> {
    let (_, rfid_uid) = auth.require_student()?;
    let today = local_now().date();
    let (first, last) = month_bounds(today);

    let logs = store
        .fetch(&LogFilter::between(first, last).for_student(rfid_uid))
        .await?;

    Ok(HttpResponse::Ok().json(MyAttendance::from_month(logs, today)))
}
