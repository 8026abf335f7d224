use crate::{
    analytics::aggregate::{MonthlyStat, Period, month_bounds, student_monthly},
    api::{analytics::MonthQuery, attendance::DateQuery, date_or_today, month_or_current},
    auth::auth::AuthUser,
    error::AppError,
    report::{
        daily_report, defaulter_report,
        export::{ExportFormat, Tabular, to_pdf, to_xlsx},
        monthly_report,
    },
    store::{LogFeed, LogFilter, mysql::MySqlStore},
};
use actix_web::{
    HttpResponse,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `json` (default), `xlsx` or `pdf`
    #[serde(default)]
    pub format: ExportFormat,
}

/// JSON body, or a downloadable file named after the report.
fn respond<R: Tabular + Serialize>(report: &R, format: ExportFormat) -> Result<HttpResponse, AppError> {
    let body = match format {
        ExportFormat::Json => return Ok(HttpResponse::Ok().json(report)),
        ExportFormat::Xlsx => to_xlsx(report)?,
        ExportFormat::Pdf => to_pdf(report)?,
    };

    let file_name = format!("{}.{}", report.file_stem(), format);
    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(body))
}

async fn month_stats(
    store: &MySqlStore,
    month: NaiveDate,
) -> Result<Vec<MonthlyStat>, AppError> {
    let (first, last) = month_bounds(month);
    let logs = store.fetch(&LogFilter::between(first, last)).await?;
    Ok(student_monthly(&logs, month))
}

/// Daily attendance report
#[utoipa::path(
    get,
    path = "/api/reports/daily",
    operation_id = "report_daily",
    params(DateQuery, ExportQuery),
    responses(
        (status = 200, description = "Report rows for the day, or a file when `format` is xlsx or pdf", body = crate::report::DailyReport),
        (status = 404, description = "No student data available"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn daily(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<DateQuery>,
    export: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let date = date_or_today(query.date.as_deref())?;

    let students = store.roster().await?;
    let logs = store.fetch(&LogFilter::on(date)).await?;
    let report = daily_report(&students, &logs, date)?;

    info!(
        file = %report.file_stem,
        rows = report.rows.len(),
        checked_in = report.summary.checked_in(),
        format = %export.format,
        "Daily report built"
    );
    respond(&report, export.format)
}

/// Monthly attendance report
#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    operation_id = "report_monthly",
    params(MonthQuery, ExportQuery),
    responses(
        (status = 200, description = "Per-student rows for the month, or a file when `format` is xlsx or pdf", body = crate::report::MonthlyReport),
        (status = 404, description = "No monthly data to export"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn monthly(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<MonthQuery>,
    export: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let month = month_or_current(query.month.as_deref())?;

    let stats = month_stats(&store, month).await?;
    let report = monthly_report(&stats, &Period::Month.key(month))?;

    info!(file = %report.file_stem, rows = report.rows.len(), format = %export.format, "Monthly report built");
    respond(&report, export.format)
}

/// Defaulter list, students below 75%
#[utoipa::path(
    get,
    path = "/api/reports/defaulters",
    operation_id = "report_defaulters",
    params(MonthQuery, ExportQuery),
    responses(
        (status = 200, description = "Students below the attendance threshold, or a file when `format` is xlsx or pdf", body = crate::report::DefaulterReport),
        (status = 404, description = "No defaulters found"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn defaulters(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<MonthQuery>,
    export: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let month = month_or_current(query.month.as_deref())?;

    let stats = month_stats(&store, month).await?;
    let report = defaulter_report(&stats, &Period::Month.key(month))?;

    info!(file = %report.file_stem, rows = report.rows.len(), format = %export.format, "Defaulter report built");
    respond(&report, export.format)
}
