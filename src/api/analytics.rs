use crate::{
    analytics::{
        aggregate::{
            MonthlyStat, Period, PeriodStats, RosterCoverage, aggregate, month_bounds,
            student_monthly,
        },
        classify::{Classification, Tier, TierSummary, classify},
    },
    api::month_or_current,
    auth::auth::AuthUser,
    error::AppError,
    model::attendance::AttendanceLog,
    store::{LogFeed, LogFilter, mysql::MySqlStore},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyOverview {
    #[serde(flatten)]
    pub stats: PeriodStats,
    pub coverage: RosterCoverage,
}

/// One slice of the tier pie chart.
#[derive(Debug, Serialize, ToSchema)]
pub struct TierSlice {
    #[schema(example = "<75%")]
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentBreakdown {
    #[schema(example = "2026-10")]
    pub month: String,
    pub students: Vec<MonthlyStat>,
    pub tiers: Classification,
    pub summary: TierSummary,
    /// Students evaluated, equal to the sum of the tiers.
    pub evaluated: u32,
    pub chart: Vec<TierSlice>,
}

pub fn monthly_overview(logs: &[AttendanceLog], roster_size: u32) -> Vec<MonthlyOverview> {
    aggregate(logs, Period::Month)
        .into_iter()
        .map(|stats| MonthlyOverview {
            coverage: stats.against_roster(roster_size),
            stats,
        })
        .collect()
}

pub fn student_breakdown(logs: &[AttendanceLog], month: NaiveDate) -> StudentBreakdown {
    let students = student_monthly(logs, month);
    let tiers = classify(&students);
    let summary = tiers.summary();
    let chart = [
        (Tier::Defaulter, summary.defaulters),
        (Tier::MidRange, summary.mid_range),
        (Tier::Excellent, summary.excellent),
    ]
    .into_iter()
    .map(|(tier, value)| TierSlice {
        name: tier.to_string(),
        value,
    })
    .collect();

    StudentBreakdown {
        month: Period::Month.key(month),
        students,
        tiers,
        evaluated: summary.total(),
        summary,
        chart,
    }
}

/// Class stats for each lecture day in the month containing `month`.
pub fn daily_trend(logs: &[AttendanceLog], month: NaiveDate) -> Vec<PeriodStats> {
    let key = Period::Month.key(month);
    aggregate(logs, Period::Day)
        .into_iter()
        .filter(|day| day.period.starts_with(&key))
        .collect()
}

/// Class attendance per month
#[utoipa::path(
    get,
    path = "/api/analytics/monthly",
    operation_id = "analytics_monthly",
    responses(
        (status = 200, description = "Per-month class stats, oldest first", body = [MonthlyOverview]),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn monthly(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;

    let logs = store.fetch(&LogFilter::default()).await?;
    let roster_size = store.roster().await?.len() as u32;

    Ok(HttpResponse::Ok().json(monthly_overview(&logs, roster_size)))
}

/// Class attendance per day of one month
#[utoipa::path(
    get,
    path = "/api/analytics/daily",
    operation_id = "analytics_daily",
    params(MonthQuery),
    responses(
        (status = 200, description = "Per-day class stats, oldest first", body = [PeriodStats]),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn daily(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let month = month_or_current(query.month.as_deref())?;
    let (first, last) = month_bounds(month);

    let logs = store.fetch(&LogFilter::between(first, last)).await?;
    Ok(HttpResponse::Ok().json(daily_trend(&logs, month)))
}

/// Per-student stats and tiers for one month
#[utoipa::path(
    get,
    path = "/api/analytics/students",
    operation_id = "analytics_students",
    params(MonthQuery),
    responses(
        (status = 200, description = "Student stats for the month", body = StudentBreakdown),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn students(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let month = month_or_current(query.month.as_deref())?;
    let (first, last) = month_bounds(month);

    let logs = store.fetch(&LogFilter::between(first, last)).await?;
    Ok(HttpResponse::Ok().json(student_breakdown(&logs, month)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{memory::MemoryFeed, sample_log};

    fn october() -> Vec<AttendanceLog> {
        vec![
            sample_log(1, "A1", "2026-10-14", Some("09:00")),
            sample_log(2, "A1", "2026-10-15", Some("09:00")),
            sample_log(3, "A1", "2026-10-16", None),
            sample_log(4, "B2", "2026-10-14", Some("09:05")),
            sample_log(5, "B2", "2026-10-15", Some("09:05")),
            sample_log(6, "B2", "2026-10-16", Some("09:05")),
            sample_log(7, "C3", "2026-09-30", Some("09:05")),
        ]
    }

    #[test]
    fn overview_pairs_stats_with_roster_coverage() {
        let rows = monthly_overview(&october(), 3);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stats.period, "2026-09");
        let oct = &rows[1];
        assert_eq!(oct.stats.lectures, 3);
        assert_eq!(oct.stats.present, 5);
        assert_eq!(oct.coverage.possible, 9);
        assert_eq!(oct.coverage.absent, 4);
        assert_eq!(oct.coverage.percentage, 55.6);

        let json = serde_json::to_value(oct).unwrap();
        assert_eq!(json["period"], "2026-10");
        assert_eq!(json["coverage"]["possible"], 9);
    }

    #[test]
    fn breakdown_buckets_students_for_the_chart() {
        let month = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let breakdown = student_breakdown(&october(), month);

        assert_eq!(breakdown.month, "2026-10");
        assert_eq!(breakdown.students.len(), 2);
        assert_eq!(breakdown.summary.defaulters, 1);
        assert_eq!(breakdown.summary.excellent, 1);
        assert_eq!(breakdown.evaluated, 2);
        assert_eq!(breakdown.tiers.defaulters[0].percentage, 67);

        let names: Vec<_> = breakdown.chart.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["<75%", "75-90%", "91-100%"]);
    }

    #[test]
    fn daily_trend_keeps_only_the_month() {
        let month = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let days = daily_trend(&october(), month);

        let keys: Vec<_> = days.iter().map(|d| d.period.as_str()).collect();
        assert_eq!(keys, ["2026-10-14", "2026-10-15", "2026-10-16"]);
        assert_eq!(days[2].present, 1);
        assert_eq!(days[2].percentage, 50);
    }

    #[actix_web::test]
    async fn breakdown_over_a_month_fetch() {
        let feed = MemoryFeed::new(october());
        let month = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let (first, last) = month_bounds(month);

        let logs = feed.fetch(&LogFilter::between(first, last)).await.unwrap();
        let breakdown = student_breakdown(&logs, month);

        assert_eq!(breakdown.students.len(), 1);
        assert_eq!(breakdown.students[0].rfid_uid, "C3");
        assert_eq!(breakdown.summary.excellent, 1);
    }
}
