pub mod analytics;
pub mod attendance;
pub mod live;
pub mod reports;
pub mod selfie;
pub mod students;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::{
    analytics::aggregate::{month_bounds, parse_month},
    error::AppError,
};

pub(crate) fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// `YYYY-MM-DD`, or today when the parameter is absent or blank.
pub(crate) fn date_or_today(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(local_now().date()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("Invalid date '{s}', expected YYYY-MM-DD"))),
    }
}

/// `YYYY-MM` as the first of that month, or the current month.
pub(crate) fn month_or_current(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(month_bounds(local_now().date()).0),
        Some(s) => parse_month(s)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid month '{s}', expected YYYY-MM"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn explicit_dates_are_parsed() {
        assert_eq!(
            date_or_today(Some("2026-10-16")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
        );
        assert_eq!(
            month_or_current(Some(" 2026-02 ")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
    }

    #[test]
    fn blank_means_now() {
        assert_eq!(date_or_today(Some("  ")).unwrap(), Local::now().date_naive());
        assert_eq!(month_or_current(None).unwrap().day(), 1);
    }

    #[test]
    fn garbage_is_a_bad_request() {
        assert!(matches!(date_or_today(Some("16/10/2026")), Err(AppError::BadRequest(_))));
        assert!(matches!(month_or_current(Some("2026-13")), Err(AppError::BadRequest(_))));
    }
}
