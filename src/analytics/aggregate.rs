use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceLog;

/// Granularity used to bucket logs by their date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Month,
}

impl Period {
    pub fn key(self, date: NaiveDate) -> String {
        match self {
            Period::Day => date.format("%Y-%m-%d").to_string(),
            Period::Month => date.format("%Y-%m").to_string(),
        }
    }
}

/// Presence counts for one period across the whole class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PeriodStats {
    #[schema(example = "2026-10")]
    pub period: String,
    /// Distinct dates seen in the period.
    pub lectures: u32,
    /// Distinct students seen in the period.
    pub students: u32,
    /// Logs carrying a check-in.
    pub present: u32,
    pub percentage: u8,
}

/// Presence measured against the full roster instead of students seen.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RosterCoverage {
    pub possible: u32,
    pub absent: u32,
    /// Rounded to one decimal place.
    pub percentage: f64,
}

impl PeriodStats {
    pub fn against_roster(&self, roster_size: u32) -> RosterCoverage {
        let possible = roster_size.saturating_mul(self.lectures);
        let percentage = if possible == 0 {
            0.0
        } else {
            let raw = f64::from(self.present) * 100.0 / f64::from(possible);
            (raw.min(100.0) * 10.0).round() / 10.0
        };

        RosterCoverage {
            possible,
            absent: possible.saturating_sub(self.present),
            percentage,
        }
    }
}

/// One student's attendance for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyStat {
    #[schema(example = "Asha Patil")]
    pub student_name: String,
    #[schema(example = "A1B2C3D4")]
    pub rfid_uid: String,
    pub present: u32,
    pub total: u32,
    #[schema(example = 67)]
    pub percentage: u8,
}

/// Totals shown on a student's own dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub total: u32,
    pub attended: u32,
    pub percentage: u8,
}

/// `round(100 * part / whole)` with halves rounded up. A zero `whole` yields 0.
pub fn percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part.min(whole));
    let whole = u64::from(whole);
    ((200 * part + whole) / (2 * whole)) as u8
}

pub fn aggregate(logs: &[AttendanceLog], period: Period) -> Vec<PeriodStats> {
    #[derive(Default)]
    struct Bucket<'a> {
        dates: BTreeSet<NaiveDate>,
        students: BTreeSet<&'a str>,
        present: u32,
    }

    let mut buckets: BTreeMap<String, Bucket<'_>> = BTreeMap::new();
    for log in logs {
        let bucket = buckets.entry(period.key(log.date)).or_default();
        bucket.dates.insert(log.date);
        bucket.students.insert(log.rfid_uid.as_str());
        if log.is_present() {
            bucket.present += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period, b)| {
            let lectures = b.dates.len() as u32;
            let students = b.students.len() as u32;
            PeriodStats {
                period,
                lectures,
                students,
                present: b.present,
                percentage: percentage(b.present, students.saturating_mul(lectures)),
            }
        })
        .collect()
}

/// Per-student stats for the month containing `month`, sorted by name.
pub fn student_monthly(logs: &[AttendanceLog], month: NaiveDate) -> Vec<MonthlyStat> {
    let key = Period::Month.key(month);
    let mut per_student: BTreeMap<&str, (&str, u32, u32)> = BTreeMap::new();

    for log in logs.iter().filter(|l| Period::Month.key(l.date) == key) {
        let entry = per_student
            .entry(log.rfid_uid.as_str())
            .or_insert((log.student_name.as_str(), 0, 0));
        entry.2 += 1;
        if log.is_present() {
            entry.1 += 1;
        }
    }

    let mut stats: Vec<MonthlyStat> = per_student
        .into_iter()
        .map(|(rfid, (name, present, total))| MonthlyStat {
            student_name: name.to_string(),
            rfid_uid: rfid.to_string(),
            present,
            total,
            percentage: percentage(present, total),
        })
        .collect();
    stats.sort_by(|a, b| a.student_name.cmp(&b.student_name).then(a.rfid_uid.cmp(&b.rfid_uid)));
    stats
}

/// Totals over a single student's logs, whatever range the caller fetched.
pub fn summarize(logs: &[AttendanceLog]) -> AttendanceSummary {
    let total = logs.len() as u32;
    let attended = logs.iter().filter(|l| l.is_present()).count() as u32;
    AttendanceSummary {
        total,
        attended,
        percentage: percentage(attended, total),
    }
}

/// First and last calendar day of the month containing `day`.
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month.and_then(|d| d.pred_opt()).unwrap_or(first);
    (first, last)
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use proptest::prelude::*;

    fn log(rfid: &str, date: &str, time_in: Option<&str>) -> AttendanceLog {
        AttendanceLog {
            id: 0,
            student_name: format!("Student {rfid}"),
            rfid_uid: rfid.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time_in: time_in.map(|t| NaiveTime::parse_from_str(t, "%H:%M").unwrap()),
            time_out: None,
            photo_url: None,
            latitude: None,
            longitude: None,
            address: None,
        }
    }

    fn october() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    #[test]
    fn two_of_three_rounds_to_67() {
        let logs = vec![
            log("A1", "2026-10-01", Some("09:00")),
            log("A1", "2026-10-02", Some("09:05")),
            log("A1", "2026-10-03", None),
        ];

        let stats = student_monthly(&logs, october());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total, 3);
        assert_eq!(stats[0].present, 2);
        assert_eq!(stats[0].percentage, 67);
    }

    #[test]
    fn zero_denominator_is_zero_percent() {
        assert_eq!(percentage(0, 0), 0);
        assert!(aggregate(&[], Period::Month).is_empty());
        assert!(student_monthly(&[], october()).is_empty());
        assert_eq!(summarize(&[]).percentage, 0);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(5, 5), 100);
        assert_eq!(percentage(7, 5), 100);
    }

    #[test]
    fn class_percentage_uses_students_times_lectures() {
        let logs = vec![
            log("A1", "2026-10-01", Some("09:00")),
            log("B2", "2026-10-01", None),
            log("A1", "2026-10-02", Some("09:00")),
            log("B2", "2026-10-02", Some("09:10")),
            log("A1", "2026-11-02", None),
        ];

        let stats = aggregate(&logs, Period::Month);
        assert_eq!(stats.len(), 2);

        let oct = &stats[0];
        assert_eq!(oct.period, "2026-10");
        assert_eq!(oct.lectures, 2);
        assert_eq!(oct.students, 2);
        assert_eq!(oct.present, 3);
        assert_eq!(oct.percentage, 75);

        let nov = &stats[1];
        assert_eq!(nov.period, "2026-11");
        assert_eq!(nov.percentage, 0);
    }

    #[test]
    fn day_period_groups_by_date() {
        let logs = vec![
            log("A1", "2026-10-01", Some("09:00")),
            log("B2", "2026-10-01", None),
            log("A1", "2026-10-02", Some("09:00")),
        ];

        let stats = aggregate(&logs, Period::Day);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].period, "2026-10-01");
        assert_eq!(stats[0].lectures, 1);
        assert_eq!(stats[0].percentage, 50);
        assert_eq!(stats[1].percentage, 100);
    }

    #[test]
    fn roster_coverage_counts_missing_students_as_absent() {
        let stats = PeriodStats {
            period: "2026-10".into(),
            lectures: 4,
            students: 2,
            present: 7,
            percentage: 88,
        };

        let coverage = stats.against_roster(3);
        assert_eq!(coverage.possible, 12);
        assert_eq!(coverage.absent, 5);
        assert_eq!(coverage.percentage, 58.3);
        assert_eq!(stats.against_roster(0).percentage, 0.0);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let logs = vec![
            log("A1", "2026-10-01", Some("09:00")),
            log("B2", "2026-10-03", None),
        ];
        assert_eq!(aggregate(&logs, Period::Month), aggregate(&logs, Period::Month));
        assert_eq!(student_monthly(&logs, october()), student_monthly(&logs, october()));
    }

    #[test]
    fn student_monthly_ignores_other_months() {
        let logs = vec![
            log("A1", "2026-09-30", Some("09:00")),
            log("A1", "2026-10-01", None),
        ];
        let stats = student_monthly(&logs, october());
        assert_eq!(stats[0].total, 1);
        assert_eq!(stats[0].percentage, 0);
    }

    #[test]
    fn month_bounds_handle_december_and_leap_years() {
        let dec = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap();
        assert_eq!(
            month_bounds(dec),
            (
                NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
            )
        );
        let feb = NaiveDate::from_ymd_opt(2028, 2, 3).unwrap();
        assert_eq!(month_bounds(feb).1, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
    }

    #[test]
    fn parses_month_keys() {
        assert_eq!(parse_month("2026-10"), Some(october()));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("october"), None);
    }

    proptest! {
        #[test]
        fn single_student_percentage_matches_formula(flags in proptest::collection::vec(any::<bool>(), 1..31)) {
            let logs: Vec<_> = flags
                .iter()
                .enumerate()
                .map(|(i, present)| {
                    let date = format!("2026-10-{:02}", i + 1);
                    log("A1", &date, present.then_some("09:00"))
                })
                .collect();

            let stat = &student_monthly(&logs, october())[0];
            let present = flags.iter().filter(|p| **p).count() as f64;
            let expected = (100.0 * present / flags.len() as f64).round() as u8;

            prop_assert_eq!(stat.total as usize, flags.len());
            prop_assert_eq!(stat.percentage, expected);
            prop_assert!(stat.percentage <= 100);
        }

        #[test]
        fn percentage_is_bounded(part in 0u32..10_000, whole in 0u32..10_000) {
            prop_assert!(percentage(part, whole) <= 100);
        }
    }
}
