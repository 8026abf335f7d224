//! Report records for the teacher's exports. [`export`] renders them as
//! Excel workbooks or PDF tables.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::{
    analytics::{aggregate::MonthlyStat, classify},
    error::AppError,
    model::{attendance::AttendanceLog, student::Student},
};

pub mod export;

const EMPTY_CELL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize, ToSchema)]
pub enum DayStatus {
    Present,
    #[strum(serialize = "Not Checked Out")]
    #[serde(rename = "Not Checked Out")]
    NotCheckedOut,
    Absent,
}

impl DayStatus {
    pub fn of(log: Option<&AttendanceLog>) -> Self {
        match log {
            Some(l) if l.time_in.is_some() && l.time_out.is_some() => DayStatus::Present,
            Some(l) if l.time_in.is_some() => DayStatus::NotCheckedOut,
            _ => DayStatus::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyRow {
    pub sr_no: u32,
    pub student_name: String,
    pub rfid_uid: String,
    #[schema(example = "09:00:00")]
    pub time_in: String,
    #[schema(example = "-")]
    pub time_out: String,
    pub status: DayStatus,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailySummary {
    pub present: u32,
    pub absent: u32,
    pub not_checked_out: u32,
}

impl DailySummary {
    /// Everyone who scanned in, whether or not they scanned out.
    pub fn checked_in(&self) -> u32 {
        self.present + self.not_checked_out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyReport {
    #[schema(example = "Attendance Report: 2026-10-16")]
    pub title: String,
    #[schema(example = "Attendance_2026-10-16")]
    pub file_stem: String,
    pub date: NaiveDate,
    pub rows: Vec<DailyRow>,
    pub summary: DailySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyRow {
    pub sr_no: u32,
    pub name: String,
    pub present: u32,
    pub total: u32,
    #[schema(example = "67%")]
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyReport {
    #[schema(example = "Monthly Attendance Report - 2026-10")]
    pub title: String,
    #[schema(example = "Monthly_Report_2026-10")]
    pub file_stem: String,
    pub rows: Vec<MonthlyRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DefaulterRow {
    pub sr_no: u32,
    pub name: String,
    #[schema(example = "62%")]
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DefaulterReport {
    #[schema(example = "Defaulter List (Below 75%)")]
    pub title: String,
    #[schema(example = "Defaulters_2026-10")]
    pub file_stem: String,
    pub rows: Vec<DefaulterRow>,
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| EMPTY_CELL.to_string(), |v| v.to_string())
}

/// One row per roster student for `date`, matched to logs by RFID tag.
pub fn daily_sheet(students: &[Student], logs: &[AttendanceLog], date: NaiveDate) -> DailyReport {
    let by_rfid: HashMap<&str, &AttendanceLog> = logs
        .iter()
        .filter(|l| l.date == date)
        .map(|l| (l.rfid_uid.as_str(), l))
        .collect();

    let mut summary = DailySummary::default();
    let rows = students
        .iter()
        .enumerate()
        .map(|(idx, student)| {
            let log = by_rfid.get(student.rfid_uid.as_str()).copied();
            let status = DayStatus::of(log);
            match status {
                DayStatus::Present => summary.present += 1,
                DayStatus::NotCheckedOut => summary.not_checked_out += 1,
                DayStatus::Absent => summary.absent += 1,
            }

            DailyRow {
                sr_no: idx as u32 + 1,
                student_name: student.name.clone(),
                rfid_uid: student.rfid_uid.clone(),
                time_in: cell(log.and_then(|l| l.time_in)),
                time_out: cell(log.and_then(|l| l.time_out)),
                status,
                photo_url: log.and_then(|l| l.photo_url.clone()),
            }
        })
        .collect();

    DailyReport {
        title: format!("Attendance Report: {date}"),
        file_stem: format!("Attendance_{date}"),
        date,
        rows,
        summary,
    }
}

/// Same as [`daily_sheet`], but an export needs at least one student.
pub fn daily_report(
    students: &[Student],
    logs: &[AttendanceLog],
    date: NaiveDate,
) -> Result<DailyReport, AppError> {
    if students.is_empty() {
        return Err(AppError::NotFound("No student data available".into()));
    }
    Ok(daily_sheet(students, logs, date))
}

pub fn monthly_report(stats: &[MonthlyStat], month_key: &str) -> Result<MonthlyReport, AppError> {
    if stats.is_empty() {
        return Err(AppError::NotFound("No monthly data to export".into()));
    }

    let rows = stats
        .iter()
        .enumerate()
        .map(|(idx, s)| MonthlyRow {
            sr_no: idx as u32 + 1,
            name: s.student_name.clone(),
            present: s.present,
            total: s.total,
            percentage: format!("{}%", s.percentage),
        })
        .collect();

    Ok(MonthlyReport {
        title: format!("Monthly Attendance Report - {month_key}"),
        file_stem: format!("Monthly_Report_{month_key}"),
        rows,
    })
}

pub fn defaulter_report(stats: &[MonthlyStat], month_key: &str) -> Result<DefaulterReport, AppError> {
    let rows: Vec<DefaulterRow> = classify::defaulters(stats)
        .into_iter()
        .enumerate()
        .map(|(idx, s)| DefaulterRow {
            sr_no: idx as u32 + 1,
            name: s.student_name.clone(),
            percentage: format!("{}%", s.percentage),
        })
        .collect();

    if rows.is_empty() {
        return Err(AppError::NotFound("No defaulters found".into()));
    }

    Ok(DefaulterReport {
        title: format!("Defaulter List (Below {}%)", classify::DEFAULTER_BELOW),
        file_stem: format!("Defaulters_{month_key}"),
        rows,
    })
}
