//! Data access for attendance logs and the student roster.
//!
//! Logs reach the service two ways: pulled snapshots ([`LogFeed::fetch`]) and
//! pushed changes ([`LogFeed::subscribe`]). Handlers only ever compute on
//! pulled snapshots; the push side exists to tell live views to refresh.

use std::future::Future;

use chrono::NaiveDate;
use tokio::sync::broadcast;

use crate::{error::AppError, model::attendance::AttendanceLog};

pub mod mysql;
pub mod photos;
pub mod poller;

/// Optional constraints on a log fetch. Empty means everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub rfid_uid: Option<String>,
}

impl LogFilter {
    pub fn on(date: NaiveDate) -> Self {
        LogFilter {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        LogFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    pub fn for_student(mut self, rfid_uid: impl Into<String>) -> Self {
        self.rfid_uid = Some(rfid_uid.into());
        self
    }

    pub fn matches(&self, log: &AttendanceLog) -> bool {
        self.date.is_none_or(|d| log.date == d)
            && self.from.is_none_or(|d| log.date >= d)
            && self.to.is_none_or(|d| log.date <= d)
            && self.rfid_uid.as_deref().is_none_or(|r| log.rfid_uid == r)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogChange {
    Upserted(AttendanceLog),
}

impl LogChange {
    pub fn log(&self) -> &AttendanceLog {
        match self {
            LogChange::Upserted(log) => log,
        }
    }
}

pub trait LogFeed: Send + Sync {
    fn fetch(
        &self,
        filter: &LogFilter,
    ) -> impl Future<Output = Result<Vec<AttendanceLog>, AppError>> + Send;

    /// `None` when the feed has no push side.
    fn subscribe(&self) -> Option<broadcast::Receiver<LogChange>>;
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-process feed used by tests.
    pub struct MemoryFeed {
        pub logs: Mutex<Vec<AttendanceLog>>,
    }

    impl MemoryFeed {
        pub fn new(logs: Vec<AttendanceLog>) -> Self {
            MemoryFeed {
                logs: Mutex::new(logs),
            }
        }
    }

    impl LogFeed for MemoryFeed {
        async fn fetch(&self, filter: &LogFilter) -> Result<Vec<AttendanceLog>, AppError> {
            let logs = self.logs.lock().map_err(|e| AppError::Internal(e.to_string()))?;
            Ok(logs.iter().filter(|l| filter.matches(l)).cloned().collect())
        }

        fn subscribe(&self) -> Option<broadcast::Receiver<LogChange>> {
            None
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_log(id: u64, rfid: &str, date: &str, time_in: Option<&str>) -> AttendanceLog {
    AttendanceLog {
        id,
        student_name: format!("Student {rfid}"),
        rfid_uid: rfid.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        time_in: time_in.and_then(crate::model::attendance::parse_time_of_day),
        time_out: None,
        photo_url: None,
        latitude: None,
        longitude: None,
        address: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{memory::MemoryFeed, *};

    #[test]
    fn filter_combines_constraints() {
        let log = sample_log(1, "A1", "2026-10-16", Some("09:00"));
        let day = log.date;

        assert!(LogFilter::default().matches(&log));
        assert!(LogFilter::on(day).matches(&log));
        assert!(LogFilter::on(day).for_student("A1").matches(&log));
        assert!(!LogFilter::on(day).for_student("B2").matches(&log));
        assert!(!LogFilter::on(day.succ_opt().unwrap()).matches(&log));
        assert!(LogFilter::between(day, day).matches(&log));
        assert!(!LogFilter::between(day.succ_opt().unwrap(), day.succ_opt().unwrap()).matches(&log));
    }

    #[actix_web::test]
    async fn memory_feed_pulls_filtered_snapshot() {
        let feed = MemoryFeed::new(vec![
            sample_log(1, "A1", "2026-10-15", Some("09:00")),
            sample_log(2, "A1", "2026-10-16", None),
            sample_log(3, "B2", "2026-10-16", Some("09:02")),
        ]);

        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let logs = feed.fetch(&LogFilter::on(day)).await.unwrap();
        assert_eq!(logs.iter().map(|l| l.id).collect::<Vec<_>>(), [2, 3]);
        assert!(feed.subscribe().is_none());
    }
}
