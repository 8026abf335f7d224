use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceLog;

pub const DEFAULT_WINDOW_SECS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelfieWindow {
    NoCheckIn,
    Open { seconds_remaining: u32 },
    Closed,
}

/// Shape handed to the student dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SelfieWindowState {
    pub allowed: bool,
    pub seconds_remaining: u32,
    #[schema(value_type = Object, example = json!({"state": "open", "seconds_remaining": 412}))]
    pub window: SelfieWindow,
}

impl From<SelfieWindow> for SelfieWindowState {
    fn from(window: SelfieWindow) -> Self {
        let seconds_remaining = match window {
            SelfieWindow::Open { seconds_remaining } => seconds_remaining,
            _ => 0,
        };
        SelfieWindowState {
            allowed: matches!(window, SelfieWindow::Open { .. }),
            seconds_remaining,
            window,
        }
    }
}

impl SelfieWindow {
    /// Derives the window from a check-in and the current local time.
    ///
    /// A check-in from an earlier day is stale: nothing has been observed for
    /// today yet. A check-in in the future (clock skew) is treated as closed.
    pub fn evaluate(check_in: Option<NaiveDateTime>, now: NaiveDateTime, window_secs: u32) -> Self {
        let Some(check_in) = check_in else {
            return SelfieWindow::NoCheckIn;
        };
        if check_in.date() < now.date() {
            return SelfieWindow::NoCheckIn;
        }

        let elapsed = now - check_in;
        let window = TimeDelta::seconds(i64::from(window_secs));
        if elapsed < TimeDelta::zero() || elapsed > window {
            return SelfieWindow::Closed;
        }

        let remaining_ms = (window - elapsed).num_milliseconds();
        SelfieWindow::Open {
            seconds_remaining: (remaining_ms.max(0) as u64).div_ceil(1000) as u32,
        }
    }

    /// Convenience over today's log, if the caller has one.
    pub fn for_log(log: Option<&AttendanceLog>, now: NaiveDateTime, window_secs: u32) -> Self {
        Self::evaluate(log.and_then(AttendanceLog::check_in_at), now, window_secs)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SelfieWindow::Open { .. })
    }
}
