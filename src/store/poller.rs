use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{Local, NaiveDate};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::{LogChange, LogFeed, LogFilter};
use crate::{error::AppError, model::attendance::AttendanceLog};

/// Remembers the last snapshot of one day's logs and reports what moved.
#[derive(Default)]
pub struct ChangeDetector {
    date: Option<NaiveDate>,
    seen: HashMap<u64, AttendanceLog>,
}

impl ChangeDetector {
    /// Returns logs that are new or differ from the previous snapshot.
    /// Switching to a different date starts from an empty snapshot.
    pub fn observe(&mut self, date: NaiveDate, snapshot: Vec<AttendanceLog>) -> Vec<AttendanceLog> {
        if self.date != Some(date) {
            self.seen.clear();
            self.date = Some(date);
        }

        let mut changed = Vec::new();
        for log in snapshot {
            if self.seen.get(&log.id) != Some(&log) {
                changed.push(log.clone());
                self.seen.insert(log.id, log);
            }
        }
        changed
    }

    /// Takes in a change announced elsewhere so the next poll does not
    /// announce it again. Ignored unless it is for the tracked date.
    pub fn remember(&mut self, log: AttendanceLog) {
        if self.date == Some(log.date) {
            self.seen.insert(log.id, log);
        }
    }
}

/// Drains the poller's own subscription into the detector.
pub fn absorb(detector: &mut ChangeDetector, own: &mut broadcast::Receiver<LogChange>) {
    loop {
        match own.try_recv() {
            Ok(LogChange::Upserted(log)) => detector.remember(log),
            Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

/// One pull of `date`'s logs; publishes every change and returns how many.
pub async fn poll_once<F: LogFeed>(
    feed: &F,
    detector: &mut ChangeDetector,
    date: NaiveDate,
    changes: &broadcast::Sender<LogChange>,
) -> Result<usize, AppError> {
    let snapshot = feed.fetch(&LogFilter::on(date)).await?;
    let changed = detector.observe(date, snapshot);
    let count = changed.len();

    for log in changed {
        // Err only means every subscriber left meanwhile
        let _ = changes.send(LogChange::Upserted(log));
    }
    Ok(count)
}

/// Re-fetches today's logs on a fixed cadence while anyone is subscribed.
/// Picks up check-ins the RFID hardware writes straight to the database.
pub async fn run_change_poller<F: LogFeed>(
    feed: Arc<F>,
    changes: broadcast::Sender<LogChange>,
    every: Duration,
) {
    info!(interval_secs = every.as_secs(), "Attendance change poller started");

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut detector = ChangeDetector::default();
    let mut own = changes.subscribe();

    loop {
        ticker.tick().await;
        absorb(&mut detector, &mut own);

        // `own` is always there; anyone else is a live view
        if changes.receiver_count() <= 1 {
            continue;
        }

        let today = Local::now().date_naive();
        match poll_once(feed.as_ref(), &mut detector, today, &changes).await {
            Ok(0) => {}
            Ok(n) => debug!(changed = n, "Published polled attendance changes"),
            Err(e) => warn!(error = %e, "Attendance poll failed"),
        }
    }
}
