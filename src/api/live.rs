//! Server-sent events for the teacher's live attendance table.

use std::{convert::Infallible, time::Duration};

use actix_web::{HttpResponse, http::header, web};
use futures::{Stream, stream};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, warn};

use crate::{
    api::{attendance::DateQuery, date_or_today},
    auth::auth::AuthUser,
    error::AppError,
    store::{LogChange, LogFeed, LogFilter, mysql::MySqlStore},
};

/// Comment frame sent when nothing else went out for a while, so proxies
/// do not drop the idle connection.
const PING: &[u8] = b": ping\n\n";
const KEEP_ALIVE: Duration = Duration::from_secs(15);

fn sse_frame(change: &LogChange) -> Option<web::Bytes> {
    match serde_json::to_string(change.log()) {
        Ok(data) => Some(web::Bytes::from(format!("event: upsert\ndata: {data}\n\n"))),
        Err(e) => {
            warn!(error = %e, log_id = change.log().id, "Could not encode attendance change");
            None
        }
    }
}

/// Frames every change matching `filter`, with a ping after `keep_alive` of
/// silence. Ends when the channel closes; dropping the stream drops the
/// receiver with it.
pub fn upsert_events(
    rx: broadcast::Receiver<LogChange>,
    filter: LogFilter,
    keep_alive: Duration,
) -> impl Stream<Item = Result<web::Bytes, Infallible>> {
    let mut ticker = interval_at(Instant::now() + keep_alive, keep_alive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    stream::unfold((rx, filter, ticker), |(mut rx, filter, mut ticker)| async move {
        loop {
            tokio::select! {
                biased;

                received = rx.recv() => match received {
                    Ok(change) if filter.matches(change.log()) => {
                        if let Some(frame) = sse_frame(&change) {
                            ticker.reset();
                            return Some((Ok(frame), (rx, filter, ticker)));
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Live subscriber lagged, refresh needed");
                    }
                    Err(RecvError::Closed) => return None,
                },
                _ = ticker.tick() => {
                    return Some((Ok(web::Bytes::from_static(PING)), (rx, filter, ticker)));
                }
            }
        }
    })
}

/// Live attendance updates
#[utoipa::path(
    get,
    path = "/api/attendance/live",
    params(DateQuery),
    responses(
        (status = 200, description = "`upsert` events carrying attendance logs", body = String, content_type = "text/event-stream"),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn live(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_teacher()?;
    let date = date_or_today(query.date.as_deref())?;

    let rx = store
        .subscribe()
        .ok_or_else(|| AppError::Internal("log feed has no live side".into()))?;
    debug!(%date, subscribers = store.changes().receiver_count(), "Live subscriber joined");

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(upsert_events(rx, LogFilter::on(date), KEEP_ALIVE)))
}
