//! Health-event tools: record and query lifestyle check-ins.

use crate::repository::{with_retries, HealthEventRecord, RecordStore};
use crate::tools::datetime::{format_datetime, now, parse_datetime, resolve_window};
use crate::tools::registry::{Tool, ToolRegistry};
use crate::tools::require_token_id;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Register the health-event tools.
pub fn register(registry: &ToolRegistry, store: Arc<dyn RecordStore<HealthEventRecord>>) {
    let record_store = store.clone();
    registry.register(Tool::new(
        "record_health_event",
        "Record a health-event check-in for the current user, e.g. exercise, a \
         low-salt meal, relaxation, or good sleep. Optionally the check-in time \
         (defaults to now) and notes.",
        json!({
            "type": "object",
            "properties": {
                "event_type": {
                    "type": "string",
                    "description": "Kind of event, e.g. exercise, low-salt meal, relaxation, good sleep"
                },
                "check_in_time": {
                    "type": "string",
                    "description": "Check-in time, YYYY-MM-DD or YYYY-MM-DD HH:MM; defaults to now"
                },
                "notes": {"type": "string", "description": "Free-form notes"}
            },
            "required": ["event_type"]
        }),
        Arc::new(move |args| {
            let store = record_store.clone();
            Box::pin(async move { record(store, args).await })
        }),
    ));

    registry.register(Tool::new(
        "query_health_event",
        "Query the current user's health-event check-ins. Defaults to the last \
         14 days; an explicit range is capped at 14 days.",
        json!({
            "type": "object",
            "properties": {
                "days": {"type": "integer", "description": "Number of days to look back (max 14)"},
                "start_date": {"type": "string", "description": "Range start, YYYY-MM-DD"},
                "end_date": {"type": "string", "description": "Range end, YYYY-MM-DD"}
            }
        }),
        Arc::new(move |args| {
            let store = store.clone();
            Box::pin(async move { query(store, args).await })
        }),
    ));
}

#[derive(Deserialize)]
struct RecordArgs {
    event_type: String,
    #[serde(default)]
    check_in_time: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

async fn record(store: Arc<dyn RecordStore<HealthEventRecord>>, args: Value) -> String {
    let token_id = match require_token_id() {
        Ok(id) => id,
        Err(e) => return e,
    };
    let args: RecordArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(e) => return format!("error: invalid arguments - {e}"),
    };

    let explicit_time = args.check_in_time.is_some();
    let check_in_time = match &args.check_in_time {
        Some(raw) => match parse_datetime(raw) {
            Some(dt) => dt,
            None => {
                return format!(
                    "error: check-in time '{raw}' is not valid; use YYYY-MM-DD or YYYY-MM-DD HH:MM"
                )
            }
        },
        None => now(),
    };

    let record = HealthEventRecord {
        id: Uuid::new_v4(),
        user_id: token_id.clone(),
        event_type: args.event_type.clone(),
        check_in_time,
        notes: args.notes.clone(),
        created_at: now(),
    };

    let result = with_retries("record_health_event", || {
        let store = store.clone();
        let record = record.clone();
        async move { store.create(record).await }
    })
    .await;

    match result {
        Ok(saved) => {
            tracing::info!(user_id = %token_id, record_id = %saved.id, "Recorded health event");
            let mut reply = format!("Recorded health event: {}", saved.event_type);
            if explicit_time {
                reply.push_str(&format!(", time {}", format_datetime(saved.check_in_time)));
            }
            if let Some(notes) = &saved.notes {
                reply.push_str(&format!(". Notes: {notes}"));
            }
            reply
        }
        Err(e) => format!("error: failed to record health event - {e}"),
    }
}

#[derive(Deserialize)]
struct QueryArgs {
    #[serde(default)]
    days: Option<i64>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

async fn query(store: Arc<dyn RecordStore<HealthEventRecord>>, args: Value) -> String {
    let token_id = match require_token_id() {
        Ok(id) => id,
        Err(e) => return e,
    };
    let args: QueryArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(e) => return format!("error: invalid arguments - {e}"),
    };

    let window = match resolve_window(args.days, args.start_date.as_deref(), args.end_date.as_deref())
    {
        Ok(window) => window,
        Err(e) => return e,
    };

    let result = with_retries("query_health_event", || {
        let store = store.clone();
        let token_id = token_id.clone();
        async move { store.get_recent(&token_id, window.start, window.end).await }
    })
    .await;

    let records = match result {
        Ok(records) => records,
        Err(e) => return format!("error: failed to query health events - {e}"),
    };

    if records.is_empty() {
        return "No health-event check-ins in this period.".to_string();
    }

    let mut lines = vec![format!("Found {} health-event check-ins:", records.len())];
    for (i, record) in records.iter().enumerate() {
        let mut line = format!(
            "{}. {} - {}",
            i + 1,
            format_datetime(record.check_in_time),
            record.event_type
        );
        if let Some(notes) = &record.notes {
            line.push_str(&format!(", notes: {notes}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}
