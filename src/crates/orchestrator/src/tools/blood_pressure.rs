//! Blood-pressure tools: record, query, update-latest.

use crate::repository::{with_retries, BloodPressureRecord, RecordStore};
use crate::tools::datetime::{format_datetime, now, parse_datetime, resolve_window};
use crate::tools::registry::{Tool, ToolRegistry};
use crate::tools::require_token_id;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const DATE_HELP: &str = "use YYYY-MM-DD or YYYY-MM-DD HH:MM (e.g. 2026-03-15 or 2026-03-15 14:30)";

/// Register the blood-pressure tools.
pub fn register(registry: &ToolRegistry, store: Arc<dyn RecordStore<BloodPressureRecord>>) {
    let record_store = store.clone();
    registry.register(Tool::new(
        "record_blood_pressure",
        "Record a blood pressure measurement for the current user. \
         Provide systolic and diastolic pressure in mmHg, optionally heart rate, \
         notes, and the measurement time (defaults to now).",
        json!({
            "type": "object",
            "properties": {
                "systolic": {"type": "integer", "description": "Systolic pressure in mmHg"},
                "diastolic": {"type": "integer", "description": "Diastolic pressure in mmHg"},
                "heart_rate": {"type": "integer", "description": "Heart rate in beats per minute"},
                "notes": {"type": "string", "description": "Free-form notes"},
                "record_time": {
                    "type": "string",
                    "description": "Measurement time, YYYY-MM-DD or YYYY-MM-DD HH:MM; defaults to now"
                }
            },
            "required": ["systolic", "diastolic"]
        }),
        Arc::new(move |args| {
            let store = record_store.clone();
            Box::pin(async move { record(store, args).await })
        }),
    ));

    let query_store = store.clone();
    registry.register(Tool::new(
        "query_blood_pressure",
        "Query the current user's blood pressure records. Defaults to the last \
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
            let store = query_store.clone();
            Box::pin(async move { query(store, args).await })
        }),
    ));

    let update_store = store;
    registry.register(Tool::new(
        "update_blood_pressure",
        "Correct the current user's most recent blood pressure record. Only the \
         provided fields change.",
        json!({
            "type": "object",
            "properties": {
                "systolic": {"type": "integer", "description": "Corrected systolic pressure in mmHg"},
                "diastolic": {"type": "integer", "description": "Corrected diastolic pressure in mmHg"},
                "heart_rate": {"type": "integer", "description": "Corrected heart rate in beats per minute"},
                "notes": {"type": "string", "description": "Corrected notes"},
                "record_time": {"type": "string", "description": "Corrected measurement time"}
            }
        }),
        Arc::new(move |args| {
            let store = update_store.clone();
            Box::pin(async move { update(store, args).await })
        }),
    ));
}

#[derive(Deserialize)]
struct RecordArgs {
    systolic: i64,
    diastolic: i64,
    #[serde(default)]
    heart_rate: Option<i64>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    record_time: Option<String>,
}

async fn record(store: Arc<dyn RecordStore<BloodPressureRecord>>, args: Value) -> String {
    let token_id = match require_token_id() {
        Ok(id) => id,
        Err(e) => return e,
    };
    let args: RecordArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(e) => return format!("error: invalid arguments - {e}"),
    };

    let explicit_time = args.record_time.is_some();
    let record_time = match &args.record_time {
        Some(raw) => match parse_datetime(raw) {
            Some(dt) => dt,
            None => return format!("error: record time '{raw}' is not valid; {DATE_HELP}"),
        },
        None => now(),
    };

    let record = BloodPressureRecord {
        id: Uuid::new_v4(),
        user_id: token_id.clone(),
        systolic: args.systolic,
        diastolic: args.diastolic,
        heart_rate: args.heart_rate,
        notes: args.notes.clone(),
        record_time,
        created_at: now(),
    };

    let result = with_retries("record_blood_pressure", || {
        let store = store.clone();
        let record = record.clone();
        async move { store.create(record).await }
    })
    .await;

    match result {
        Ok(saved) => {
            tracing::info!(user_id = %token_id, record_id = %saved.id, "Recorded blood pressure");
            let mut reply = format!(
                "Recorded blood pressure: systolic {} mmHg, diastolic {} mmHg",
                saved.systolic, saved.diastolic
            );
            if let Some(hr) = saved.heart_rate {
                reply.push_str(&format!(", heart rate {hr} bpm"));
            }
            if explicit_time {
                reply.push_str(&format!(", time {}", format_datetime(saved.record_time)));
            }
            if let Some(notes) = &saved.notes {
                reply.push_str(&format!(". Notes: {notes}"));
            }
            reply
        }
        Err(e) => {
            tracing::error!(user_id = %token_id, error = %e, "Failed to record blood pressure");
            format!("error: failed to record blood pressure - {e}")
        }
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

async fn query(store: Arc<dyn RecordStore<BloodPressureRecord>>, args: Value) -> String {
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

    let result = with_retries("query_blood_pressure", || {
        let store = store.clone();
        let token_id = token_id.clone();
        async move { store.get_recent(&token_id, window.start, window.end).await }
    })
    .await;

    let records = match result {
        Ok(records) => records,
        Err(e) => return format!("error: failed to query blood pressure records - {e}"),
    };

    if records.is_empty() {
        return "No blood pressure records in this period.".to_string();
    }

    let mut lines = vec![format!("Found {} blood pressure records:", records.len())];
    for (i, record) in records.iter().enumerate() {
        let mut line = format!(
            "{}. {} - systolic {} mmHg, diastolic {} mmHg",
            i + 1,
            format_datetime(record.record_time),
            record.systolic,
            record.diastolic
        );
        if let Some(hr) = record.heart_rate {
            line.push_str(&format!(", heart rate {hr} bpm"));
        }
        if let Some(notes) = &record.notes {
            line.push_str(&format!(", notes: {notes}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[derive(Deserialize)]
struct UpdateArgs {
    #[serde(default)]
    systolic: Option<i64>,
    #[serde(default)]
    diastolic: Option<i64>,
    #[serde(default)]
    heart_rate: Option<i64>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    record_time: Option<String>,
}

async fn update(store: Arc<dyn RecordStore<BloodPressureRecord>>, args: Value) -> String {
    let token_id = match require_token_id() {
        Ok(id) => id,
        Err(e) => return e,
    };
    let args: UpdateArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(e) => return format!("error: invalid arguments - {e}"),
    };

    let record_time = match &args.record_time {
        Some(raw) => match parse_datetime(raw) {
            Some(dt) => Some(dt),
            None => return format!("error: record time '{raw}' is not valid; {DATE_HELP}"),
        },
        None => None,
    };

    if args.systolic.is_none()
        && args.diastolic.is_none()
        && args.heart_rate.is_none()
        && args.notes.is_none()
        && record_time.is_none()
    {
        return "No update fields were provided; the record is unchanged.".to_string();
    }

    let latest = match with_retries("update_blood_pressure.latest", || {
        let store = store.clone();
        let token_id = token_id.clone();
        async move { store.latest(&token_id).await }
    })
    .await
    {
        Ok(Some(latest)) => latest,
        Ok(None) => {
            return "error: no blood pressure records exist yet; record one before updating."
                .to_string()
        }
        Err(e) => return format!("error: failed to update blood pressure record - {e}"),
    };

    let patch_args = (
        args.systolic,
        args.diastolic,
        args.heart_rate,
        args.notes.clone(),
        record_time,
    );
    let result = with_retries("update_blood_pressure", || {
        let store = store.clone();
        let (systolic, diastolic, heart_rate, notes, record_time) = patch_args.clone();
        let id = latest.id;
        async move {
            store
                .update(
                    id,
                    Box::new(move |record| {
                        if let Some(v) = systolic {
                            record.systolic = v;
                        }
                        if let Some(v) = diastolic {
                            record.diastolic = v;
                        }
                        if let Some(v) = heart_rate {
                            record.heart_rate = Some(v);
                        }
                        if let Some(v) = notes {
                            record.notes = Some(v);
                        }
                        if let Some(v) = record_time {
                            record.record_time = v;
                        }
                    }),
                )
                .await
        }
    })
    .await;

    match result {
        Ok(Some(updated)) => {
            tracing::info!(user_id = %token_id, record_id = %updated.id, "Updated blood pressure record");
            let mut changes = Vec::new();
            if let Some(v) = args.systolic {
                changes.push(format!("systolic {v} mmHg"));
            }
            if let Some(v) = args.diastolic {
                changes.push(format!("diastolic {v} mmHg"));
            }
            if let Some(v) = args.heart_rate {
                changes.push(format!("heart rate {v} bpm"));
            }
            if let Some(v) = &args.notes {
                changes.push(format!("notes: {v}"));
            }
            if let Some(v) = record_time {
                changes.push(format!("time {}", format_datetime(v)));
            }
            format!("Updated the latest blood pressure record: {}", changes.join(", "))
        }
        Ok(None) => "error: the blood pressure record disappeared during update.".to_string(),
        Err(e) => format!("error: failed to update blood pressure record - {e}"),
    }
}
