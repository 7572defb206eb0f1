//! Symptom tools: record and query symptom reports.

use crate::repository::{with_retries, RecordStore, RecoveryStatus, SymptomRecord};
use crate::tools::datetime::{format_datetime, now, parse_datetime, resolve_window};
use crate::tools::registry::{Tool, ToolRegistry};
use crate::tools::require_token_id;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Register the symptom tools.
pub fn register(registry: &ToolRegistry, store: Arc<dyn RecordStore<SymptomRecord>>) {
    let record_store = store.clone();
    registry.register(Tool::new(
        "record_symptom",
        "Record a symptom report for the current user: symptom name and its \
         recovery status (new, ongoing, or recovered), optionally the report \
         time (defaults to now) and notes.",
        json!({
            "type": "object",
            "properties": {
                "symptom_name": {"type": "string", "description": "Name of the symptom"},
                "recovery_status": {
                    "type": "string",
                    "enum": ["new", "ongoing", "recovered"],
                    "description": "Whether the symptom is newly reported, still present, or resolved"
                },
                "record_time": {
                    "type": "string",
                    "description": "Report time, YYYY-MM-DD or YYYY-MM-DD HH:MM; defaults to now"
                },
                "notes": {"type": "string", "description": "Free-form notes"}
            },
            "required": ["symptom_name", "recovery_status"]
        }),
        Arc::new(move |args| {
            let store = record_store.clone();
            Box::pin(async move { record(store, args).await })
        }),
    ));

    registry.register(Tool::new(
        "query_symptom",
        "Query the current user's symptom reports. Defaults to the last 14 \
         days; an explicit range is capped at 14 days.",
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
    symptom_name: String,
    recovery_status: String,
    #[serde(default)]
    record_time: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

async fn record(store: Arc<dyn RecordStore<SymptomRecord>>, args: Value) -> String {
    let token_id = match require_token_id() {
        Ok(id) => id,
        Err(e) => return e,
    };
    let args: RecordArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(e) => return format!("error: invalid arguments - {e}"),
    };

    let Some(status) = RecoveryStatus::parse(&args.recovery_status) else {
        return format!(
            "error: recovery status '{}' is not valid; use one of: new, ongoing, recovered",
            args.recovery_status
        );
    };

    let explicit_time = args.record_time.is_some();
    let record_time = match &args.record_time {
        Some(raw) => match parse_datetime(raw) {
            Some(dt) => dt,
            None => {
                return format!(
                    "error: record time '{raw}' is not valid; use YYYY-MM-DD or YYYY-MM-DD HH:MM"
                )
            }
        },
        None => now(),
    };

    let record = SymptomRecord {
        id: Uuid::new_v4(),
        user_id: token_id.clone(),
        symptom_name: args.symptom_name.clone(),
        recovery_status: status,
        record_time,
        notes: args.notes.clone(),
        created_at: now(),
    };

    let result = with_retries("record_symptom", || {
        let store = store.clone();
        let record = record.clone();
        async move { store.create(record).await }
    })
    .await;

    match result {
        Ok(saved) => {
            tracing::info!(user_id = %token_id, record_id = %saved.id, "Recorded symptom");
            let mut reply = format!(
                "Recorded symptom: {} ({})",
                saved.symptom_name,
                saved.recovery_status.as_str()
            );
            if explicit_time {
                reply.push_str(&format!(", time {}", format_datetime(saved.record_time)));
            }
            if let Some(notes) = &saved.notes {
                reply.push_str(&format!(". Notes: {notes}"));
            }
            reply
        }
        Err(e) => format!("error: failed to record symptom - {e}"),
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

async fn query(store: Arc<dyn RecordStore<SymptomRecord>>, args: Value) -> String {
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

    let result = with_retries("query_symptom", || {
        let store = store.clone();
        let token_id = token_id.clone();
        async move { store.get_recent(&token_id, window.start, window.end).await }
    })
    .await;

    let records = match result {
        Ok(records) => records,
        Err(e) => return format!("error: failed to query symptom records - {e}"),
    };

    if records.is_empty() {
        return "No symptom records in this period.".to_string();
    }

    let mut lines = vec![format!("Found {} symptom records:", records.len())];
    for (i, record) in records.iter().enumerate() {
        let mut line = format!(
            "{}. {} - {} ({})",
            i + 1,
            format_datetime(record.record_time),
            record.symptom_name,
            record.recovery_status.as_str()
        );
        if let Some(notes) = &record.notes {
            line.push_str(&format!(", notes: {notes}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TurnContext;
    use crate::repository::MemoryRecordStore;

    fn setup() -> ToolRegistry {
        let registry = ToolRegistry::new();
        register(&registry, Arc::new(MemoryRecordStore::new()));
        registry
    }

    #[tokio::test]
    async fn invalid_recovery_status_is_rejected() {
        let registry = setup();
        let tool = registry.get("record_symptom").unwrap();
        let reply = TurnContext::new("u1", "s", "t")
            .scope(tool.invoke(json!({
                "symptom_name": "headache",
                "recovery_status": "cured"
            })))
            .await;
        assert!(reply.starts_with("error:"));
        assert!(reply.contains("new, ongoing, recovered"));
    }

    #[tokio::test]
    async fn record_then_query() {
        let registry = setup();
        let ctx = TurnContext::new("u1", "s", "t");

        let record = registry.get("record_symptom").unwrap();
        let reply = ctx
            .clone()
            .scope(record.invoke(json!({
                "symptom_name": "dizziness",
                "recovery_status": "new",
                "notes": "mild, in the morning"
            })))
            .await;
        assert!(reply.contains("dizziness"));
        assert!(reply.contains("new"));

        let query = registry.get("query_symptom").unwrap();
        let reply = ctx.scope(query.invoke(json!({}))).await;
        assert!(reply.contains("dizziness"));
        assert!(reply.contains("mild, in the morning"));
    }
}
