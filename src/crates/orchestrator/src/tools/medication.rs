//! Medication tools: record and query intakes.

use crate::repository::{with_retries, MedicationRecord, RecordStore};
use crate::tools::datetime::{format_datetime, now, parse_datetime, resolve_window};
use crate::tools::registry::{Tool, ToolRegistry};
use crate::tools::require_token_id;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Register the medication tools.
pub fn register(registry: &ToolRegistry, store: Arc<dyn RecordStore<MedicationRecord>>) {
    let record_store = store.clone();
    registry.register(Tool::new(
        "record_medication",
        "Record a medication intake for the current user: medication name, dose \
         amount and unit, optionally the intake time (defaults to now) and notes.",
        json!({
            "type": "object",
            "properties": {
                "medication_name": {"type": "string", "description": "Name of the medication"},
                "dosage": {"type": "integer", "description": "Dose amount"},
                "dosage_unit": {"type": "string", "description": "Dose unit, e.g. tablet, ml, mg"},
                "medication_time": {
                    "type": "string",
                    "description": "Intake time, YYYY-MM-DD or YYYY-MM-DD HH:MM; defaults to now"
                },
                "notes": {"type": "string", "description": "Free-form notes"}
            },
            "required": ["medication_name", "dosage", "dosage_unit"]
        }),
        Arc::new(move |args| {
            let store = record_store.clone();
            Box::pin(async move { record(store, args).await })
        }),
    ));

    registry.register(Tool::new(
        "query_medication",
        "Query the current user's medication records. Defaults to the last 14 \
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
    medication_name: String,
    dosage: i64,
    dosage_unit: String,
    #[serde(default)]
    medication_time: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

async fn record(store: Arc<dyn RecordStore<MedicationRecord>>, args: Value) -> String {
    let token_id = match require_token_id() {
        Ok(id) => id,
        Err(e) => return e,
    };
    let args: RecordArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(e) => return format!("error: invalid arguments - {e}"),
    };

    let explicit_time = args.medication_time.is_some();
    let medication_time = match &args.medication_time {
        Some(raw) => match parse_datetime(raw) {
            Some(dt) => dt,
            None => {
                return format!(
                    "error: medication time '{raw}' is not valid; use YYYY-MM-DD or YYYY-MM-DD HH:MM"
                )
            }
        },
        None => now(),
    };

    let record = MedicationRecord {
        id: Uuid::new_v4(),
        user_id: token_id.clone(),
        medication_name: args.medication_name.clone(),
        dosage: args.dosage,
        dosage_unit: args.dosage_unit.clone(),
        medication_time,
        notes: args.notes.clone(),
        created_at: now(),
    };

    let result = with_retries("record_medication", || {
        let store = store.clone();
        let record = record.clone();
        async move { store.create(record).await }
    })
    .await;

    match result {
        Ok(saved) => {
            tracing::info!(user_id = %token_id, record_id = %saved.id, "Recorded medication");
            let mut reply = format!(
                "Recorded medication: {}, dose {} {}",
                saved.medication_name, saved.dosage, saved.dosage_unit
            );
            if explicit_time {
                reply.push_str(&format!(", time {}", format_datetime(saved.medication_time)));
            }
            if let Some(notes) = &saved.notes {
                reply.push_str(&format!(". Notes: {notes}"));
            }
            reply
        }
        Err(e) => format!("error: failed to record medication - {e}"),
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

async fn query(store: Arc<dyn RecordStore<MedicationRecord>>, args: Value) -> String {
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

    let result = with_retries("query_medication", || {
        let store = store.clone();
        let token_id = token_id.clone();
        async move { store.get_recent(&token_id, window.start, window.end).await }
    })
    .await;

    let records = match result {
        Ok(records) => records,
        Err(e) => return format!("error: failed to query medication records - {e}"),
    };

    if records.is_empty() {
        return "No medication records in this period.".to_string();
    }

    let mut lines = vec![format!("Found {} medication records:", records.len())];
    for (i, record) in records.iter().enumerate() {
        let mut line = format!(
            "{}. {} - {}, dose {} {}",
            i + 1,
            format_datetime(record.medication_time),
            record.medication_name,
            record.dosage,
            record.dosage_unit
        );
        if let Some(notes) = &record.notes {
            line.push_str(&format!(", notes: {notes}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}
