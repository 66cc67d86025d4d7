use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::optional_i64_range;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const DEFAULT_LIMIT: i64 = 50;

/// Best-effort audit entry; only workspaces keep an activity log.
pub fn record_activity(state: &AppState, entity_id: &str, action: &str, detail: &str) {
    let Some(conn) = state.db.as_ref() else {
        return;
    };
    if let Err(e) = db::activity_append(conn, action, Some(entity_id), detail) {
        tracing::warn!(action, error = %e, "failed to append activity entry");
    }
}

fn handle_activity_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "entries": [] }));
    };
    let limit = match optional_i64_range(&req.params, "limit", 1, db::MAX_ACTIVITY_LIMIT) {
        Ok(v) => v.unwrap_or(DEFAULT_LIMIT),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match db::activity_list(conn, limit) {
        Ok(entries) => ok(&req.id, json!({ "entries": entries })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "activity.list" => Some(handle_activity_list(state, req)),
        _ => None,
    }
}
