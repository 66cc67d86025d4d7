use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_parents_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "parents": [] }));
    };
    let search = match optional_str(&req.params, "search") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    match db::parents_list(conn, search) {
        Ok(parents) => {
            let rows: Vec<_> = parents
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "fullName": p.personal.full_name,
                        "phone": p.contact.phone,
                        "email": p.personal.email,
                        "childCount": p.children.len(),
                        "hasAccountAccess": p.account.has_account_access,
                        "createdAt": p.created_at,
                    })
                })
                .collect();
            ok(&req.id, json!({ "parents": rows }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_parents_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let parent_id = match required_str(&req.params, "parentId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match db::parents_get(conn, parent_id) {
        Ok(Some(p)) => ok(&req.id, json!({ "parent": p.to_wire() })),
        Ok(None) => err(&req.id, "not_found", "parent not found", None),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "parents.list" => Some(handle_parents_list(state, req)),
        "parents.get" => Some(handle_parents_get(state, req)),
        _ => None,
    }
}
