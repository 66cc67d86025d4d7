use super::activity::record_activity;
use crate::features::{unknown_flag_keys, Feature, FeatureFlags};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_bool, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn school_param(state: &mut AppState, req: &Request) -> Result<String, serde_json::Value> {
    match optional_str(&req.params, "schoolId") {
        Ok(Some(id)) => Ok(id.to_string()),
        Ok(None) => Ok(state.current_school_id()),
        Err(msg) => Err(err(&req.id, "bad_params", msg, None)),
    }
}

fn known_features() -> serde_json::Value {
    json!({ "known": Feature::ALL.iter().map(|f| f.key()).collect::<Vec<_>>() })
}

fn flags_result(school_id: &str, flags: &FeatureFlags, persisted: bool) -> serde_json::Value {
    json!({
        "schoolId": school_id,
        "features": flags,
        "persisted": persisted
    })
}

fn handle_current_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let school_id = state.current_school_id();
    ok(&req.id, json!({ "schoolId": school_id }))
}

fn handle_current_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let school_id = match required_str(&req.params, "schoolId") {
        Ok(v) => v.to_string(),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let persisted = state.flags().set_current_school_id(&school_id);
    ok(
        &req.id,
        json!({ "schoolId": school_id, "persisted": persisted }),
    )
}

fn handle_defaults(req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "features": FeatureFlags::default() }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let school_id = match school_param(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let flags = state.flags().get(&school_id);
    ok(
        &req.id,
        json!({ "schoolId": school_id, "features": flags }),
    )
}

fn handle_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let school_id = match school_param(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(raw) = req.params.get("features").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "features must be an object", None);
    };
    let unknown = raw.as_object().map(unknown_flag_keys).unwrap_or_default();
    if !unknown.is_empty() {
        return err(
            &req.id,
            "bad_params",
            format!("unknown feature: {}", unknown.join(", ")),
            Some(known_features()),
        );
    }
    let flags: FeatureFlags = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid features: {e}"), None),
    };

    let persisted = state.flags().set(&school_id, &flags);
    if persisted {
        record_activity(state, &school_id, "features.set", "feature flags replaced");
    }
    ok(&req.id, flags_result(&school_id, &flags, persisted))
}

fn handle_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let school_id = match school_param(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let feature = match required_str(&req.params, "feature") {
        Ok(name) => match Feature::parse(name) {
            Some(f) => f,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("unknown feature: {}", name),
                    Some(known_features()),
                )
            }
        },
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let enabled = match required_bool(&req.params, "enabled") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    let mut store = state.flags();
    let mut flags = store.get(&school_id);
    let changed = flags.is_enabled(feature) != enabled;
    flags.set(feature, enabled);
    let persisted = store.set(&school_id, &flags);
    drop(store);

    if persisted && changed {
        let detail = format!(
            "{} {}",
            feature.key(),
            if enabled { "enabled" } else { "disabled" }
        );
        record_activity(state, &school_id, "features.toggle", &detail);
    }
    ok(&req.id, flags_result(&school_id, &flags, persisted))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "school.current.get" => Some(handle_current_get(state, req)),
        "school.current.set" => Some(handle_current_set(state, req)),
        "features.defaults" => Some(handle_defaults(req)),
        "features.get" => Some(handle_get(state, req)),
        "features.set" => Some(handle_set(state, req)),
        "features.toggle" => Some(handle_toggle(state, req)),
        _ => None,
    }
}
