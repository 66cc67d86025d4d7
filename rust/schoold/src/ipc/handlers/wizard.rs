use crate::db;
use crate::directory::{Roster, StudentDirectory};
use crate::error::WizardError;
use crate::ipc::error::{err, ok, wizard_err};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request, Session};
use crate::model::{ParentRecord, Student};
use crate::wizard::parent::ParentForm;
use crate::wizard::student::StudentForm;
use crate::wizard::{Advance, SubmitHandler, Wizard, WizardForm};
use anyhow::Context;
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Clone, Copy)]
enum Action {
    Next,
    Submit,
}

fn save_parent(conn: Option<&Connection>, record: &ParentRecord) -> anyhow::Result<()> {
    let conn = conn.context("select a workspace first")?;
    let action = if record.updated_at.is_some() {
        "parent.updated"
    } else {
        "parent.created"
    };
    let tx = conn.unchecked_transaction()?;
    db::parents_upsert(&tx, record)?;
    db::activity_append(&tx, action, Some(&record.id), &record.personal.full_name)?;
    tx.commit()?;
    Ok(())
}

fn save_student(
    conn: Option<&Connection>,
    roster: &mut Roster,
    student: &Student,
) -> anyhow::Result<()> {
    let conn = conn.context("select a workspace first")?;
    let tx = conn.unchecked_transaction()?;
    db::students_upsert(&tx, student)?;
    db::activity_append(&tx, "student.updated", Some(&student.id), &student.full_name())?;
    tx.commit()?;
    roster.upsert(student.clone());
    Ok(())
}

fn student_to_wire(student: &Student) -> Value {
    serde_json::to_value(student).unwrap_or(Value::Null)
}

fn drive<F>(
    wizard: &mut Wizard<F>,
    action: Action,
    save: &mut dyn SubmitHandler<F::Record>,
    present: fn(&F::Record) -> Value,
) -> Result<Advance<Value>, WizardError>
where
    F: WizardForm,
{
    let advance = match action {
        Action::Next => wizard.next(save)?,
        Action::Submit => Advance::Submitted(wizard.submit(save)?),
    };
    Ok(match advance {
        Advance::Moved { to } => Advance::Moved { to },
        Advance::Refused => Advance::Refused,
        Advance::Submitted(record) => Advance::Submitted(present(&record)),
    })
}

fn session_param(req: &Request) -> Result<String, Value> {
    required_str(&req.params, "sessionId")
        .map(str::to_string)
        .map_err(|msg| err(&req.id, "bad_params", msg, None))
}

fn session_not_found(req: &Request) -> Value {
    err(&req.id, "not_found", "wizard session not found", None)
}

fn handle_open(state: &mut AppState, req: &Request) -> Value {
    let kind = match required_str(&req.params, "kind") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    let session = match kind {
        "parent" => match optional_str(&req.params, "parentId") {
            Ok(None) => Session::Parent(Wizard::new(ParentForm::default())),
            Ok(Some(parent_id)) => {
                let Some(conn) = state.db.as_ref() else {
                    return err(&req.id, "no_workspace", "select a workspace first", None);
                };
                match db::parents_get(conn, parent_id) {
                    Ok(Some(record)) => Session::Parent(Wizard::edit(
                        ParentForm::from_record(&record),
                        record.id.clone(),
                        record.created_at.clone(),
                    )),
                    Ok(None) => return err(&req.id, "not_found", "parent not found", None),
                    Err(e) => return err(&req.id, "db_query_failed", format!("{e:#}"), None),
                }
            }
            Err(msg) => return err(&req.id, "bad_params", msg, None),
        },
        "student" => {
            let student_id = match required_str(&req.params, "studentId") {
                Ok(v) => v,
                Err(msg) => return err(&req.id, "bad_params", msg, None),
            };
            let Some(student) = state.roster.find_by_id(student_id) else {
                return err(&req.id, "not_found", "student not found", None);
            };
            Session::Student(Wizard::edit(
                StudentForm::from_student(student),
                student.id.clone(),
                student.updated_at.clone().unwrap_or_default(),
            ))
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown wizard kind: {}", other),
                None,
            )
        }
    };

    let session_id = Uuid::new_v4().to_string();
    let snapshot = session.snapshot();
    state.sessions.insert(session_id.clone(), session);
    tracing::debug!(session_id = %session_id, kind, "wizard opened");
    ok(
        &req.id,
        json!({ "sessionId": session_id, "state": snapshot }),
    )
}

fn handle_state(state: &mut AppState, req: &Request) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.sessions.get(&session_id) {
        Some(session) => ok(&req.id, json!({ "state": session.snapshot() })),
        None => session_not_found(req),
    }
}

fn handle_set_field(state: &mut AppState, req: &Request) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let field = match required_str(&req.params, "field") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let value = req.params.get("value").unwrap_or(&Value::Null);
    let Some(session) = state.sessions.get_mut(&session_id) else {
        return session_not_found(req);
    };
    if let Err(e) = session.set_field_raw(field, value) {
        return wizard_err(&req.id, &e);
    }
    ok(&req.id, json!({ "state": session.snapshot() }))
}

fn handle_advance(state: &mut AppState, req: &Request, action: Action) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let AppState {
        db,
        roster,
        sessions,
        ..
    } = state;
    let conn = db.as_ref();
    let Some(session) = sessions.get_mut(&session_id) else {
        return session_not_found(req);
    };
    if conn.is_none() && session.submit_pending() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }

    let result = match session {
        Session::Parent(w) => {
            let mut save = |r: &ParentRecord| save_parent(conn, r);
            drive(w, action, &mut save, ParentRecord::to_wire)
        }
        Session::Student(w) => {
            let mut save = |s: &Student| save_student(conn, roster, s);
            drive(w, action, &mut save, student_to_wire)
        }
    };
    let advance = match result {
        Ok(a) => a,
        Err(e) => {
            if let WizardError::Save(inner) = &e {
                tracing::warn!(session_id = %session_id, error = %inner, "wizard save failed");
            }
            return wizard_err(&req.id, &e);
        }
    };

    let snapshot = session.snapshot();
    let (advanced, record) = match advance {
        Advance::Moved { .. } => (true, None),
        Advance::Refused => (false, None),
        Advance::Submitted(record) => (false, Some(record)),
    };
    let submitted = record.is_some();
    if submitted {
        sessions.remove(&session_id);
    }
    ok(
        &req.id,
        json!({
            "advanced": advanced,
            "submitted": submitted,
            "record": record,
            "state": snapshot
        }),
    )
}

fn handle_previous(state: &mut AppState, req: &Request) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(session) = state.sessions.get_mut(&session_id) else {
        return session_not_found(req);
    };
    session.previous();
    ok(&req.id, json!({ "state": session.snapshot() }))
}

fn handle_jump(state: &mut AppState, req: &Request) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(step) = req.params.get("step").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "step must be a non-negative integer", None);
    };
    let Some(session) = state.sessions.get_mut(&session_id) else {
        return session_not_found(req);
    };
    if let Err(e) = session.jump_to(step as usize) {
        return wizard_err(&req.id, &e);
    }
    ok(&req.id, json!({ "state": session.snapshot() }))
}

fn handle_children(state: &mut AppState, req: &Request, add: bool) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let AppState {
        roster, sessions, ..
    } = state;
    let Some(session) = sessions.get_mut(&session_id) else {
        return session_not_found(req);
    };
    let Session::Parent(w) = session else {
        return wizard_err(&req.id, &WizardError::ChildrenUnsupported);
    };

    let changed = if add {
        w.add_child(&*roster, student_id)
    } else {
        w.remove_child(student_id)
    };
    ok(
        &req.id,
        json!({
            "changed": changed,
            "children": w.form().children.as_slice(),
            "state": w.snapshot()
        }),
    )
}

fn handle_children_available(state: &mut AppState, req: &Request) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(session) = state.sessions.get(&session_id) else {
        return session_not_found(req);
    };
    let Session::Parent(w) = session else {
        return wizard_err(&req.id, &WizardError::ChildrenUnsupported);
    };
    let students: Vec<_> = w
        .available_students(&state.roster)
        .into_iter()
        .map(|s| {
            json!({
                "id": s.id,
                "fullName": s.full_name(),
                "className": s.class_name(),
            })
        })
        .collect();
    ok(&req.id, json!({ "students": students }))
}

fn handle_close(state: &mut AppState, req: &Request) -> Value {
    let session_id = match session_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let closed = state.sessions.remove(&session_id).is_some();
    ok(&req.id, json!({ "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "wizard.open" => Some(handle_open(state, req)),
        "wizard.state" => Some(handle_state(state, req)),
        "wizard.setField" => Some(handle_set_field(state, req)),
        "wizard.next" => Some(handle_advance(state, req, Action::Next)),
        "wizard.submit" => Some(handle_advance(state, req, Action::Submit)),
        "wizard.previous" => Some(handle_previous(state, req)),
        "wizard.jump" => Some(handle_jump(state, req)),
        "wizard.children.add" => Some(handle_children(state, req, true)),
        "wizard.children.remove" => Some(handle_children(state, req, false)),
        "wizard.children.available" => Some(handle_children_available(state, req)),
        "wizard.close" => Some(handle_close(state, req)),
        _ => None,
    }
}
