use crate::directory::{Roster, StudentDirectory};
use crate::model::{ParentRecord, Student};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

pub const DB_FILE: &str = "schoold.sqlite3";
pub const MAX_ACTIVITY_LIMIT: i64 = 500;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let conn = Connection::open(workspace.join(DB_FILE))?;
    init_schema(&conn)?;
    seed_students(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            class_name TEXT NOT NULL,
            status TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            record_json TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_sort ON students(sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS parents(
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            record_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_parents_name ON parents(full_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activity_log(
            id TEXT PRIMARY KEY,
            seq INTEGER NOT NULL,
            at TEXT NOT NULL,
            action TEXT NOT NULL,
            entity_id TEXT,
            detail TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_activity_log_seq ON activity_log(seq)",
        [],
    )?;
    Ok(())
}

/// New workspaces start with the demo roster.
fn seed_students(conn: &Connection) -> anyhow::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    if count > 0 {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    for student in Roster::builtin().list_all() {
        students_upsert(&tx, student)?;
    }
    tx.commit()?;
    tracing::info!("seeded workspace with demo roster");
    Ok(())
}

pub fn students_load(conn: &Connection) -> anyhow::Result<Vec<Student>> {
    let mut stmt = conn.prepare("SELECT id, record_json FROM students ORDER BY sort_order, id")?;
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let json: String = row.get(1)?;
            Ok((id, json))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut students = Vec::with_capacity(rows.len());
    for (id, json) in rows {
        match serde_json::from_str::<Student>(&json) {
            Ok(s) => students.push(s),
            Err(e) => {
                tracing::warn!(student_id = %id, error = %e, "skipping unreadable student row")
            }
        }
    }
    Ok(students)
}

pub fn students_upsert(conn: &Connection, student: &Student) -> anyhow::Result<()> {
    let json = serde_json::to_string(student)?;
    let status = serde_json::to_value(student.profile.academic.status)?
        .as_str()
        .unwrap_or("active")
        .to_string();
    conn.execute(
        "INSERT INTO students(
           id, full_name, class_name, status, sort_order, record_json, updated_at
         )
         VALUES(?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(sort_order), -1) + 1 FROM students), ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           full_name = excluded.full_name,
           class_name = excluded.class_name,
           status = excluded.status,
           record_json = excluded.record_json,
           updated_at = excluded.updated_at",
        (
            &student.id,
            student.full_name(),
            student.class_name(),
            status,
            json,
            &student.updated_at,
        ),
    )?;
    Ok(())
}

pub fn parents_upsert(conn: &Connection, parent: &ParentRecord) -> anyhow::Result<()> {
    let json = serde_json::to_string(parent)?;
    conn.execute(
        "INSERT INTO parents(id, full_name, record_json, created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           full_name = excluded.full_name,
           record_json = excluded.record_json,
           updated_at = excluded.updated_at",
        (
            &parent.id,
            &parent.personal.full_name,
            json,
            &parent.created_at,
            &parent.updated_at,
        ),
    )?;
    Ok(())
}

pub fn parents_get(conn: &Connection, parent_id: &str) -> anyhow::Result<Option<ParentRecord>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT record_json FROM parents WHERE id = ?",
            [parent_id],
            |r| r.get(0),
        )
        .optional()?;
    match json {
        Some(j) => {
            let record = serde_json::from_str(&j)
                .with_context(|| format!("parent {} is unreadable", parent_id))?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Parents whose name contains `search` (case-insensitive), by name.
pub fn parents_list(conn: &Connection, search: Option<&str>) -> anyhow::Result<Vec<ParentRecord>> {
    let pattern = format!("%{}%", search.unwrap_or("").trim().to_lowercase());
    let mut stmt = conn.prepare(
        "SELECT id, record_json FROM parents
         WHERE lower(full_name) LIKE ?
         ORDER BY full_name COLLATE NOCASE, created_at",
    )?;
    let rows = stmt
        .query_map([pattern], |row| {
            let id: String = row.get(0)?;
            let json: String = row.get(1)?;
            Ok((id, json))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut parents = Vec::with_capacity(rows.len());
    for (id, json) in rows {
        match serde_json::from_str::<ParentRecord>(&json) {
            Ok(p) => parents.push(p),
            Err(e) => tracing::warn!(parent_id = %id, error = %e, "skipping unreadable parent row"),
        }
    }
    Ok(parents)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub at: String,
    pub action: String,
    pub entity_id: Option<String>,
    pub detail: String,
}

pub fn activity_append(
    conn: &Connection,
    action: &str,
    entity_id: Option<&str>,
    detail: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO activity_log(id, seq, at, action, entity_id, detail)
         VALUES(?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM activity_log), ?2, ?3, ?4, ?5)",
        (
            uuid::Uuid::new_v4().to_string(),
            chrono::Utc::now().to_rfc3339(),
            action,
            entity_id,
            detail,
        ),
    )?;
    Ok(())
}

/// Newest first.
pub fn activity_list(conn: &Connection, limit: i64) -> anyhow::Result<Vec<ActivityEntry>> {
    let limit = limit.clamp(1, MAX_ACTIVITY_LIMIT);
    let mut stmt = conn.prepare(
        "SELECT id, at, action, entity_id, detail FROM activity_log
         ORDER BY seq DESC
         LIMIT ?",
    )?;
    let entries = stmt
        .query_map([limit], |row| {
            Ok(ActivityEntry {
                id: row.get(0)?,
                at: row.get(1)?,
                action: row.get(2)?,
                entity_id: row.get(3)?,
                detail: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}
