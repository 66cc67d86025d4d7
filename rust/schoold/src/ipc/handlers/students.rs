use crate::directory::{StudentDirectory, StudentQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_i64_range, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, StudentStatus};
use serde_json::json;

fn student_row(s: &Student) -> serde_json::Value {
    json!({
        "id": s.id,
        "fullName": s.full_name(),
        "className": s.class_name(),
        "gradeLevel": s.grade_level(),
        "status": s.profile.academic.status,
        "email": s.profile.contact.email,
        "studentNumber": s.profile.academic.student_number,
        "guardianName": s.profile.guardian.guardian_name,
    })
}

fn parse_query(req: &Request) -> Result<StudentQuery, String> {
    let search = optional_str(&req.params, "search")?.map(str::to_string);
    let grade = optional_i64_range(&req.params, "grade", 0, 99)?.map(|g| g as u8);
    let status = match optional_str(&req.params, "status")? {
        Some(s) => Some(
            serde_json::from_value::<StudentStatus>(json!(s.to_ascii_lowercase())).map_err(
                |_| "status must be one of: active, inactive, graduated, transferred".to_string(),
            )?,
        ),
        None => None,
    };
    let page = optional_i64_range(&req.params, "page", 1, i64::from(u32::MAX))?.unwrap_or(1);
    let page_size = optional_i64_range(&req.params, "pageSize", 1, MAX_PAGE_SIZE as i64)?
        .unwrap_or(DEFAULT_PAGE_SIZE as i64);
    Ok(StudentQuery {
        search,
        grade,
        status,
        page: page as usize,
        page_size: page_size as usize,
    })
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match parse_query(req) {
        Ok(q) => q,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let page = state.roster.query(&query);
    let rows: Vec<_> = page.students.iter().map(|s| student_row(s)).collect();
    ok(
        &req.id,
        json!({
            "students": rows,
            "total": page.total,
            "page": page.page,
            "pageSize": page.page_size
        }),
    )
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match state.roster.find_by_id(student_id) {
        Some(s) => ok(&req.id, json!({ "student": s })),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        _ => None,
    }
}
