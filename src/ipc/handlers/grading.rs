use crate::assemble::{self, ProcessOptions};
use crate::grade::{self, GradeOutcome};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::rules::SystemId;
use serde_json::json;

fn parse_system(req: &Request) -> Result<SystemId, serde_json::Value> {
    let Some(raw) = req.params.get("system").and_then(|v| v.as_str()) else {
        return Err(err(&req.id, "bad_params", "missing system", None));
    };
    raw.parse::<SystemId>().map_err(|msg| {
        err(
            &req.id,
            "unknown_system",
            msg,
            Some(json!({ "system": raw })),
        )
    })
}

fn parse_string_list(
    req: &Request,
    key: &str,
) -> Result<Option<Vec<String>>, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Ok(None);
    };
    if raw.is_null() {
        return Ok(None);
    }
    let Some(arr) = raw.as_array() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an array of strings", key),
            None,
        ));
    };
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        let Some(s) = v.as_str() else {
            return Err(err(
                &req.id,
                "bad_params",
                format!("{} must contain only strings", key),
                None,
            ));
        };
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(err(
                &req.id,
                "bad_params",
                format!("{} must not contain empty names", key),
                None,
            ));
        }
        out.push(trimmed.to_string());
    }
    Ok(Some(out))
}

/// Grade a single mark under one system. Marks out of range come back as
/// kind `invalid`, missing marks as kind `absent`; neither is an error.
fn handle_grade_for(state: &AppState, req: &Request) -> serde_json::Value {
    let system_id = match parse_system(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mark = match req.params.get("mark") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_f64() {
            Some(m) => Some(m),
            None => return err(&req.id, "bad_params", "mark must be a number or null", None),
        },
    };

    let system = state.rules.get(system_id);
    let result = match grade::grade_for(system, mark) {
        GradeOutcome::Graded(g) => {
            let mut out = serde_json::to_value(&g).unwrap_or_else(|_| json!({}));
            out["kind"] = json!("graded");
            out
        }
        GradeOutcome::Absent => json!({
            "kind": "absent",
            "grade": "ABS",
            "description": "Absent",
            "pass": false,
        }),
        GradeOutcome::Invalid => json!({
            "kind": "invalid",
            "description": "mark out of range (0-100)",
            "pass": false,
        }),
    };
    ok(&req.id, result)
}

/// The full pipeline behind one request: normalize the raw rows, grade and
/// rank every student, aggregate the class, and assemble the result with
/// any non-fatal row errors embedded.
fn handle_process(state: &AppState, req: &Request) -> serde_json::Value {
    let system_id = match parse_system(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(rows) = req.params.get("rows").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing rows", None);
    };
    let subjects = match parse_string_list(req, "subjects") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let principal_subjects = match parse_string_list(req, "principalSubjects") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let external_ids = req
        .params
        .get("externalIds")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let options = ProcessOptions {
        subjects,
        principal_subjects,
        external_ids,
    };
    let result = assemble::process_class(&state.rules, system_id, rows, &options);
    match serde_json::to_value(&result) {
        Ok(value) => ok(&req.id, value),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.gradeFor" => Some(handle_grade_for(state, req)),
        "marks.process" => Some(handle_process(state, req)),
        _ => None,
    }
}
