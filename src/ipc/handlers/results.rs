use crate::assemble;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Both views reshape an already-assembled result; nothing is recomputed
/// here, so a result processed elsewhere round-trips unchanged.
fn required_result<'a>(req: &'a Request) -> Result<&'a serde_json::Value, serde_json::Value> {
    match req.params.get("result") {
        Some(v) if v.is_object() => Ok(v),
        _ => Err(err(&req.id, "bad_params", "missing result object", None)),
    }
}

fn handle_format_for_database(req: &Request) -> serde_json::Value {
    let result = match required_result(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match assemble::database_rows(result) {
        Ok(value) => ok(&req.id, value),
        Err(e) => err(&req.id, &e.code, e.message, e.details),
    }
}

fn handle_summary_report(req: &Request) -> serde_json::Value {
    let result = match required_result(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match assemble::summary_report(result) {
        Ok(value) => ok(&req.id, value),
        Err(e) => err(&req.id, &e.code, e.message, e.details),
    }
}

pub fn try_handle(_state: &AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "results.formatForDatabase" => Some(handle_format_for_database(req)),
        "results.summaryReport" => Some(handle_summary_report(req)),
        _ => None,
    }
}
