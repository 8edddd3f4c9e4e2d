use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &AppState, req: &Request) -> serde_json::Value {
    let systems: Vec<&str> = state.rules.systems().iter().map(|s| s.id.as_str()).collect();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "systems": systems,
            "generatedAt": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// Full rule-book catalogue, for template builders and UI pickers.
fn handle_systems_list(state: &AppState, req: &Request) -> serde_json::Value {
    let systems: Vec<serde_json::Value> = state
        .rules
        .systems()
        .iter()
        .map(|s| {
            json!({
                "id": s.id.as_str(),
                "name": s.name,
                "grades": s.bands,
                "passingGrades": s.passing,
                "divisions": s.divisions,
                "principalCount": s.principal_count,
                "gpa": s.gpa,
            })
        })
        .collect();
    ok(&req.id, json!({ "systems": systems }))
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "systems.list" => Some(handle_systems_list(state, req)),
        _ => None,
    }
}
