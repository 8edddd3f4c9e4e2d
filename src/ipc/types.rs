use crate::rules::RuleBook;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Process-wide state: the validated rule book, loaded once at startup and
/// read-only afterwards. Every request computes from its own params.
pub struct AppState {
    pub rules: RuleBook,
}
