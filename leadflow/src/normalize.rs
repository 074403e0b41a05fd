//! Raw record normalization.
//!
//! Backing stores disagree on everything: key names, casing, whether a
//! number is a number or a formatted string. This module is the one place
//! that heterogeneity is absorbed. Each canonical field resolves through an
//! ordered alias list (matched case-insensitively), the first non-empty
//! candidate wins, and every missing or malformed value falls back to a
//! default — [`normalize`] is total over arbitrary JSON and never panics.

use chrono::Utc;
use rand::{RngExt, distr::Alphanumeric};
use serde_json::Value;

use crate::lead::{Amount, Lead, LeadEvent, Priority};
use crate::workflow::SUBMITTED;

/// Ordered candidate keys per canonical field. Matching folds keys with
/// [`fold_key`], so `"Lead ID"`, `"lead_id"` and `"LEAD_ID"` all hit.
mod aliases {
    pub const ID: &[&str] = &["id", "lead_id", "ref_no", "lead id"];
    pub const CLIENT: &[&str] = &["client", "client_name", "name", "customer name", "applicant"];
    pub const PHONE: &[&str] = &["phone", "mobile", "contact", "mobile no"];
    pub const AMOUNT: &[&str] = &["amount", "loan_amount", "requested_amount", "amt"];
    pub const PRODUCT: &[&str] = &["type", "loan_type", "product", "product_type", "category"];
    pub const STATUS: &[&str] = &["status", "current_status", "stage", "application_status"];
    pub const AGENT: &[&str] = &["agent", "agent_name", "sourced_by", "agent id"];
    pub const CIBIL: &[&str] = &["cibil", "cibil_score", "score", "credit_score"];
    pub const PRIORITY: &[&str] = &["priority"];
    pub const NOTE: &[&str] = &["note", "notes", "remarks", "comments"];
    pub const CREATED: &[&str] = &["date", "timestamp", "created_at"];
    pub const SOURCE: &[&str] = &["source_record_id"];
}

/// Default client name when no candidate resolves.
pub const UNKNOWN_CLIENT: &str = "Unknown Client";

/// Default agent when no candidate resolves (shared/system ownership).
pub const DEFAULT_AGENT: &str = "System";

/// Default product type, matching the dominant product in source data.
pub const DEFAULT_PRODUCT: &str = "BL";

/// Generate a fresh lead id: `L-` plus a 6-char uppercase token.
#[must_use]
pub fn generate_lead_id() -> String {
    let token: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("L-{}", token.to_ascii_uppercase())
}

/// Strip everything but digits and dots, then parse.
///
/// Handles Indian-grouped strings like `"1,50,000"` and currency prefixes;
/// anything unparsable is `0.0`.
#[must_use]
pub fn parse_amount(raw: &str) -> f64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    digits.parse().unwrap_or(0.0)
}

/// False for administrative payloads (chat/log records) that share the
/// lead feed but are not leads.
#[must_use]
pub fn is_lead_row(raw: &Value) -> bool {
    let Some(map) = raw.as_object() else {
        return false;
    };
    let kind = map
        .iter()
        .find(|(k, _)| fold_key(k) == "type")
        .map(|(_, v)| coerce_string(v))
        .unwrap_or_default();
    !matches!(kind.to_ascii_uppercase().as_str(), "CHAT" | "LOG")
}

/// Map any raw row into the canonical [`Lead`] shape.
///
/// Every field is coerced to a string except the parsed numeric amount, so
/// downstream handling is uniform regardless of source typing. Normalizing
/// the JSON serialization of an already-canonical lead is stable: no fresh
/// id, same field values, history carried through.
#[must_use]
pub fn normalize(raw: &Value) -> Lead {
    let source_id = resolve_string(raw, aliases::ID);
    let id = source_id.clone().unwrap_or_else(generate_lead_id);

    let (amount_value, amount_display) = resolve_amount(raw);

    let cibil_score = resolve_string(raw, aliases::CIBIL)
        .map(|s| parse_amount(&s) as i64)
        .filter(|v| *v > 0);

    let history = raw
        .get("history")
        .and_then(|h| serde_json::from_value::<Vec<LeadEvent>>(h.clone()).ok())
        .unwrap_or_default();

    Lead {
        source_record_id: resolve_string(raw, aliases::SOURCE)
            .or(source_id)
            .unwrap_or_else(|| id.clone()),
        client: resolve_string(raw, aliases::CLIENT).unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
        phone: resolve_string(raw, aliases::PHONE).unwrap_or_default(),
        amount: Amount::new(amount_value, amount_display),
        product_type: resolve_string(raw, aliases::PRODUCT)
            .unwrap_or_else(|| DEFAULT_PRODUCT.to_string()),
        status: resolve_string(raw, aliases::STATUS).unwrap_or_else(|| SUBMITTED.to_string()),
        agent: resolve_string(raw, aliases::AGENT).unwrap_or_else(|| DEFAULT_AGENT.to_string()),
        priority: Priority::parse(&resolve_string(raw, aliases::PRIORITY).unwrap_or_default()),
        note: resolve_string(raw, aliases::NOTE).unwrap_or_default(),
        created_at: resolve_string(raw, aliases::CREATED)
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
        cibil_score,
        history,
        id,
    }
}

/// Resolve the first non-empty candidate for `keys`, coerced to a string.
fn resolve_string(raw: &Value, keys: &[&str]) -> Option<String> {
    resolve(raw, keys).map(coerce_string).filter(|s| !s.is_empty())
}

/// Resolve the amount field: numeric value plus original display string.
///
/// A canonical re-ingested lead carries `{"value": .., "display": ".."}`
/// here; flat sources carry a bare string or number.
fn resolve_amount(raw: &Value) -> (f64, String) {
    let Some(value) = resolve(raw, aliases::AMOUNT) else {
        return (0.0, "0".to_string());
    };
    if let Some(obj) = value.as_object() {
        let display = obj.get("display").map(coerce_string).unwrap_or_default();
        let parsed = obj
            .get("value")
            .and_then(Value::as_f64)
            .unwrap_or_else(|| parse_amount(&display));
        return (parsed, if display.is_empty() { "0".to_string() } else { display });
    }
    let display = coerce_string(value);
    if display.is_empty() {
        return (0.0, "0".to_string());
    }
    (parse_amount(&display), display)
}

fn resolve<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = raw.as_object()?;
    for candidate in keys {
        let hit = map
            .iter()
            .find(|(k, v)| fold_key(k) == *candidate && !is_empty_value(v));
        if let Some((_, v)) = hit {
            return Some(v);
        }
    }
    None
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Uniform string coercion: strings pass through trimmed, numbers and bools
/// render, null and composite values are empty (and therefore skipped by
/// first-non-empty resolution).
fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn fold_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}
