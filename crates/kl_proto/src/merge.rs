//! Deep state merge.
//!
//! A mutating operation produces a *partial* state (a role change, a
//! re-keyed member list) that must be combined with the last known state
//! before the whole object is re-encrypted and re-uploaded. Arrays are
//! concatenated rather than replaced — the key history and member lists
//! are append-only, overwriting would drop epochs.

use serde_json::Value;

/// Merge `updates` on top of `current`. Pure: neither input is mutated.
///
/// Rules:
/// - object + object: recursive merge, update keys win
/// - array + array: concatenation, current's items first
/// - `Null` in updates is treated as "no update" (current is kept)
/// - anything else: the update replaces the current value
pub fn merge_state(current: &Value, updates: &Value) -> Value {
    match (current, updates) {
        (_, Value::Null) => current.clone(),
        (Value::Object(cur), Value::Object(upd)) => {
            let mut merged = cur.clone();
            for (key, upd_value) in upd {
                let next = match merged.get(key) {
                    Some(cur_value) => merge_state(cur_value, upd_value),
                    None => merge_state(&Value::Null, upd_value),
                };
                if !next.is_null() {
                    merged.insert(key.clone(), next);
                }
            }
            Value::Object(merged)
        }
        (Value::Array(cur), Value::Array(upd)) => {
            let mut merged = cur.clone();
            merged.extend(upd.iter().cloned());
            Value::Array(merged)
        }
        (_, upd) => upd.clone(),
    }
}
