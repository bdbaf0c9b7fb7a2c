//! Structured-tag primitives shared with the host persistence layer.
//!
//! A "tag" is the host simulation's generic structured payload; here it is
//! a JSON object. Variants serialize into sub-tags, schedules into a tag
//! of named fields with one list-of-compound field per collection.

use crate::error::{Result, ScheduleError};
use serde_json::{Map, Value};

pub type Tag = Map<String, Value>;

// ---------------------------------------------------------------------------
// List-of-compound helpers
// ---------------------------------------------------------------------------

/// Write a slice as a list of compound tags through a per-item writer.
pub fn write_compound_list<T>(
    items: &[T],
    mut write: impl FnMut(&T) -> Result<Tag>,
) -> Result<Value> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(Value::Object(write(item)?));
    }
    Ok(Value::Array(out))
}

/// Read a list-of-compound field through a per-item reader.
///
/// A missing or non-list value reads as empty. Elements that are not
/// compounds, and elements the reader declines (`None`), are dropped.
pub fn read_compound_list<T>(
    value: Option<&Value>,
    mut read: impl FnMut(&Tag) -> Option<T>,
) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object())
            .filter_map(|tag| read(tag))
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Checked accessors
// ---------------------------------------------------------------------------

pub fn get_str<'a>(tag: &'a Tag, key: &str) -> Result<&'a str> {
    tag.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| wrong_shape(key, "string"))
}

pub fn get_bool(tag: &Tag, key: &str) -> Result<bool> {
    tag.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| wrong_shape(key, "bool"))
}

pub fn get_u32(tag: &Tag, key: &str) -> Result<u32> {
    tag.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| wrong_shape(key, "u32"))
}

pub fn get_f32(tag: &Tag, key: &str) -> Result<f32> {
    tag.get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .ok_or_else(|| wrong_shape(key, "number"))
}

pub fn get_object<'a>(tag: &'a Tag, key: &str) -> Result<&'a Tag> {
    tag.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| wrong_shape(key, "compound"))
}

/// Absent or ill-shaped sub-tags read as empty; variant `load_data`
/// decides whether missing fields are an error.
pub fn object_or_empty(tag: &Tag, key: &str) -> Tag {
    tag.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

pub fn u32_or(tag: &Tag, key: &str, default: u32) -> u32 {
    tag.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}

fn wrong_shape(key: &str, expected: &str) -> ScheduleError {
    ScheduleError::MalformedTag(format!("missing or non-{expected} field '{key}'"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Tag {
        let Value::Object(tag) = json!({
            "Name": "depot",
            "Count": 3,
            "Flag": true,
            "Nested": { "A": 1 },
        }) else {
            unreachable!()
        };
        tag
    }

    #[test]
    fn accessors_read_matching_shapes() {
        let tag = sample();
        assert_eq!(get_str(&tag, "Name").unwrap(), "depot");
        assert_eq!(get_u32(&tag, "Count").unwrap(), 3);
        assert!(get_bool(&tag, "Flag").unwrap());
        assert_eq!(get_object(&tag, "Nested").unwrap().len(), 1);
    }

    #[test]
    fn accessors_reject_wrong_shapes() {
        let tag = sample();
        assert!(matches!(
            get_str(&tag, "Count"),
            Err(ScheduleError::MalformedTag(_))
        ));
        assert!(matches!(
            get_u32(&tag, "Missing"),
            Err(ScheduleError::MalformedTag(_))
        ));
        assert!(matches!(
            get_object(&tag, "Name"),
            Err(ScheduleError::MalformedTag(_))
        ));
    }

    #[test]
    fn defaults_for_optional_fields() {
        let tag = sample();
        assert_eq!(u32_or(&tag, "Count", 9), 3);
        assert_eq!(u32_or(&tag, "Missing", 9), 9);
        assert!(object_or_empty(&tag, "Missing").is_empty());
        assert_eq!(object_or_empty(&tag, "Nested").len(), 1);
    }

    #[test]
    fn compound_list_roundtrip_preserves_order() {
        let items = vec!["a", "b", "c"];
        let list = write_compound_list(&items, |s| {
            let mut tag = Tag::new();
            tag.insert("V".into(), Value::String((*s).to_string()));
            Ok(tag)
        })
        .unwrap();
        let back = read_compound_list(Some(&list), |tag| {
            get_str(tag, "V").ok().map(str::to_string)
        });
        assert_eq!(back, vec!["a", "b", "c"]);
    }

    #[test]
    fn read_compound_list_skips_non_compounds() {
        let list = json!([{ "V": "a" }, 42, "stray", { "V": "b" }]);
        let back = read_compound_list(Some(&list), |tag| {
            get_str(tag, "V").ok().map(str::to_string)
        });
        assert_eq!(back, vec!["a", "b"]);
    }

    #[test]
    fn read_compound_list_tolerates_absence() {
        let back: Vec<String> = read_compound_list(None, |_| None);
        assert!(back.is_empty());
        let not_a_list = json!("oops");
        let back: Vec<String> = read_compound_list(Some(&not_a_list), |_| None);
        assert!(back.is_empty());
    }
}
