//! Golden-file JSON snapshots.
//!
//! Values are serialized as pretty JSON with object keys sorted and a
//! trailing newline, so goldens diff cleanly. Set `BFX_UPDATE_SNAPSHOTS=1` to
//! rewrite goldens instead of comparing.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Environment variable that enables snapshot updates.
pub const UPDATE_SNAPSHOTS_ENV: &str = "BFX_UPDATE_SNAPSHOTS";

/// Assert that `value` matches the JSON snapshot stored at `path`.
///
/// On mismatch the error names the first differing line.
pub fn assert_json_snapshot<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let actual = canonical_json(value)?;

    if updates_enabled() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create snapshot directory {}", parent.display())
            })?;
        }
        return fs::write(path, &actual)
            .with_context(|| format!("Failed to write snapshot {}", path.display()));
    }

    let expected = fs::read_to_string(path).with_context(|| {
        format!(
            "Snapshot missing at {} (run with {UPDATE_SNAPSHOTS_ENV}=1 to create it)",
            path.display()
        )
    })?;

    match first_difference(&expected, &actual) {
        None => Ok(()),
        Some((line, want, got)) => anyhow::bail!(
            "Snapshot mismatch at {}:{line}: expected `{want}`, got `{got}` (run with {UPDATE_SNAPSHOTS_ENV}=1 to update)",
            path.display()
        ),
    }
}

/// Canonical pretty JSON for `value`.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize snapshot value")?;
    let mut out = serde_json::to_string_pretty(&sorted(value))
        .context("Failed to format snapshot JSON")?;
    out.push('\n');
    Ok(out)
}

fn updates_enabled() -> bool {
    std::env::var(UPDATE_SNAPSHOTS_ENV)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn first_difference<'a>(expected: &'a str, actual: &'a str) -> Option<(usize, &'a str, &'a str)> {
    if expected == actual {
        return None;
    }
    let mut want = expected.lines();
    let mut got = actual.lines();
    let mut line = 1;
    loop {
        match (want.next(), got.next()) {
            (Some(a), Some(b)) if a == b => line += 1,
            (None, None) => return Some((line, "<trailing whitespace>", "<trailing whitespace>")),
            (a, b) => return Some((line, a.unwrap_or("<eof>"), b.unwrap_or("<eof>"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_with_trailing_newline() {
        let text = canonical_json(&json!({"b": 1, "a": {"d": 2, "c": 3}})).unwrap();
        assert!(text.ends_with("}\n"));
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let c = text.find("\"c\"").unwrap();
        let d = text.find("\"d\"").unwrap();
        assert!(a < b && c < d);
    }

    #[test]
    fn difference_reports_first_line() {
        assert_eq!(first_difference("x\ny\n", "x\ny\n"), None);
        assert_eq!(first_difference("x\ny\n", "x\nz\n"), Some((2, "y", "z")));
        assert_eq!(first_difference("x\n", "x\nz\n"), Some((2, "<eof>", "z")));
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        if updates_enabled() {
            return;
        }
        let path = std::env::temp_dir().join("battlefx-missing-snapshot/never.json");
        let err = assert_json_snapshot(&path, &json!({"a": 1})).unwrap_err();
        assert!(err.to_string().contains("Snapshot missing"));
    }
}
