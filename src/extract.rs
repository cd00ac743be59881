use serde::Serialize;
use serde_json::{Number, Value};

use crate::text::trim;

/// A JSON block separated from the prose around it in a model response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExtractedPayload {
    /// Pretty-printed JSON, the raw braced span when it does not parse, or empty.
    pub json: String,
    /// Text outside the braced span, trimmed.
    pub note: String,
}

impl ExtractedPayload {
    pub fn has_json(&self) -> bool {
        !self.json.is_empty()
    }
}

/// Takes the span from the first `{` to the last `}`. Multiple or nested
/// top-level objects are not told apart.
pub fn extract_json(text: &str) -> ExtractedPayload {
    if text.is_empty() {
        return ExtractedPayload::default();
    }
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return note_only(text);
    };
    if end <= start {
        return note_only(text);
    }

    let candidate = &text[start..=end];
    let mut note = String::with_capacity(text.len() - candidate.len());
    note.push_str(&text[..start]);
    note.push_str(&text[end + 1..]);
    let note = trim(&note).to_string();

    let json = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => serde_json::to_string_pretty(&normalize_numbers(value))
            .unwrap_or_else(|_| candidate.to_string()),
        Err(err) => {
            tracing::debug!(error = %err, "embedded JSON did not parse; keeping raw span");
            candidate.to_string()
        }
    };
    ExtractedPayload { json, note }
}

/// Rewrites numbers the way a JavaScript round trip prints them. Every number
/// is read as a double, integral values lose their fraction and values outside
/// double range become `null`.
fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(number) => normalize_number(&number),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, normalize_numbers(value)))
                .collect(),
        ),
        other => other,
    }
}

const MAX_PLAIN_INTEGER: f64 = 1e21;

fn normalize_number(number: &Number) -> Value {
    let Some(float) = number.as_f64() else {
        return Value::Null;
    };
    if float == 0.0 {
        return Value::Number(0.into());
    }
    if float.fract() == 0.0 && float.abs() < MAX_PLAIN_INTEGER {
        // Display prints the shortest round-trip digits without an exponent.
        return Value::Number(Number::from_string_unchecked(float.to_string()));
    }
    Number::from_f64(float).map_or(Value::Null, Value::Number)
}

fn note_only(text: &str) -> ExtractedPayload {
    ExtractedPayload {
        json: String::new(),
        note: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn separates_json_from_surrounding_prose() {
        let payload = extract_json("Here is data: {\"a\":1,\"b\":2} thanks");
        assert_eq!(payload.note, "Here is data:  thanks");
        let parsed: serde_json::Value = serde_json::from_str(&payload.json).expect("json");
        assert_eq!(parsed, serde_json::json!({"a": 1, "b": 2}));
        assert_snapshot!(payload.json, @r###"
        {
          "a": 1,
          "b": 2
        }
        "###);
    }

    #[test]
    fn keeps_raw_span_when_json_is_invalid() {
        let payload = extract_json("prefix {not valid json} suffix");
        assert_eq!(payload.json, "{not valid json}");
        assert_eq!(payload.note, "prefix  suffix");
    }

    #[test]
    fn text_without_braces_is_all_note() {
        let payload = extract_json("just plain text");
        assert_eq!(payload.json, "");
        assert_eq!(payload.note, "just plain text");
        assert!(!payload.has_json());
    }

    #[test]
    fn reversed_braces_are_not_extracted() {
        let payload = extract_json("  } backwards {  ");
        assert_eq!(payload.json, "");
        assert_eq!(payload.note, "  } backwards {  ");
    }

    #[test]
    fn empty_input_gives_empty_payload() {
        assert_eq!(extract_json(""), ExtractedPayload::default());
    }

    #[test]
    fn key_order_is_preserved() {
        let payload = extract_json(r#"{"summary":"s","keywords":["k"],"extractedText":"t"}"#);
        assert_eq!(payload.note, "");
        let keys: Vec<&str> = payload
            .json
            .lines()
            .filter_map(|line| line.trim().strip_prefix('"'))
            .filter_map(|line| line.split('"').next())
            .collect();
        assert_eq!(keys, vec!["summary", "keywords", "k", "extractedText"]);
    }

    #[test]
    fn integral_floats_print_as_integers() {
        let payload = extract_json("x {\"a\":1.0,\"b\":1e2,\"c\":-0.0,\"d\":2.50} y");
        assert_eq!(payload.note, "x  y");
        assert_snapshot!(payload.json, @r###"
        {
          "a": 1,
          "b": 100,
          "c": 0,
          "d": 2.5
        }
        "###);
    }

    #[test]
    fn out_of_range_numbers_still_parse() {
        let payload = extract_json("{\"a\":1e400,\"b\":[-1e400, 12]}");
        assert_eq!(payload.json, "{\n  \"a\": null,\n  \"b\": [\n    null,\n    12\n  ]\n}");
    }

    #[test]
    fn numbers_follow_double_precision() {
        let payload = extract_json("{\"id\":9007199254740993,\"big\":1e20}");
        assert_eq!(
            payload.json,
            "{\n  \"id\": 9007199254740992,\n  \"big\": 100000000000000000000\n}"
        );
    }

    #[test]
    fn spans_from_first_open_to_last_close() {
        let payload = extract_json("a {\"x\":1} b {\"y\":2} c");
        assert_eq!(payload.json, "{\"x\":1} b {\"y\":2}");
        assert_eq!(payload.note, "a  c");
    }
}
