//! The usage document served on `GET /`.

use std::collections::BTreeMap;

use axum::body::Bytes;
use serde::Serialize;

#[derive(Serialize)]
struct FieldSchema {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct UsageResult {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    #[serde(rename = "in")]
    input: BTreeMap<&'static str, FieldSchema>,
    #[serde(rename = "out")]
    output: BTreeMap<&'static str, FieldSchema>,
}

#[derive(Serialize)]
struct UsageDocument {
    result: UsageResult,
}

const STRING: FieldSchema = FieldSchema { kind: "string" };

/// Render the usage document once; handlers serve the bytes as-is.
pub fn render() -> Result<Bytes, serde_json::Error> {
    let doc = UsageDocument {
        result: UsageResult {
            id: "language-detector",
            name: "language-detector",
            description: "Determine language code from text",
            input: BTreeMap::from([("text", STRING)]),
            output: BTreeMap::from([("iso6391code", STRING), ("name", STRING)]),
        },
    };
    serde_json::to_vec(&doc).map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_document() {
        let bytes = render().unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"result":{"id":"language-detector","name":"language-detector","description":"Determine language code from text","in":{"text":{"type":"string"}},"out":{"iso6391code":{"type":"string"},"name":{"type":"string"}}}}"#
        );
    }
}
