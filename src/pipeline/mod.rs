//! Batch request pipeline: request items in, positional results out.
//! Each item succeeds or fails on its own; the batch status reflects the
//! worst item outcome.

pub mod batch;
pub mod item;

use serde::Serialize;
use serde_json::Value;

pub use batch::BatchProcessor;
pub use item::ItemProcessor;

/// Error reported at the position of an item without a string `text`.
pub const MISSING_TEXT: &str = "Missing text key";

/// Result at one position of the response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultItem {
    Success { iso6391code: String, name: String },
    Failure { error: String },
}

impl ResultItem {
    pub fn failure(message: impl Into<String>) -> Self {
        ResultItem::Failure {
            error: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ResultItem::Failure { .. })
    }
}

/// `{"response": [...]}`, one entry per request item, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseEnvelope {
    pub response: Vec<ResultItem>,
}

/// How a single item fared. Ordered by severity, so the worst outcome of a
/// batch is its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    Success,
    /// Detection worked but the code has no display name.
    Degraded,
    Failure,
}

/// The `text` member of a request item, if present and a string.
/// Items that are not JSON objects have no text.
pub fn item_text(item: &Value) -> Option<&str> {
    item.get("text").and_then(Value::as_str)
}
