//! Batch processing and status aggregation.

use axum::http::StatusCode;
use serde_json::Value;

use super::{ItemProcessor, Outcome, ResponseEnvelope};

/// HTTP status for the worst outcome seen in a batch.
pub fn status_for(worst: Outcome) -> StatusCode {
    match worst {
        Outcome::Success => StatusCode::OK,
        Outcome::Degraded => StatusCode::NON_AUTHORITATIVE_INFORMATION,
        Outcome::Failure => StatusCode::BAD_REQUEST,
    }
}

/// Runs the item processor over a request array.
pub struct BatchProcessor {
    items: ItemProcessor,
}

impl BatchProcessor {
    pub fn new(items: ItemProcessor) -> Self {
        Self { items }
    }

    /// Process every item in order. A failed item never stops the batch;
    /// the response always has exactly one entry per request item.
    pub fn process_batch(&self, items: &[Value]) -> (ResponseEnvelope, StatusCode) {
        let mut response = Vec::with_capacity(items.len());
        let mut worst = Outcome::Success;

        for item in items {
            let (result, outcome) = self.items.process(item);
            worst = worst.max(outcome);
            response.push(result);
        }

        (ResponseEnvelope { response }, status_for(worst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::LanguageTable;
    use crate::metrics::{NoopMetrics, ThroughputLog};
    use crate::normalize::TextNormalizer;
    use crate::pipeline::ResultItem;
    use serde_json::json;
    use std::sync::Arc;

    /// Detects by the first word: "en ...", "es ...", anything else is "zz".
    fn batch() -> BatchProcessor {
        let detector = |t: &str| match t.split(' ').next() {
            Some("en") => "en".to_string(),
            Some("es") => "es".to_string(),
            _ => "zz".to_string(),
        };
        BatchProcessor::new(ItemProcessor::new(
            TextNormalizer::default(),
            Arc::new(detector),
            Arc::new(LanguageTable::from_pairs([("en", "English"), ("es", "Spanish")])),
            Arc::new(NoopMetrics),
            ThroughputLog::new(1000),
        ))
    }

    fn ok(code: &str, name: &str) -> ResultItem {
        ResultItem::Success {
            iso6391code: code.into(),
            name: name.into(),
        }
    }

    #[test]
    fn all_success_is_200() {
        let items = vec![json!({"text": "en one"}), json!({"text": "es dos"})];
        let (env, status) = batch().process_batch(&items);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(env.response, vec![ok("en", "English"), ok("es", "Spanish")]);
    }

    #[test]
    fn degraded_without_failure_is_203() {
        let items = vec![json!({"text": "en one"}), json!({"text": "fr trois"})];
        let (env, status) = batch().process_batch(&items);
        assert_eq!(status, StatusCode::NON_AUTHORITATIVE_INFORMATION);
        assert_eq!(env.response[1], ok("zz", "Unknown"));
    }

    #[test]
    fn failure_dominates_and_does_not_stop_the_batch() {
        let items = vec![
            json!({"text": "en one"}),
            json!({"nope": "x"}),
            json!({"text": "fr trois"}),
            json!({"text": "es cuatro"}),
        ];
        let (env, status) = batch().process_batch(&items);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            env.response,
            vec![
                ok("en", "English"),
                ResultItem::failure("Missing text key"),
                ok("zz", "Unknown"),
                ok("es", "Spanish"),
            ]
        );
    }

    #[test]
    fn response_length_matches_request() {
        let b = batch();
        for n in [0usize, 1, 7, 64] {
            let items: Vec<Value> = (0..n)
                .map(|i| {
                    if i % 3 == 0 {
                        json!({})
                    } else {
                        json!({"text": "en x"})
                    }
                })
                .collect();
            let (env, _) = b.process_batch(&items);
            assert_eq!(env.response.len(), n);
            for (i, r) in env.response.iter().enumerate() {
                assert_eq!(r.is_failure(), i % 3 == 0, "position {i}");
            }
        }
    }

    #[test]
    fn empty_batch_is_200() {
        let (env, status) = batch().process_batch(&[]);
        assert_eq!(status, StatusCode::OK);
        assert!(env.response.is_empty());
    }
}
