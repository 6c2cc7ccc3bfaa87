//! Single-item processing: normalize, detect, resolve the display name.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{item_text, Outcome, ResultItem, MISSING_TEXT};
use crate::codes::{LanguageTable, UNKNOWN_NAME};
use crate::detect::LanguageDetector;
use crate::metrics::{MetricsSink, ObjectStatus, ThroughputLog};
use crate::normalize::TextNormalizer;

/// Turns one request item into one result item.
pub struct ItemProcessor {
    normalizer: TextNormalizer,
    detector: Arc<dyn LanguageDetector>,
    table: Arc<LanguageTable>,
    metrics: Arc<dyn MetricsSink>,
    throughput: ThroughputLog,
}

impl ItemProcessor {
    pub fn new(
        normalizer: TextNormalizer,
        detector: Arc<dyn LanguageDetector>,
        table: Arc<LanguageTable>,
        metrics: Arc<dyn MetricsSink>,
        throughput: ThroughputLog,
    ) -> Self {
        Self {
            normalizer,
            detector,
            table,
            metrics,
            throughput,
        }
    }

    /// Process one item. Never fails as a whole: a bad item becomes a
    /// positional error with outcome `Failure`.
    pub fn process(&self, item: &Value) -> (ResultItem, Outcome) {
        let Some(text) = item_text(item) else {
            self.metrics.object_processed(ObjectStatus::Unsuccessful);
            return (ResultItem::failure(MISSING_TEXT), Outcome::Failure);
        };

        let normalized = self.normalizer.normalize(text);
        let code = self.detector.detect(&normalized);

        let (name, outcome) = match self.table.name_for(&code) {
            Some(name) => (name.to_string(), Outcome::Success),
            None => {
                warn!(code = %code, "Unknown response language code");
                (UNKNOWN_NAME.to_string(), Outcome::Degraded)
            }
        };
        debug!(code = %code, name = %name, chars = normalized.chars().count(), "item_detected");

        self.metrics.language_detected(&name);
        self.metrics.object_processed(ObjectStatus::Successful);
        self.throughput.tick();

        (
            ResultItem::Success {
                iso6391code: code,
                name,
            },
            outcome,
        )
    }
}
