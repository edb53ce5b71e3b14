// ABOUTME: Built-in selection policies - fixed group size and nearest property value.
// ABOUTME: Both serialize their configuration for the startup policy artifact.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Partition, PolicyDescription, Selection, SelectionPolicy};
use crate::replica::Replica;

/// Exchange as soon as `exchange_size` replicas are waiting.
///
/// When it fires, the whole waitlist exchanges and nothing remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSizePolicy {
    pub exchange_size: usize,
}

impl GroupSizePolicy {
    pub fn new(exchange_size: usize) -> Self {
        Self { exchange_size }
    }
}

impl SelectionPolicy for GroupSizePolicy {
    fn name(&self) -> &str {
        "group_size"
    }

    fn describe(&self) -> PolicyDescription {
        PolicyDescription::new(
            self.name(),
            serde_json::to_value(self).unwrap_or(Value::Null),
        )
    }

    fn select(&self, waitlist: &[Arc<Replica>], _criteria: &Value) -> Selection {
        if waitlist.len() < self.exchange_size {
            return Selection::NotYet;
        }
        Selection::Exchange(Partition::new(waitlist.to_vec(), Vec::new()))
    }
}

/// Pair the newest arrival with the waiting replica whose numeric
/// `property` is closest to its own.
///
/// The pair exchanges; everyone else keeps waiting. A `max_gap` in the
/// criteria object overrides the configured one. Replicas without a
/// numeric value for `property` are never paired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestPropertyPolicy {
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gap: Option<f64>,
}

impl NearestPropertyPolicy {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            max_gap: None,
        }
    }

    /// Only pair replicas whose values differ by at most `gap`.
    pub fn max_gap(mut self, gap: f64) -> Self {
        self.max_gap = Some(gap);
        self
    }

    fn gap_limit(&self, criteria: &Value) -> Option<f64> {
        criteria
            .get("max_gap")
            .and_then(Value::as_f64)
            .or(self.max_gap)
    }
}

impl SelectionPolicy for NearestPropertyPolicy {
    fn name(&self) -> &str {
        "nearest_property"
    }

    fn describe(&self) -> PolicyDescription {
        PolicyDescription::new(
            self.name(),
            serde_json::to_value(self).unwrap_or(Value::Null),
        )
    }

    fn select(&self, waitlist: &[Arc<Replica>], criteria: &Value) -> Selection {
        let Some((newest, waiting)) = waitlist.split_last() else {
            return Selection::NotYet;
        };
        let Some(value) = newest.property_f64(&self.property) else {
            return Selection::NotYet;
        };

        let nearest = waiting
            .iter()
            .filter_map(|r| {
                r.property_f64(&self.property)
                    .map(|v| (r.id(), (v - value).abs()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((partner, gap)) = nearest else {
            return Selection::NotYet;
        };
        if let Some(limit) = self.gap_limit(criteria) {
            if gap > limit {
                return Selection::NotYet;
            }
        }

        let newest_id = newest.id();
        Selection::Exchange(Partition::split_by(waitlist, |r| {
            r.id() == partner || r.id() == newest_id
        }))
    }
}
