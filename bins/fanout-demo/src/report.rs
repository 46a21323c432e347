use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;

use fanout_topic::TopicStats;

/// Producer `n` stamps its messages with ids `n * 1000 + i`.
pub const PRODUCER_ID_STRIDE: i64 = 1000;

/// True when the ids of every producer appear in strictly increasing order.
pub fn producer_order_preserved(ids: &[i64]) -> bool {
    let mut last: HashMap<i64, i64> = HashMap::new();
    for &id in ids {
        let producer = id.div_euclid(PRODUCER_ID_STRIDE);
        if let Some(prev) = last.insert(producer, id) {
            if prev >= id {
                return false;
            }
        }
    }
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumerReport {
    pub name: String,
    pub received: usize,
    pub ordered: bool,
    pub ids: Vec<i64>,
}

impl ConsumerReport {
    pub fn new(name: String, ids: Vec<i64>) -> Self {
        Self {
            name,
            received: ids.len(),
            ordered: producer_order_preserved(&ids),
            ids,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub topic: String,
    pub published: usize,
    pub consumers: Vec<ConsumerReport>,
    pub stats: TopicStats,
}

impl RunReport {
    /// Every consumer got every published message, in per-producer order.
    pub fn is_complete(&self) -> bool {
        self.consumers
            .iter()
            .all(|c| c.received == self.published && c.ordered)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- Results: topic '{}' ---", self.topic);
        for c in &self.consumers {
            let order = if c.ordered { "in order" } else { "OUT OF ORDER" };
            let _ = writeln!(out, "Consumer {} received: {} messages ({order})", c.name, c.received);
        }
        let _ = writeln!(out, "Total messages sent: {}", self.published);
        let verdict = if self.is_complete() {
            "every consumer got every message"
        } else {
            "some consumers missed messages"
        };
        let _ = writeln!(out, "Fan-out: {verdict}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(len: usize) -> TopicStats {
        TopicStats {
            name: "T".into(),
            len,
            shut_down: true,
            subscribers: 0,
            cursors: Vec::new(),
        }
    }

    #[test]
    fn interleaved_producers_are_ordered() {
        assert!(producer_order_preserved(&[1000, 2000, 1001, 2001, 2002, 1002]));
        assert!(producer_order_preserved(&[]));
    }

    #[test]
    fn detects_reordering_within_one_producer() {
        assert!(!producer_order_preserved(&[1000, 2000, 1002, 1001]));
        assert!(!producer_order_preserved(&[2000, 2000]));
    }

    #[test]
    fn complete_requires_full_count() {
        let report = RunReport {
            topic: "T".into(),
            published: 3,
            consumers: vec![
                ConsumerReport::new("C1".into(), vec![1000, 2000, 1001]),
                ConsumerReport::new("C2".into(), vec![1000, 2000]),
            ],
            stats: stats(3),
        };
        assert!(!report.is_complete());
        let text = report.render_text();
        assert!(text.contains("Consumer C1 received: 3 messages (in order)"));
        assert!(text.contains("Consumer C2 received: 2 messages"));
        assert!(text.contains("Total messages sent: 3"));
        assert!(text.contains("some consumers missed messages"));
    }

    #[test]
    fn json_report_has_counts() {
        let report = RunReport {
            topic: "T".into(),
            published: 1,
            consumers: vec![ConsumerReport::new("C1".into(), vec![1000])],
            stats: stats(1),
        };
        assert!(report.is_complete());
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["published"], 1);
        assert_eq!(value["consumers"][0]["received"], 1);
        assert_eq!(value["consumers"][0]["ordered"], true);
        assert_eq!(value["stats"]["shut_down"], true);
        assert_eq!(value["stats"]["subscribers"], 0);
    }
}
