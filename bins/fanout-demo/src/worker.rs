use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fanout_topic::{Message, SubscriberId, Topic, TopicError};

use crate::config::{ConsumerConfig, ProducerConfig};
use crate::report::{ConsumerReport, PRODUCER_ID_STRIDE};

// ═══════════════════════════════════════════════════════════════
//  Producer — publishes `messages` messages, then stops
// ═══════════════════════════════════════════════════════════════

/// Publish the producer's messages; returns how many were accepted.
///
/// Stops early when `token` is cancelled.
pub fn run_producer(
    topic: &Topic,
    cfg: &ProducerConfig,
    token: &CancellationToken,
) -> Result<usize, TopicError> {
    let interval = Duration::from_millis(cfg.interval_ms);
    let mut published = 0;
    for i in 0..cfg.messages {
        if token.is_cancelled() {
            tracing::info!(producer = %cfg.name, published, "producer cancelled");
            break;
        }
        let msg = Message::new(
            i64::from(cfg.id) * PRODUCER_ID_STRIDE + i64::from(i),
            format!("{}_msg_{i}", cfg.name),
        );
        let id = msg.id();
        topic.publish(msg)?;
        published += 1;
        tracing::info!(producer = %cfg.name, id, "published");

        if i + 1 < cfg.messages && !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
    Ok(published)
}

pub fn spawn_producer(
    topic: Arc<Topic>,
    cfg: ProducerConfig,
    token: CancellationToken,
) -> JoinHandle<Result<usize, TopicError>> {
    tokio::task::spawn_blocking(move || run_producer(&topic, &cfg, &token))
}

// ═══════════════════════════════════════════════════════════════
//  Consumer — reads until end-of-stream or its limit
// ═══════════════════════════════════════════════════════════════

pub fn run_consumer(topic: &Topic, cfg: &ConsumerConfig) -> Result<ConsumerReport, TopicError> {
    let sub = SubscriberId::new(cfg.id);
    let mut ids = Vec::new();
    while cfg.limit.is_none_or(|limit| ids.len() < limit) {
        match topic.consume(sub)? {
            Some(msg) => {
                tracing::info!(consumer = %cfg.name, id = msg.id(), payload = msg.payload(), "received");
                ids.push(msg.id());
            }
            None => break,
        }
    }
    tracing::info!(consumer = %cfg.name, received = ids.len(), "consumer finished");
    Ok(ConsumerReport::new(cfg.name.clone(), ids))
}

/// Register the consumer's cursor, then read on a blocking thread.
///
/// Registration happens before this returns, so nothing published
/// afterwards can be missed.
pub fn spawn_consumer(
    topic: Arc<Topic>,
    cfg: ConsumerConfig,
) -> JoinHandle<Result<ConsumerReport, TopicError>> {
    if !topic.register_subscriber(SubscriberId::new(cfg.id)) {
        tracing::warn!(consumer = %cfg.name, id = cfg.id, "subscriber already registered, reusing cursor");
    }
    tokio::task::spawn_blocking(move || run_consumer(&topic, &cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer(id: u32, messages: u32) -> ProducerConfig {
        ProducerConfig {
            id,
            name: format!("P{id}"),
            messages,
            interval_ms: 0,
        }
    }

    fn consumer(id: u32, limit: Option<usize>) -> ConsumerConfig {
        ConsumerConfig {
            id,
            name: format!("C{id}"),
            limit,
        }
    }

    #[test]
    fn producer_stamps_ids_and_payloads() {
        let topic = Topic::new("t");
        topic.register_subscriber(SubscriberId::new(1));
        let n = run_producer(&topic, &producer(2, 3), &CancellationToken::new()).unwrap();
        assert_eq!(n, 3);

        let first = topic.consume(SubscriberId::new(1)).unwrap().unwrap();
        assert_eq!(first.id(), 2000);
        assert_eq!(first.payload(), "P2_msg_0");
    }

    #[test]
    fn cancelled_producer_publishes_nothing() {
        let topic = Topic::new("t");
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(run_producer(&topic, &producer(1, 5), &token).unwrap(), 0);
        assert!(topic.is_empty());
    }

    #[test]
    fn producer_surfaces_shutdown() {
        let topic = Topic::new("t");
        topic.shutdown();
        let err = run_producer(&topic, &producer(1, 1), &CancellationToken::new()).unwrap_err();
        assert_eq!(err, TopicError::AlreadyShutDown("t".into()));
    }

    #[test]
    fn consumer_respects_limit() {
        let topic = Topic::new("t");
        topic.register_subscriber(SubscriberId::new(1));
        run_producer(&topic, &producer(1, 5), &CancellationToken::new()).unwrap();

        let report = run_consumer(&topic, &consumer(1, Some(2))).unwrap();
        assert_eq!(report.ids, vec![1000, 1001]);
        assert_eq!(topic.cursor(SubscriberId::new(1)), Some(2));
    }

    #[test]
    fn consumer_reads_to_end_of_stream() {
        let topic = Topic::new("t");
        topic.register_subscriber(SubscriberId::new(1));
        run_producer(&topic, &producer(1, 3), &CancellationToken::new()).unwrap();
        topic.shutdown();

        let report = run_consumer(&topic, &consumer(1, None)).unwrap();
        assert_eq!(report.received, 3);
        assert!(report.ordered);
    }

    #[test]
    fn unregistered_consumer_is_an_error() {
        let topic = Topic::new("t");
        topic.shutdown();
        let err = run_consumer(&topic, &consumer(4, None)).unwrap_err();
        assert_eq!(err, TopicError::UnknownSubscriber(SubscriberId::new(4)));
    }

    #[tokio::test]
    async fn spawned_workers_fan_out() {
        let topic = Arc::new(Topic::new("t"));
        let readers = vec![
            spawn_consumer(topic.clone(), consumer(1, None)),
            spawn_consumer(topic.clone(), consumer(2, None)),
        ];
        let writer = spawn_producer(topic.clone(), producer(1, 4), CancellationToken::new());
        assert_eq!(writer.await.unwrap().unwrap(), 4);
        topic.shutdown();

        for r in readers {
            let report = r.await.unwrap().unwrap();
            assert_eq!(report.ids, vec![1000, 1001, 1002, 1003]);
        }
    }
}
