use std::collections::HashMap;
use std::sync::{Condvar, LockResult, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use crate::config::{AfterShutdown, TopicConfig};
use crate::error::TopicError;
use crate::message::{Message, SubscriberId};

/// Outcome of [`Topic::consume_timeout`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Delivery {
    Message(Message),
    /// Topic is shut down and the cursor has reached the end of the log.
    EndOfStream,
    TimedOut,
}

impl Delivery {
    pub fn into_message(self) -> Option<Message> {
        match self {
            Delivery::Message(m) => Some(m),
            Delivery::EndOfStream | Delivery::TimedOut => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorStats {
    pub subscriber: SubscriberId,
    pub offset: usize,
    pub lag: usize,
}

/// Point-in-time view of a topic, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    pub name: String,
    pub len: usize,
    pub shut_down: bool,
    pub subscribers: usize,
    pub cursors: Vec<CursorStats>,
}

struct State {
    log: Vec<Message>,
    cursors: HashMap<SubscriberId, usize>,
    shutting_down: bool,
}

impl State {
    /// Wait predicate: unread data for `id`, or nothing more will ever arrive.
    fn is_ready(&self, id: SubscriberId) -> bool {
        self.shutting_down || self.cursors.get(&id).is_some_and(|&c| c < self.log.len())
    }

    fn advance(&mut self, id: SubscriberId) -> Option<Message> {
        let cursor = self.cursors.get_mut(&id)?;
        let msg = self.log.get(*cursor)?.clone();
        *cursor += 1;
        Some(msg)
    }
}

/// Append-only broadcast log with one read cursor per subscriber.
///
/// Every registered subscriber reads the whole retained history in publish
/// order, independently of the others. Messages are never removed, so memory
/// grows with the log for as long as the topic lives.
///
/// All state sits behind one mutex; a single condvar wakes consumers on
/// publish and on shutdown.
pub struct Topic {
    name: String,
    config: TopicConfig,
    state: Mutex<State>,
    ready: Condvar,
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic").field("name", &self.name).finish()
    }
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, TopicConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: TopicConfig) -> Self {
        let log = Vec::with_capacity(config.initial_capacity);
        Self {
            name: name.into(),
            config,
            state: Mutex::new(State {
                log,
                cursors: HashMap::new(),
                shutting_down: false,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TopicConfig {
        &self.config
    }

    fn recover<G>(&self, result: LockResult<G>) -> G {
        result.unwrap_or_else(|poisoned| {
            tracing::warn!(topic = %self.name, "topic lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.recover(self.state.lock())
    }

    /// Create a cursor at offset 0 for `id`.
    ///
    /// Returns `false` if `id` already had a cursor; it is left where it was.
    /// New subscribers see the full retained history, including messages
    /// published before they registered.
    pub fn register_subscriber(&self, id: SubscriberId) -> bool {
        let mut state = self.lock();
        if state.cursors.contains_key(&id) {
            return false;
        }
        state.cursors.insert(id, 0);
        tracing::debug!(topic = %self.name, subscriber = %id, backlog = state.log.len(), "registered subscriber");
        true
    }

    /// Append `message` and wake every waiting consumer.
    ///
    /// After [`shutdown`](Self::shutdown) the behaviour follows
    /// [`TopicConfig::after_shutdown`].
    pub fn publish(&self, message: Message) -> Result<(), TopicError> {
        let mut state = self.lock();
        if state.shutting_down {
            return match self.config.after_shutdown {
                AfterShutdown::Reject => Err(TopicError::AlreadyShutDown(self.name.clone())),
                AfterShutdown::Drop => {
                    tracing::warn!(topic = %self.name, id = message.id(), "topic shut down, dropping message");
                    Ok(())
                }
            };
        }
        let offset = state.log.len();
        tracing::debug!(topic = %self.name, offset, id = message.id(), "published");
        state.log.push(message);
        drop(state);
        self.ready.notify_all();
        Ok(())
    }

    /// Block until the next message for `id` is available.
    ///
    /// Returns `Ok(None)` once the topic is shut down and `id` has read
    /// everything; backlog published before shutdown is still delivered first.
    pub fn consume(&self, id: SubscriberId) -> Result<Option<Message>, TopicError> {
        let state = self.lock();
        if !state.cursors.contains_key(&id) {
            return Err(TopicError::UnknownSubscriber(id));
        }
        let mut state = self.recover(self.ready.wait_while(state, |s| !s.is_ready(id)));
        let next = state.advance(id);
        if next.is_none() {
            tracing::debug!(topic = %self.name, subscriber = %id, "end of stream");
        }
        Ok(next)
    }

    /// Like [`consume`](Self::consume) but gives up after `timeout`.
    ///
    /// A zero timeout polls without blocking.
    pub fn consume_timeout(
        &self,
        id: SubscriberId,
        timeout: Duration,
    ) -> Result<Delivery, TopicError> {
        let state = self.lock();
        if !state.cursors.contains_key(&id) {
            return Err(TopicError::UnknownSubscriber(id));
        }
        let (mut state, _) =
            self.recover(self.ready.wait_timeout_while(state, timeout, |s| !s.is_ready(id)));
        Ok(match state.advance(id) {
            Some(msg) => Delivery::Message(msg),
            None if state.shutting_down => Delivery::EndOfStream,
            None => Delivery::TimedOut,
        })
    }

    /// Stop accepting messages and release every blocked consumer.
    ///
    /// Idempotent; only the call that performs the transition returns `true`.
    pub fn shutdown(&self) -> bool {
        let mut state = self.lock();
        if state.shutting_down {
            return false;
        }
        state.shutting_down = true;
        let len = state.log.len();
        let subscribers = state.cursors.len();
        drop(state);
        self.ready.notify_all();
        tracing::info!(topic = %self.name, messages = len, subscribers, "topic shut down");
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shutting_down
    }

    pub fn len(&self) -> usize {
        self.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().cursors.len()
    }

    /// Offset of the next unread message for `id`.
    pub fn cursor(&self, id: SubscriberId) -> Option<usize> {
        self.lock().cursors.get(&id).copied()
    }

    /// Number of published messages `id` has not read yet.
    pub fn lag(&self, id: SubscriberId) -> Option<usize> {
        let state = self.lock();
        state.cursors.get(&id).map(|&c| state.log.len() - c)
    }

    pub fn snapshot(&self) -> TopicStats {
        let state = self.lock();
        let len = state.log.len();
        let mut cursors: Vec<CursorStats> = state
            .cursors
            .iter()
            .map(|(&subscriber, &offset)| CursorStats {
                subscriber,
                offset,
                lag: len - offset,
            })
            .collect();
        cursors.sort_by_key(|c| c.subscriber);
        TopicStats {
            name: self.name.clone(),
            len,
            shut_down: state.shutting_down,
            subscribers: cursors.len(),
            cursors,
        }
    }
}
