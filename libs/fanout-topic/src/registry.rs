use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::TopicConfig;
use crate::error::TopicError;
use crate::topic::Topic;

/// Registry of named topics; one [`Topic`] per subject.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Topic>>> {
        match self.topics.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("topic registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Topic>>> {
        match self.topics.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("topic registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Insert `topic`, replacing any previous topic with the same name.
    pub fn register(&self, topic: Topic) -> Arc<Topic> {
        let topic = Arc::new(topic);
        let name = topic.name().to_string();
        let replaced = self.write().insert(name.clone(), topic.clone());
        if let Some(old) = replaced {
            tracing::warn!(topic = %name, "replacing registered topic");
            old.shutdown();
        }
        tracing::info!(topic = %name, "registered topic");
        topic
    }

    /// Return the topic called `name`, creating it with `config` if absent.
    pub fn get_or_create(&self, name: &str, config: TopicConfig) -> Arc<Topic> {
        if let Some(topic) = self.get(name) {
            return topic;
        }
        let mut guard = self.write();
        guard
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(topic = %name, "created topic");
                Arc::new(Topic::with_config(name, config))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Topic>> {
        self.read().get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<Topic>, TopicError> {
        self.get(name).ok_or_else(|| TopicError::NotFound(name.to_string()))
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Shut down every registered topic. Returns how many were still open.
    pub fn shutdown_all(&self) -> usize {
        let topics: Vec<Arc<Topic>> = self.read().values().cloned().collect();
        topics.iter().filter(|t| t.shutdown()).count()
    }
}
