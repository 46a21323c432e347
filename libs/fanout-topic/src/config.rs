use serde::Deserialize;

/// What `publish` does once the topic has been shut down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterShutdown {
    /// Fail with [`TopicError::AlreadyShutDown`](crate::TopicError::AlreadyShutDown).
    #[default]
    Reject,
    /// Discard the message and report success.
    Drop,
}

fn default_initial_capacity() -> usize {
    1024
}

/// Per-topic settings, usually parsed from a `[topic_config]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicConfig {
    #[serde(default)]
    pub after_shutdown: AfterShutdown,

    /// Pre-allocated log capacity. The log still grows without bound.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            after_shutdown: AfterShutdown::default(),
            initial_capacity: default_initial_capacity(),
        }
    }
}

impl TopicConfig {
    pub fn with_after_shutdown(mut self, policy: AfterShutdown) -> Self {
        self.after_shutdown = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let cfg: TopicConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, TopicConfig::default());
        assert_eq!(cfg.after_shutdown, AfterShutdown::Reject);
        assert_eq!(cfg.initial_capacity, 1024);
    }

    #[test]
    fn parses_drop_policy() {
        let cfg: TopicConfig = toml::from_str(
            r#"
            after_shutdown = "drop"
            initial_capacity = 16
            "#,
        )
        .unwrap();
        assert_eq!(cfg.after_shutdown, AfterShutdown::Drop);
        assert_eq!(cfg.initial_capacity, 16);
    }

    #[test]
    fn rejects_unknown_policy() {
        let res: Result<TopicConfig, _> = toml::from_str(r#"after_shutdown = "queue""#);
        assert!(res.is_err());
    }
}
