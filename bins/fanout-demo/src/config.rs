use std::collections::HashSet;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use fanout_topic::TopicConfig;

use crate::error::DemoError;

/// Config path used when neither `--config` nor `FANOUT_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "fanout.toml";

#[derive(Parser)]
#[command(name = "fanout-demo", about = "Broadcast topic demo: every consumer gets every message")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run producers and consumers against one topic, then report what each consumer saw
    Run(RunArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "FANOUT_CONFIG")]
    pub config: String,

    /// Topic name (overrides config)
    #[arg(long)]
    pub topic: Option<String>,

    /// Messages per producer (overrides config)
    #[arg(long)]
    pub messages: Option<u32>,

    /// Pause between publishes in ms (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

// ---- TOML Config ----

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub topic_config: TopicConfig,
    /// Pause between starting consumers and starting producers.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause between producers finishing and topic shutdown.
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,
    #[serde(default = "default_producers")]
    pub producers: Vec<ProducerConfig>,
    #[serde(default = "default_consumers")]
    pub consumers: Vec<ConsumerConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProducerConfig {
    pub id: u32,
    pub name: String,
    #[serde(default = "default_messages")]
    pub messages: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumerConfig {
    pub id: u32,
    pub name: String,
    /// Stop after this many messages instead of reading to end-of-stream.
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_topic() -> String {
    "news".into()
}
fn default_settle_ms() -> u64 {
    200
}
fn default_drain_ms() -> u64 {
    500
}
fn default_messages() -> u32 {
    5
}
fn default_interval_ms() -> u64 {
    200
}
fn default_producers() -> Vec<ProducerConfig> {
    (1..=2)
        .map(|id| ProducerConfig {
            id,
            name: format!("P{id}"),
            messages: default_messages(),
            interval_ms: default_interval_ms(),
        })
        .collect()
}
fn default_consumers() -> Vec<ConsumerConfig> {
    (1..=3)
        .map(|id| ConsumerConfig {
            id,
            name: format!("C{id}"),
            limit: None,
        })
        .collect()
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            topic_config: TopicConfig::default(),
            settle_ms: default_settle_ms(),
            drain_ms: default_drain_ms(),
            producers: default_producers(),
            consumers: default_consumers(),
        }
    }
}

impl DemoConfig {
    pub fn load(path: &str) -> Result<Self, DemoError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DemoError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| DemoError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load `path`, falling back to built-in defaults only when the default
    /// path does not exist. A missing path that was asked for explicitly is
    /// an error.
    pub fn load_or_default(path: &str) -> Result<Self, DemoError> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else if path == DEFAULT_CONFIG_PATH {
            tracing::info!(config = %path, "config file not found, using defaults");
            Ok(Self::default())
        } else {
            Err(DemoError::Config { context: "read", detail: format!("'{path}': file not found") })
        }
    }

    /// Merge CLI/env overrides on top of the file: config.toml < CLI.
    pub fn with_overrides(mut self, args: &RunArgs) -> Self {
        if let Some(topic) = &args.topic {
            self.topic = topic.clone();
        }
        for p in &mut self.producers {
            if let Some(messages) = args.messages {
                p.messages = messages;
            }
            if let Some(interval_ms) = args.interval_ms {
                p.interval_ms = interval_ms;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), DemoError> {
        if self.topic.is_empty() {
            return Err(DemoError::Config { context: "topic", detail: "name is empty".into() });
        }
        if self.producers.is_empty() {
            return Err(DemoError::NoComponents("[[producers]]"));
        }
        if self.consumers.is_empty() {
            return Err(DemoError::NoComponents("[[consumers]]"));
        }
        let mut seen = HashSet::new();
        for c in &self.consumers {
            if !seen.insert(c.id) {
                return Err(DemoError::Config {
                    context: "consumers",
                    detail: format!("duplicate consumer id {}", c.id),
                });
            }
        }
        Ok(())
    }

    /// Messages the producers will publish if nobody interrupts them.
    pub fn expected_messages(&self) -> usize {
        self.producers.iter().map(|p| p.messages as usize).sum()
    }
}
