#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("no {0} configured")]
    NoComponents(&'static str),

    #[error("topic: {0}")]
    Topic(#[from] fanout_topic::TopicError),

    #[error("worker: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),

    #[error("report: {0}")]
    Report(#[from] serde_json::Error),
}
