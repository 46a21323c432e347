use crate::message::SubscriberId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    /// `consume` was called with an id that never went through `register_subscriber`.
    #[error("subscriber {0} is not registered")]
    UnknownSubscriber(SubscriberId),

    #[error("topic '{0}' is shut down")]
    AlreadyShutDown(String),

    #[error("topic '{0}' not found")]
    NotFound(String),
}

impl TopicError {
    /// True for errors caused by the caller misusing the API rather than by topic state.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, TopicError::UnknownSubscriber(_) | TopicError::NotFound(_))
    }
}
