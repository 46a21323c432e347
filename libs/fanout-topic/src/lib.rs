//! In-process broadcast topics.
//!
//! A [`Topic`] keeps every published [`Message`] in an append-only log and
//! gives each subscriber its own read cursor, so all subscribers observe the
//! same sequence in the same order at their own pace. [`TopicRegistry`] maps
//! subject names to topics.
//!
//! ```
//! use fanout_topic::{Message, SubscriberId, Topic};
//!
//! let topic = Topic::new("news");
//! let reader = SubscriberId::new(1);
//! topic.register_subscriber(reader);
//!
//! topic.publish(Message::new(1000, "P1_msg_0")).unwrap();
//! topic.shutdown();
//!
//! assert_eq!(topic.consume(reader).unwrap().map(|m| m.id()), Some(1000));
//! assert_eq!(topic.consume(reader).unwrap(), None);
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod topic;

pub use config::{AfterShutdown, TopicConfig};
pub use error::TopicError;
pub use message::{Message, SubscriberId};
pub use registry::TopicRegistry;
pub use topic::{CursorStats, Delivery, Topic, TopicStats};
