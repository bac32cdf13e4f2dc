//! Wire model shared by the mediatree client and its players: typed values,
//! the message envelope, the media object tree, and configuration.

pub mod config;
pub mod error;
pub mod message;
pub mod platform;
pub mod tree;
pub mod value;

pub use error::{ProtoError, TreeError};
pub use message::{Message, MessageKind, Payload, Splice, StateVar, SwipeDirection};
pub use tree::{ObjectNode, FAVORITES_ID, PLAYQUEUE_ID, ROOT_ID};
pub use value::{Dict, Value, ValueKind};
