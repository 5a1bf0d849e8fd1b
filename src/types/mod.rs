//! Core data types.

pub mod clinical;
pub mod conversation;
pub mod envelope;
pub mod request;

pub use clinical::*;
pub use conversation::*;
pub use envelope::{intercept, ResponseEnvelope};
pub use request::*;
