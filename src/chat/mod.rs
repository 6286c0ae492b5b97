//! Conversation state and structured-reply handling

mod conversation;
pub mod response;

pub use conversation::{Conversation, FollowUp, Message};
pub use response::{extract_condition, sections, Condition, Section, SectionKind};
