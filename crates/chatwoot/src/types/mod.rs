//! Tipos da API Chatwoot usados pelo middleware

pub mod contact;
pub mod conversation;
pub mod message;

pub use contact::{Contact, ContactUpdate, NewContact};
pub use conversation::{
    Conversation, ConversationMeta, ConversationStatus, ConversationUpdate, Priority, TeamRef,
};
pub use message::{Label, Message, MessageType};
