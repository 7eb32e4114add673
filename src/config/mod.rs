pub mod knowledge_base_loader;
pub mod settings;

pub use knowledge_base_loader::BotMessages;
pub use settings::{BotSettings, InboxFlow, Settings};
