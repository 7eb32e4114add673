pub mod auto_close;
pub mod bad_words;
pub mod generation;
pub mod helpdesk;
pub mod kb_dispatcher;
pub mod knowledge_base;
pub mod lead_detection;
pub mod messenger;
pub mod router;
pub mod state_store;
pub mod tags;

pub use auto_close::AutoCloseScheduler;
pub use bad_words::{BadWordFilter, Severity};
pub use generation::{DisabledGenerator, GenerationError, OpenAiGenerator, ReplyGenerator};
pub use helpdesk::{ChatwootHelpdesk, Helpdesk};
pub use kb_dispatcher::{DispatchOutcome, KbDispatcher};
pub use knowledge_base::{KbEntry, KnowledgeBase};
pub use router::{EventRouter, RouteOutcome};
pub use state_store::{ConversationStateStore, InMemoryStateStore};
pub use tags::{TagCatalog, TagEngine};
