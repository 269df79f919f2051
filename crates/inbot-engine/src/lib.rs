pub mod backend;
pub mod composer;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod guard;
pub mod model;
pub mod orchestrator;
pub mod page;
pub mod retry;
pub mod session;

pub use backend::{Backend, ElementRef, LaunchOptions, NavigationResult, Viewport};
pub use error::{BackendError, GenerationError, InboxError, Transient};
pub use model::{Conversation, ConversationLocator, InboxView, Language, Message, Reply};
pub use orchestrator::{RunOrchestrator, RunReport, RunSettings};
