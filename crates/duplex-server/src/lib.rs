pub mod handlers;
pub mod hub;
pub mod orchestrator;
pub mod protocol;
pub mod server;

pub use hub::Hub;
pub use orchestrator::NotesOrchestrator;
pub use server::{start, ServerConfig, ServerHandle};
