pub mod events;
pub mod health;
pub mod ids;
pub mod note;

pub use events::{Channel, HubEvent};
pub use health::{BackendHealth, HealthStatus};
pub use ids::{NoteId, ObserverId};
pub use note::{BackendId, Note, NoteDraft, WriteTarget};
