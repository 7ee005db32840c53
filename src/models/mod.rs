pub mod message;
pub mod project;
pub mod sprint;
pub mod task;
pub mod user;

pub use message::{ChatMessage, ChatRole, LegacyChatMessage, Reaction};
pub use project::{Project, ProjectStatus};
pub use sprint::{Sprint, SprintStatus, TransitionError};
pub use task::{Task, Zone};
pub use user::{PublicUser, User};
