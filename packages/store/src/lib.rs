pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod time;

mod memory;
pub use memory::MemoryBackend;

pub use backend::{AuthBackend, ProfileStore};
pub use config::CampusConfig;
pub use error::BackendError;
pub use models::{
    AuthEvent, AuthEventKind, AuthSession, Identity, NewProfile, Profile, Role, SignUpOutcome,
    SignupMetadata,
};
