//! # API crate: session and profile protocol for Campus Hub
//!
//! Everything between "a user signed up" and "the user has a usable profile
//! record" lives here. The crate is framework-free: the `ui` crate wraps it in
//! Dioxus context and signals, the `web` crate uses the same backend client
//! inside its route guard.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Backend credentials from the environment, with presence diagnostics |
//! | [`supabase`] | HTTP client for a Supabase-compatible backend (GoTrue auth + PostgREST `profiles`) |
//! | [`fetcher`] | Profile lookup classified as found / not found / transient error |
//! | [`session`] | The session store: current identity, profile and loading flag |
//! | [`reconciler`] | Create-if-missing for the profile of a signed-in user |
//! | [`setup`] | The profile setup form (insert-if-absent, then upsert) |
//! | [`registration`] | Signup form validation and submission |
//! | [`diagnostics`] | Connection probe for the debug view |
//! | [`sync`] | Hands the client session to the web server's cookie session |
//! | [`notice`] | User-visible messages produced by the modules above |
//!
//! ## Flow
//!
//! The server-side guard refreshes tokens on every navigation. On the client
//! [`SessionStore::initialize`] reads the held session and fetches the
//! profile; [`SessionStore::listen`] then follows the backend's auth event
//! stream. When a user is present but has no profile row,
//! [`ProfileReconciler::reconcile`] creates one from signup metadata and asks
//! the store to refresh.

pub mod config;
pub mod diagnostics;
pub mod fetcher;
pub mod notice;
pub mod reconciler;
pub mod registration;
pub mod session;
pub mod setup;
pub mod supabase;
pub mod sync;

pub use config::{BackendConfig, ConfigDiagnostics, ConfigError};
pub use diagnostics::{ConnectionStatus, Diagnostics};
pub use fetcher::{FetchOutcome, ProfileFetcher};
pub use notice::{Notice, NoticeLevel};
pub use reconciler::{ProfileReconciler, ReconcileOutcome};
pub use registration::{Registered, RegistrationError, RegistrationForm};
pub use session::{ProfileLookup, SessionError, SessionState, SessionStore};
pub use setup::{ProfileSetupForm, SetupError};
pub use supabase::SupabaseClient;
pub use sync::ServerSync;

pub use store::{
    AuthBackend, AuthEvent, AuthEventKind, AuthSession, BackendError, CampusConfig, Identity,
    Profile, ProfileStore, Role,
};
