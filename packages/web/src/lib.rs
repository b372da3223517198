//! Server half of the Campus Hub web app.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`guard`] | Route policy and the axum middleware enforcing it |
//! | [`server`] | Session sync endpoints, health check, session and guard layers |
//! | [`settings`] | `campus.toml` loading and tracing setup |

#[cfg(not(target_arch = "wasm32"))]
pub mod guard;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
#[cfg(not(target_arch = "wasm32"))]
pub mod settings;
