mod nav;
pub use nav::NavBar;

mod home;
pub use home::Home;

mod login;
pub use login::Login;

mod register;
pub use register::Register;

mod profile;
pub use profile::Profile;

mod profile_setup;
pub use profile_setup::ProfileSetup;

mod materials;
pub use materials::Materials;

mod debug;
pub use debug::DebugPage;

/// Full page load, so the next request carries the synced cookie session
/// through the server's route guard.
pub(crate) fn go_to(path: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            let _ = window.location().set_href(path);
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::debug!(path, "navigation requested outside the browser");
    }
}
