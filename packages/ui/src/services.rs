//! Backend wiring shared through Dioxus context.

use std::sync::Arc;

use api::{BackendConfig, ProfileReconciler, ServerSync, SessionStore, SupabaseClient};
use store::{AuthBackend, CampusConfig, MemoryBackend, ProfileStore};

/// Everything the components need to talk to the backend.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthBackend>,
    pub profiles: Arc<dyn ProfileStore>,
    pub session: Arc<SessionStore>,
    pub reconciler: Arc<ProfileReconciler>,
    pub backend_config: BackendConfig,
    pub config: CampusConfig,
    client: Option<SupabaseClient>,
    sync: Option<ServerSync>,
}

impl Services {
    /// Connect to the configured backend. Without credentials the app runs
    /// against an in-memory backend so the pages still render.
    pub fn connect(backend_config: BackendConfig, config: CampusConfig) -> Self {
        match SupabaseClient::new(&backend_config) {
            Ok(client) => {
                let shared = Arc::new(client.clone());
                let mut services =
                    Self::with_backends(shared.clone(), shared, backend_config, config);
                services.client = Some(client);
                services.sync = server_origin().map(|origin| ServerSync::new(&origin));
                services
            }
            Err(e) => {
                tracing::warn!("backend not configured ({}), using in-memory backend", e);
                let memory = Arc::new(MemoryBackend::new());
                Self::with_backends(memory.clone(), memory, backend_config, config)
            }
        }
    }

    pub fn with_backends(
        auth: Arc<dyn AuthBackend>,
        profiles: Arc<dyn ProfileStore>,
        backend_config: BackendConfig,
        config: CampusConfig,
    ) -> Self {
        let session = SessionStore::new(auth.clone(), profiles.clone(), config.session.clone());
        let reconciler = ProfileReconciler::new(profiles.clone(), config.session.settle_delay());
        Self {
            auth,
            profiles,
            session: Arc::new(session),
            reconciler: Arc::new(reconciler),
            backend_config,
            config,
            client: None,
            sync: None,
        }
    }

    pub fn sync(&self) -> Option<&ServerSync> {
        self.sync.as_ref()
    }

    /// Pick up the session the web server kept for this browser.
    pub async fn restore(&self) {
        let (Some(client), Some(sync)) = (&self.client, &self.sync) else {
            return;
        };
        match sync.restore_within(self.config.session.init_timeout()).await {
            Ok(Some(session)) => {
                tracing::debug!(user = %session.user.id, "restored session from server");
                client.restore_session(session);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("could not restore session from server: {}", e),
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn server_origin() -> Option<String> {
    web_sys::window().and_then(|window| window.location().origin().ok())
}

#[cfg(not(target_arch = "wasm32"))]
fn server_origin() -> Option<String> {
    None
}
