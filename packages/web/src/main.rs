use dioxus::prelude::*;

use ui::{AuthProvider, NoticePanel, NoticeToggle, ProfileCreationHandler};
use views::{DebugPage, Home, Login, Materials, Profile, ProfileSetup, Register};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[route("/")]
    Home {},
    #[route("/auth/login")]
    Login {},
    #[route("/auth/register")]
    Register {},
    #[route("/profile")]
    Profile {},
    #[route("/profile/setup")]
    ProfileSetup {},
    #[route("/materials")]
    Materials {},
    #[route("/debug")]
    DebugPage {},
}

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    #[cfg(feature = "server")]
    {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("failed to start runtime: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = runtime.block_on(launch_server()) {
            tracing::error!("server stopped: {}", e);
            std::process::exit(1);
        }
    }

    #[cfg(not(feature = "server"))]
    {
        dioxus::launch(App);
    }
}

#[cfg(feature = "server")]
async fn launch_server() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use api::{BackendConfig, SupabaseClient};
    use dioxus::server::{DioxusRouterExt, ServeConfig};
    use store::{AuthBackend, MemoryBackend};
    use web::guard::GuardState;
    use web::server::{api_routes, with_guard};
    use web::settings::{config_path, init_tracing, load_config};

    dotenvy::dotenv().ok();
    init_tracing();

    let config = load_config(&config_path())?;
    let backend = BackendConfig::from_env();
    let auth: Arc<dyn AuthBackend> = match SupabaseClient::new(&backend) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!("backend not configured ({}), every visitor is signed out", e);
            Arc::new(MemoryBackend::new())
        }
    };
    let state = GuardState::new(auth, config.routes.clone());

    // Session endpoints first, then the Dioxus app; guard and cookie
    // session wrap both.
    let app = api_routes()
        .with_state(state.clone())
        .serve_dioxus_application(ServeConfig::new(), App);
    let router = with_guard(app, state);

    let addr = dioxus::cli_config::fullstack_address_or_localhost();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}

#[component]
fn App() -> Element {
    rsx! {
        // Global app resources
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        AuthProvider {
            ProfileCreationHandler {}
            Router::<Route> {}
            NoticePanel {}
            NoticeToggle {}
        }
    }
}
