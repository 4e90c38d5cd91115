//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::application::services::directory::UserDirectory;
use crate::application::services::token_service::TokenManager;
use crate::config::Settings;
use crate::infrastructure::cache::SessionStore;
use crate::infrastructure::cache::{self, Cache};
use crate::infrastructure::directory::{self, PgUserDirectory};
use crate::presentation::http::routes;
use crate::presentation::middleware::RateLimiter;

/// Application state shared across handlers and pipelines
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
    pub tokens: Arc<TokenManager>,
    pub sessions: SessionStore,
    pub limiter: RateLimiter,
    pub directory: Arc<dyn UserDirectory>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Assemble state from its collaborators.
    ///
    /// The cache and directory come in as trait objects, so tests can
    /// substitute in-memory implementations without touching the wiring.
    pub fn new(
        cache: Arc<dyn Cache>,
        directory: Arc<dyn UserDirectory>,
        settings: Settings,
    ) -> Result<Self> {
        let tokens = Arc::new(TokenManager::new(&settings.jwt)?);
        let sessions = SessionStore::new(cache.clone(), settings.session.ttl_seconds);
        let limiter = RateLimiter::new(cache.clone());

        Ok(Self {
            cache,
            tokens,
            sessions,
            limiter,
            directory,
            settings: Arc::new(settings),
        })
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let redis_cache = cache::create_redis_cache(&settings.redis).await?;
        let cache: Arc<dyn Cache> = Arc::new(redis_cache);

        let pool = directory::create_pool(&settings.database).await?;
        tracing::info!("User directory connection pool created");
        let user_directory: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool));

        let port = settings.server.port;
        let state = AppState::new(cache, user_directory, settings)?;

        let router = routes::create_router(state).layer(TraceLayer::new_for_http());

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
