//! Yatube-rs server entry point.

use std::sync::Arc;

use axum::middleware;
use fred::prelude::*;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yatube_api::{AppState, auth_middleware, router};
use yatube_common::{
    Config, LocalStorage, MemoryPageCache, RedisPageCache, SharedPageCache,
    config::CacheBackend,
};
use yatube_core::{
    CommentService, FollowService, GroupService, MediaService, Paginator, PostService, UserService,
};
use yatube_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Build the configured page cache backend.
async fn page_cache(config: &Config) -> Result<SharedPageCache, Box<dyn std::error::Error>> {
    match config.cache.backend {
        CacheBackend::Memory => {
            info!("Using in-process page cache");
            Ok(Arc::new(MemoryPageCache::new()))
        }
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .ok_or("cache.redis_url is required for the redis cache backend")?;

            info!("Connecting to Redis...");
            let redis_config = fred::types::config::Config::from_url(url)?;
            let client = fred::clients::Client::new(redis_config, None, None, None);
            client.connect();
            client.wait_for_connect().await?;
            info!("Connected to Redis page cache");

            Ok(Arc::new(RedisPageCache::new(
                Arc::new(client),
                config.cache.prefix.clone(),
            )))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatube=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting yatube-rs server...");

    let config = Config::load()?;

    let db = yatube_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    yatube_db::migrate(&db).await?;
    info!("Migrations completed");

    let page_cache = page_cache(&config).await?;

    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));

    let storage = LocalStorage::new(config.media.root.clone(), config.media.url.clone());
    let media_service = MediaService::new(Arc::new(storage));

    let state = AppState {
        user_service: UserService::new(user_repo.clone()),
        group_service: GroupService::new(group_repo.clone()),
        post_service: PostService::new(
            post_repo.clone(),
            user_repo.clone(),
            group_repo,
            comment_repo.clone(),
            follow_repo.clone(),
            media_service,
            Paginator::new(config.site.posts_per_page),
        ),
        comment_service: CommentService::new(comment_repo, post_repo),
        follow_service: FollowService::new(follow_repo, user_repo),
        page_cache,
        site: config.site.clone(),
        upload_limit: config.media.max_upload_bytes,
    };

    let app = router(state.clone())
        .nest_service(&config.media.url, ServeDir::new(&config.media.root))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
