use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use std::{net::SocketAddr, sync::Arc};

use crate::users;
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };

    Router::new()
        .route("/users", get(users::index).post(users::create))
        .route("/users.xml", get(users::index).post(users::create))
        .route("/users.json", get(users::index).post(users::create))
        .route("/users/new", get(users::new))
        .route(
            "/users/{id}",
            get(users::show)
                .delete(users::destroy)
                .post(users::destroy_via_form),
        )
        .route("/users/{id}/change_password", get(users::change_password))
        .route("/users/{id}/update_password", post(users::update_password))
        .route("/users/{id}/change_auth_type", get(users::change_auth_type))
        .route("/users/{id}/update_auth_type", post(users::update_auth_type))
        .route("/users/{id}/refresh_token", post(users::refresh_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine))).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
