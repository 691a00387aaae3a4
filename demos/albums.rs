//! Albums service limited to one request per hour per `userId` header.
//!
//! Run with a local Redis:
//! ```
//! cargo run --example albums --features redis,axum
//! curl -H 'userId: 42' http://localhost:8080/albums
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use quota_gate::{
    FixedWindow, HeadersKey, Quota, RateLimitLayer, RedisConfig, RedisStorage,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Album {
    id: String,
    title: String,
    artist: String,
    price: f64,
}

type Albums = Arc<RwLock<Vec<Album>>>;

fn seed() -> Vec<Album> {
    [
        ("1", "Blue Train", "John Coltrane", 56.99),
        ("2", "Jeru", "Gerry Mulligan", 17.99),
        ("3", "Sarah Vaughan", "Sarah Vaughan", 39.99),
    ]
    .into_iter()
    .map(|(id, title, artist, price)| Album {
        id: id.into(),
        title: title.into(),
        artist: artist.into(),
        price,
    })
    .collect()
}

async fn list_albums(State(albums): State<Albums>) -> Json<Vec<Album>> {
    Json(albums.read().await.clone())
}

async fn create_album(
    State(albums): State<Albums>,
    Json(album): Json<Album>,
) -> (StatusCode, Json<Album>) {
    albums.write().await.push(album.clone());
    (StatusCode::CREATED, Json(album))
}

async fn get_album(State(albums): State<Albums>, Path(id): Path<String>) -> impl IntoResponse {
    match albums.read().await.iter().find(|a| a.id == id) {
        Some(album) => (StatusCode::OK, Json(album.clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "album not found" })),
        )
            .into_response(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,quota_gate=debug")),
        )
        .with_target(false)
        .init();

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
    let storage = RedisStorage::new(RedisConfig::new(redis_url)).await?;

    let albums: Albums = Arc::new(RwLock::new(seed()));

    let app = Router::new()
        .route("/albums", get(list_albums).post(create_album))
        .route("/albums/{id}", get(get_album))
        .with_state(albums)
        .layer(RateLimitLayer::new(
            storage,
            FixedWindow::new(),
            Quota::per_hour(1),
            HeadersKey::new(["userId"]),
        ));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
