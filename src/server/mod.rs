//! Server — the artist/move service.
//!
//! Artists register, receive one seeded move (`say <name>`), and then have
//! moves posted for them. Fetching an artist's moves drains them: each move
//! is delivered at most once.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, info};
use tokio::net::TcpListener;

use crate::remote::{Artist, Move, NewArtist, NewMove};

#[derive(Debug, Default)]
pub struct Store {
    /// In creation order.
    artists: Vec<Artist>,
    moves: HashMap<String, Vec<Move>>,
    artist_count: u64,
    move_count: u64,
}

impl Store {
    pub fn artists(&self) -> Vec<Artist> {
        self.artists.clone()
    }

    pub fn has_artist(&self, id: &str) -> bool {
        self.artists.iter().any(|a| a.id == id)
    }

    /// Register an artist and seed its first move.
    pub fn create_artist(&mut self, name: &str) -> Artist {
        self.artist_count += 1;
        let artist = Artist {
            id: format!("artist{}", self.artist_count),
            name: name.to_string(),
        };
        self.artists.push(artist.clone());
        self.push_move(&artist.id, format!("say {name}"));
        artist
    }

    /// Append a pending move. Returns `None` for an unknown artist.
    pub fn add_move(&mut self, artist_id: &str, description: &str) -> Option<Move> {
        if !self.has_artist(artist_id) {
            return None;
        }
        Some(self.push_move(artist_id, description.to_string()))
    }

    fn push_move(&mut self, artist_id: &str, description: String) -> Move {
        self.move_count += 1;
        let mv = Move {
            id: format!("move{}", self.move_count),
            description,
        };
        self.moves
            .entry(artist_id.to_string())
            .or_default()
            .push(mv.clone());
        mv
    }

    /// Remove and return every pending move for an artist.
    pub fn drain_moves(&mut self, artist_id: &str) -> Vec<Move> {
        self.moves.remove(artist_id).unwrap_or_default()
    }
}

pub type SharedStore = Arc<Mutex<Store>>;

pub fn build_router(store: SharedStore) -> Router {
    Router::new()
        .route("/api/artists", get(artists_list).post(artists_create))
        .route("/api/artists/{id}/moves", get(moves_drain).post(moves_create))
        .with_state(store)
}

type ApiError = (StatusCode, String);

fn lock(store: &SharedStore) -> Result<MutexGuard<'_, Store>, ApiError> {
    store.lock().map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "store lock poisoned".to_string(),
        )
    })
}

fn bad_request(e: serde_json::Error) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

async fn artists_list(State(store): State<SharedStore>) -> Result<Json<Vec<Artist>>, ApiError> {
    Ok(Json(lock(&store)?.artists()))
}

async fn artists_create(
    State(store): State<SharedStore>,
    body: Bytes,
) -> Result<Json<Artist>, ApiError> {
    let input: NewArtist = serde_json::from_slice(&body).map_err(bad_request)?;
    let artist = lock(&store)?.create_artist(&input.name);
    info!("Created {} ({})", artist.id, artist.name);
    Ok(Json(artist))
}

async fn moves_drain(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Move>>, ApiError> {
    let moves = lock(&store)?.drain_moves(&id);
    if !moves.is_empty() {
        debug!("Delivered {} moves for {id}", moves.len());
    }
    Ok(Json(moves))
}

async fn moves_create(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Move>, ApiError> {
    let mut store = lock(&store)?;
    if !store.has_artist(&id) {
        return Err((StatusCode::NOT_FOUND, format!("no artist {id}")));
    }
    let input: NewMove = serde_json::from_slice(&body).map_err(bad_request)?;
    let mv = store
        .add_move(&id, &input.description)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no artist {id}")))?;
    debug!("Queued {} for {id}: {}", mv.id, mv.description);
    Ok(Json(mv))
}

/// Serve the API on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, store: SharedStore) -> Result<()> {
    axum::serve(listener, build_router(store))
        .await
        .context("Server stopped")
}

/// Bind `0.0.0.0:port` and serve forever on a single-threaded runtime.
pub fn run(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to listen on {addr}"))?;
        info!("Listening on http://localhost:{port}/");
        serve(listener, SharedStore::default()).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_artist_is_seeded_with_a_greeting() {
        let mut store = Store::default();
        let artist = store.create_artist("Ann");
        assert_eq!(artist.id, "artist1");
        let moves = store.drain_moves("artist1");
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].description, "say Ann");
    }

    #[test]
    fn drain_removes_delivered_moves() {
        let mut store = Store::default();
        let artist = store.create_artist("Bo");
        store.add_move(&artist.id, "forward 2").unwrap();
        assert_eq!(store.drain_moves(&artist.id).len(), 2);
        assert!(store.drain_moves(&artist.id).is_empty());
    }

    #[test]
    fn moves_for_unknown_artists_are_rejected() {
        let mut store = Store::default();
        assert!(store.add_move("artist9", "left").is_none());
        assert!(store.drain_moves("artist9").is_empty());
    }

    #[test]
    fn ids_count_up_and_roster_keeps_creation_order() {
        let mut store = Store::default();
        for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"] {
            store.create_artist(name);
        }
        let ids: Vec<String> = store.artists().into_iter().map(|a| a.id).collect();
        assert_eq!(ids.first().map(String::as_str), Some("artist1"));
        assert_eq!(ids.last().map(String::as_str), Some("artist11"));
        let mv = store.add_move("artist2", "right").unwrap();
        assert_eq!(mv.id, "move12");
    }
}
