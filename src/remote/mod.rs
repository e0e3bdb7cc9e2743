//! Remote — the artist/move HTTP contract.
//!
//! Wire types shared by the server and the blocking client. Field names are
//! the ones the service has always spoken (`ID`, `Name`, `Description`).

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Description")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArtist {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMove {
    #[serde(rename = "Description")]
    pub description: String,
}

/// Blocking client for the artist/move service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current roster of artists.
    pub fn artists(&self) -> Result<Vec<Artist>> {
        let url = format!("{}/api/artists", self.base_url);
        let artists: Option<Vec<Artist>> = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to get {url}"))?
            .json()
            .with_context(|| format!("Failed to decode artists from {url}"))?;
        // Older servers encode an empty roster as `null`.
        Ok(artists.unwrap_or_default())
    }

    /// Fetch every pending move for an artist. The server deletes what it
    /// returns, so a second call without new posts yields nothing.
    pub fn drain_moves(&self, artist_id: &str) -> Result<Vec<Move>> {
        let url = format!("{}/api/artists/{artist_id}/moves", self.base_url);
        let moves: Option<Vec<Move>> = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to get {url}"))?
            .json()
            .with_context(|| format!("Failed to decode moves from {url}"))?;
        Ok(moves.unwrap_or_default())
    }

    pub fn create_artist(&self, name: &str) -> Result<Artist> {
        let url = format!("{}/api/artists", self.base_url);
        self.client
            .post(&url)
            .json(&NewArtist { name: name.into() })
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to post {url}"))?
            .json()
            .with_context(|| format!("Failed to decode artist from {url}"))
    }

    pub fn add_move(&self, artist_id: &str, description: &str) -> Result<Move> {
        let url = format!("{}/api/artists/{artist_id}/moves", self.base_url);
        self.client
            .post(&url)
            .json(&NewMove {
                description: description.into(),
            })
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to post {url}"))?
            .json()
            .with_context(|| format!("Failed to decode move from {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_the_service() {
        let artist: Artist = serde_json::from_str(r#"{"ID":"artist1","Name":"Ann"}"#).unwrap();
        assert_eq!(artist.id, "artist1");
        assert_eq!(artist.name, "Ann");

        let json = serde_json::to_string(&NewMove {
            description: "forward 2".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"Description":"forward 2"}"#);
    }

    #[test]
    fn move_id_is_optional_on_input() {
        let mv: Move = serde_json::from_str(r#"{"Description":"left"}"#).unwrap();
        assert_eq!(mv.id, "");
        assert_eq!(mv.description, "left");
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
