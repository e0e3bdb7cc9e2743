//! Actor sources — where actors and their actions come from.
//!
//! A source either holds a fixed set of parsed scripts or polls the remote
//! artist service. Either way the board only sees `Actor`s whose `Moves`
//! hand out one action at a time.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::remote::ApiClient;
use crate::script::{Action, ActionSequence, parse_line, parse_str};

/// Result of asking an actor for its next action.
#[derive(Debug, Clone, PartialEq)]
pub enum Pull {
    Ready(Action),
    /// Nothing right now; ask again later.
    Waiting,
    /// Nothing ever again.
    Done,
}

/// Per-actor supply of actions.
#[derive(Debug)]
pub enum Moves {
    Script(ActionSequence),
    Remote(RemoteMoves),
}

impl Moves {
    pub fn pull(&mut self) -> Pull {
        match self {
            Moves::Script(seq) => match seq.next() {
                Some(action) => Pull::Ready(action),
                None => Pull::Done,
            },
            Moves::Remote(remote) => match remote.next_move() {
                Some(action) => Pull::Ready(action),
                None => Pull::Waiting,
            },
        }
    }
}

/// Pending moves of one remote artist.
///
/// Moves are drained from the server in batches and buffered here. The
/// server forgets a move as soon as it is fetched, so a batch lost between
/// the two sides is gone.
#[derive(Debug)]
pub struct RemoteMoves {
    client: ApiClient,
    artist_id: String,
    pending: VecDeque<Action>,
}

impl RemoteMoves {
    pub fn new(client: ApiClient, artist_id: impl Into<String>) -> Self {
        RemoteMoves {
            client,
            artist_id: artist_id.into(),
            pending: VecDeque::new(),
        }
    }

    fn next_move(&mut self) -> Option<Action> {
        if self.pending.is_empty() {
            match self.client.drain_moves(&self.artist_id) {
                Ok(moves) => {
                    if !moves.is_empty() {
                        debug!("{} new moves for {}", moves.len(), self.artist_id);
                    }
                    self.pending
                        .extend(moves.iter().filter_map(|m| parse_line(&m.description)));
                }
                Err(e) => warn!("Err getting moves for {}: {e:#}", self.artist_id),
            }
        }
        self.pending.pop_front()
    }
}

#[derive(Debug)]
pub struct Actor {
    pub id: String,
    pub moves: Moves,
}

impl Actor {
    pub fn scripted(id: impl Into<String>, script: &str) -> Self {
        Actor {
            id: id.into(),
            moves: Moves::Script(ActionSequence::new(parse_str(script))),
        }
    }
}

#[derive(Debug)]
pub enum ActorSource {
    Static(StaticSource),
    Remote(RemoteSource),
}

impl ActorSource {
    /// Produce the actors currently known to this source. The board ignores
    /// ids it is already animating.
    pub fn poll(&mut self) -> Vec<Actor> {
        match self {
            ActorSource::Static(s) => s.poll(),
            ActorSource::Remote(r) => r.poll(),
        }
    }
}

/// A fixed set of scripts, parsed up front. Each script becomes one actor,
/// identified by its index.
#[derive(Debug, Default)]
pub struct StaticSource {
    actors: Vec<Actor>,
}

impl StaticSource {
    pub fn new<S: AsRef<str>>(scripts: &[S]) -> Self {
        let actors = scripts
            .iter()
            .enumerate()
            .map(|(i, script)| Actor::scripted(i.to_string(), script.as_ref()))
            .collect();
        StaticSource { actors }
    }

    /// Hands every actor out exactly once.
    fn poll(&mut self) -> Vec<Actor> {
        std::mem::take(&mut self.actors)
    }
}

/// Polls the artist service for its roster.
#[derive(Debug)]
pub struct RemoteSource {
    client: ApiClient,
}

impl RemoteSource {
    pub fn new(client: ApiClient) -> Self {
        RemoteSource { client }
    }

    fn poll(&mut self) -> Vec<Actor> {
        debug!("Checking for more actors");
        match self.client.artists() {
            Ok(artists) => artists
                .into_iter()
                .map(|artist| Actor {
                    moves: Moves::Remote(RemoteMoves::new(self.client.clone(), &artist.id)),
                    id: artist.id,
                })
                .collect(),
            Err(e) => {
                warn!("Err getting artists: {e:#}");
                Vec::new()
            }
        }
    }
}
