use std::collections::{HashMap, HashSet};

use shared::RatingType;
use thiserror::Error;

use crate::message::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingState {
    Unrated,
    Rated(RatingType),
    /// Superseded before the user rated it; no longer accepts input.
    Discarded,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingRejected {
    #[error("no rating message is awaiting input")]
    NothingPending,
    #[error("rating message {0:?} is unknown")]
    Unknown(MessageId),
    #[error("rating message {0:?} no longer accepts input")]
    Closed(MessageId),
    #[error("conversation {0} has already been rated")]
    AlreadyRated(String),
}

#[derive(Debug)]
struct Entry {
    token: String,
    state: RatingState,
}

/// Tracks every Rating Message and guarantees one submission per conversation.
#[derive(Debug, Default)]
pub struct RatingController {
    entries: HashMap<MessageId, Entry>,
    submitted: HashSet<String>,
    latest: Option<MessageId>,
}

impl RatingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: MessageId, token: String) {
        self.entries.insert(
            id,
            Entry {
                token,
                state: RatingState::Unrated,
            },
        );
        self.latest = Some(id);
    }

    pub fn state(&self, id: MessageId) -> Option<RatingState> {
        self.entries.get(&id).map(|e| e.state)
    }

    pub fn pending(&self) -> Option<MessageId> {
        self.latest
            .filter(|id| self.state(*id) == Some(RatingState::Unrated))
    }

    pub fn submit(&mut self, id: MessageId, rating: RatingType) -> Result<String, RatingRejected> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(RatingRejected::Unknown(id))?;

        if entry.state != RatingState::Unrated {
            return Err(RatingRejected::Closed(id));
        }
        if self.submitted.contains(&entry.token) {
            entry.state = RatingState::Discarded;
            return Err(RatingRejected::AlreadyRated(entry.token.clone()));
        }

        entry.state = RatingState::Rated(rating);
        self.submitted.insert(entry.token.clone());

        Ok(entry.token.clone())
    }

    pub fn submit_pending(&mut self, rating: RatingType) -> Result<String, RatingRejected> {
        let id = self.pending().ok_or(RatingRejected::NothingPending)?;
        self.submit(id, rating)
    }

    /// Returns the token to submit `none` for when `send_default` is set.
    pub fn discard_pending(&mut self, send_default: bool) -> Option<String> {
        let id = self.pending()?;

        if send_default {
            return self.submit(id, RatingType::None).ok();
        }

        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = RatingState::Discarded;
        }
        None
    }
}
