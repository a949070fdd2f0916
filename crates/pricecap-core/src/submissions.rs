//! Append-only history of submitted capture sessions.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LogError;
use crate::item::{CaptureItem, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new(raw: Uuid) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A submitted draft. Fields are fixed once the session is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSession {
    id: SessionId,
    /// Submit order within the log, starting at 1.
    sequence: u64,
    /// Last raw text seen by the desk; advisory only.
    raw_text: Option<String>,
    items: Vec<CaptureItem>,
    location: Location,
    submitted_at: DateTime<Utc>,
}

impl CaptureSession {
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    #[must_use]
    pub fn items(&self) -> &[CaptureItem] {
        &self.items
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

type IdSource = Box<dyn FnMut() -> Uuid + Send>;

/// Ordered history of [`CaptureSession`]s. Sessions can be added but never
/// changed or removed.
pub struct SubmissionLog {
    /// Oldest first; [`SubmissionLog::history`] reverses.
    sessions: Vec<CaptureSession>,
    ids: HashSet<SessionId>,
    next_sequence: u64,
    id_source: IdSource,
}

impl std::fmt::Debug for SubmissionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionLog")
            .field("sessions", &self.sessions.len())
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}

impl Default for SubmissionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_source(Uuid::new_v4)
    }

    /// Builds a log drawing session ids from `id_source`.
    #[must_use]
    pub fn with_id_source(id_source: impl FnMut() -> Uuid + Send + 'static) -> Self {
        Self {
            sessions: Vec::new(),
            ids: HashSet::new(),
            next_sequence: 1,
            id_source: Box::new(id_source),
        }
    }

    /// Rebuilds a log from previously submitted sessions, e.g. an archive.
    ///
    /// Sessions are ordered by their sequence number; new submits continue
    /// after the highest one.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::IdCollision`] if two sessions share an id.
    pub fn restore(sessions: impl IntoIterator<Item = CaptureSession>) -> Result<Self, LogError> {
        let mut log = Self::new();
        let mut sessions: Vec<CaptureSession> = sessions.into_iter().collect();
        sessions.sort_by_key(CaptureSession::sequence);

        for session in sessions {
            if !log.ids.insert(session.id) {
                return Err(LogError::IdCollision(session.id));
            }
            log.next_sequence = log.next_sequence.max(session.sequence.saturating_add(1));
            log.sessions.push(session);
        }

        tracing::info!(sessions = log.sessions.len(), "submission log restored");
        Ok(log)
    }

    /// Records a new session holding a copy of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::IdCollision`] if the generated id is already in
    /// use. Nothing is recorded in that case.
    pub fn submit(
        &mut self,
        items: &[CaptureItem],
        location: Location,
        raw_text: Option<String>,
    ) -> Result<CaptureSession, LogError> {
        let id = SessionId((self.id_source)());
        if self.ids.contains(&id) {
            tracing::error!(session_id = %id, "submission log: generated id collides with an existing session");
            return Err(LogError::IdCollision(id));
        }

        let session = CaptureSession {
            id,
            sequence: self.next_sequence,
            raw_text,
            items: items.to_vec(),
            location,
            submitted_at: Utc::now(),
        };

        self.ids.insert(id);
        self.next_sequence += 1;
        self.sessions.push(session.clone());

        tracing::info!(
            session_id = %id,
            sequence = session.sequence,
            items = session.items.len(),
            location = %session.location,
            "capture session submitted"
        );
        Ok(session)
    }

    /// Sessions, most recent first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &CaptureSession> + '_ {
        self.sessions.iter().rev()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&CaptureSession> {
        self.sessions.last()
    }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&CaptureSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
