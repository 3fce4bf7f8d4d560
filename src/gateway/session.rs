//! Resumption state for one Gateway session.
//!
//! Only the connection task mutates a [`Session`]; everyone else observes
//! snapshots published on a `watch` channel.

/// What the server needs back from us to resume after a dropped transport.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: Option<String>,
    last_sequence: Option<u64>,
    resume_url: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session identifier assigned by the server in READY.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Highest dispatch sequence number observed so far.
    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Endpoint the server asked us to reconnect to, if any.
    #[must_use]
    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    /// A resume handshake needs both a session id and a sequence number.
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.id.is_some() && self.last_sequence.is_some()
    }

    /// Record the session assigned in READY. A different id means a new
    /// event stream, so any sequence number from the old session is stale
    /// and must not leak into the next RESUME.
    pub(crate) fn record_ready(&mut self, id: String, resume_url: Option<String>) {
        if self.id.as_deref() != Some(id.as_str()) {
            self.last_sequence = None;
        }
        self.id = Some(id);
        self.resume_url = resume_url;
    }

    /// Record a dispatch sequence number. Never moves backwards, so a stale
    /// or replayed frame cannot shrink the resume window.
    pub(crate) fn record_sequence(&mut self, sequence: u64) {
        if self.last_sequence.is_none_or(|current| sequence > current) {
            self.last_sequence = Some(sequence);
        }
    }

    /// Apply an INVALID_SESSION verdict. A non-resumable verdict wipes
    /// everything so the next handshake is a fresh IDENTIFY.
    pub(crate) fn invalidate(&mut self, resumable: bool) {
        if !resumable {
            self.id = None;
            self.last_sequence = None;
            self.resume_url = None;
        }
    }
}
