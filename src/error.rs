//! Error types for zeta-inbox

use crate::purpose::Purpose;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Email parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    /// A matched message lacks a header its purpose requires.
    ///
    /// The message has already been marked `\Seen` by the fetch, so it
    /// will not be offered again.
    #[error("{purpose} e-mail (UID {uid}) is missing headers: {}", missing.join(", "))]
    MissingEmailHeaders {
        purpose: Purpose,
        uid: u32,
        missing: Vec<&'static str>,
    },

    #[error("header {header} of UID {uid} is not ASCII")]
    InvalidHeaderValue { header: &'static str, uid: u32 },

    #[error("invalid invitation id {value:?}: {reason}")]
    InvalidInvitationId { value: String, reason: String },

    #[error("no {purpose} e-mail from {from} to {to} after {waited:?}")]
    EmailTimeout {
        purpose: Purpose,
        from: String,
        to: String,
        waited: Duration,
    },
}

impl Error {
    /// Whether this error is the poll deadline expiring rather than a
    /// transport or decoding failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::EmailTimeout { .. })
    }

    /// Whether the session that produced this error can no longer be
    /// trusted and must be discarded.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Imap(_) | Self::Io(_) | Self::Tls(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
