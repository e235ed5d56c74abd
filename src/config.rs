//! Mailbox account configuration
//!
//! Accounts are described by a JSON array of settings objects:
//!
//! ```json
//! [
//!   { "host": "imap.example.com", "user": "qa@example.com", "pass": "secret", "conn": 4 }
//! ]
//! ```
//!
//! Settings are plain values. Nothing here is global: callers load them
//! once and hand them to [`crate::Mailbox::new`].

use crate::error::{Error, Result};
use crate::folder::Folder;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// How the TLS layer is established on a new connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// TLS handshake immediately after TCP connect (IMAPS, port 993).
    #[default]
    Implicit,
    /// Plaintext greeting followed by `STARTTLS` (port 143).
    #[serde(rename = "starttls")]
    StartTls,
}

impl TlsMode {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Implicit => 993,
            Self::StartTls => 143,
        }
    }
}

impl FromStr for TlsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "implicit" | "imaps" | "tls" => Ok(Self::Implicit),
            "starttls" => Ok(Self::StartTls),
            other => Err(Error::Config(format!("unknown TLS mode: {other}"))),
        }
    }
}

/// Settings for one mailbox account.
#[derive(Clone, Deserialize)]
pub struct MailboxSettings {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Login identity; also the address the account receives mail at.
    pub user: String,
    pub pass: String,
    /// Upper bound on concurrently open sessions for this account.
    pub conn: NonZeroUsize,
    #[serde(default)]
    pub tls: TlsMode,
    /// Skip certificate verification (self-signed bridges, test servers).
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub folder: Folder,
}

impl MailboxSettings {
    /// Settings with implicit TLS on the default port, certificate
    /// verification on, searching INBOX.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        pass: impl Into<String>,
        conn: NonZeroUsize,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            user: user.into(),
            pass: pass.into(),
            conn,
            tls: TlsMode::Implicit,
            accept_invalid_certs: false,
            folder: Folder::Inbox,
        }
    }

    /// The port to connect to, falling back to the TLS mode's default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.tls.default_port())
    }

    /// Check the fields serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty or the user is
    /// not an e-mail address.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if !looks_like_address(&self.user) {
            return Err(Error::Config(format!(
                "user must be an e-mail address, got {:?}",
                self.user
            )));
        }
        Ok(())
    }

    /// Load a single account from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `IMAP_HOST`
    /// - `IMAP_USER`
    /// - `IMAP_PASS`
    ///
    /// Optional (with defaults):
    /// - `IMAP_CONN` (default: `1`)
    /// - `IMAP_TLS` (default: `implicit`; or `starttls`)
    /// - `IMAP_PORT` (default: by TLS mode)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `IMAP_FOLDER` (default: `INBOX`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Self {
            host: required("IMAP_HOST")?,
            port: optional("IMAP_PORT")?,
            user: required("IMAP_USER")?,
            pass: required("IMAP_PASS")?,
            conn: optional("IMAP_CONN")?.unwrap_or(NonZeroUsize::MIN),
            tls: optional("IMAP_TLS")?.unwrap_or_default(),
            accept_invalid_certs: optional("IMAP_ACCEPT_INVALID_CERTS")?.unwrap_or(false),
            folder: env::var("IMAP_FOLDER").map(Folder::from).unwrap_or_default(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl fmt::Debug for MailboxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxSettings")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("conn", &self.conn)
            .field("tls", &self.tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("folder", &self.folder)
            .finish()
    }
}

/// Decode and validate a JSON array of account settings.
///
/// # Errors
///
/// Returns [`Error::Config`] if the document does not decode, is empty,
/// or any entry fails [`MailboxSettings::validate`].
pub fn parse_settings(json: &str) -> Result<Vec<MailboxSettings>> {
    let settings: Vec<MailboxSettings> = serde_json::from_str(json)
        .map_err(|e| Error::Config(format!("Invalid mailbox config: {e}")))?;
    if settings.is_empty() {
        return Err(Error::Config("mailbox config lists no accounts".into()));
    }
    for s in &settings {
        s.validate()?;
    }
    Ok(settings)
}

/// Read and decode the account settings file at `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise as
/// [`parse_settings`].
pub async fn load_settings(path: impl AsRef<Path>) -> Result<Vec<MailboxSettings>> {
    let path = path.as_ref();
    debug!("Loading mailbox config from {}", path.display());
    let json = tokio::fs::read_to_string(path).await?;
    parse_settings(&json)
}

fn looks_like_address(s: &str) -> bool {
    let mut parts = s.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    )
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{name} not set")))
}

fn optional<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env::var(name)
        .ok()
        .map(|v| {
            v.parse()
                .map_err(|e| Error::Config(format!("Invalid {name}: {e}")))
        })
        .transpose()
}
