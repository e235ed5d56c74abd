//! IMAP folder selection
//!
//! Automated mail normally lands in INBOX, but some accounts route it
//! through server-side filters into another folder.

use serde::Deserialize;
use std::fmt;

/// The IMAP folder searched for automated e-mails.
///
/// # Examples
///
/// ```
/// use zeta_inbox::Folder;
///
/// assert_eq!(Folder::from("inbox"), Folder::Inbox);
/// assert_eq!(Folder::from("Automated").as_str(), "Automated");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Folder {
    /// The INBOX folder (RFC 3501 required, case-insensitive).
    #[default]
    Inbox,
    /// Any other folder, by its exact IMAP name.
    Custom(String),
}

impl Folder {
    /// The IMAP folder name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "INBOX",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Folder {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inbox") {
            Self::Inbox
        } else {
            Self::Custom(s.to_string())
        }
    }
}

impl From<String> for Folder {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
