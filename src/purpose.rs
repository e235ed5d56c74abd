//! Purpose tags for automated e-mails
//!
//! The system under test stamps every automated e-mail with an
//! `X-Zeta-Purpose` header. A closed enum keeps a typo from turning
//! into a search that can never match.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Which automated flow produced an e-mail.
///
/// # Examples
///
/// ```
/// use zeta_inbox::Purpose;
///
/// assert_eq!(Purpose::PasswordReset.as_str(), "PasswordReset");
/// assert_eq!("password-reset".parse::<Purpose>().unwrap(), Purpose::PasswordReset);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Account activation (`Activation`).
    Activation,
    /// Password reset (`PasswordReset`).
    PasswordReset,
    /// Invitation to join (`Invitation`).
    Invitation,
}

impl Purpose {
    /// Name of the header carrying the purpose tag.
    pub const HEADER: &'static str = "X-Zeta-Purpose";

    /// The wire value carried in the `X-Zeta-Purpose` header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "Activation",
            Self::PasswordReset => "PasswordReset",
            Self::Invitation => "Invitation",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "activation" => Ok(Self::Activation),
            "passwordreset" => Ok(Self::PasswordReset),
            "invitation" => Ok(Self::Invitation),
            _ => Err(Error::Config(format!("unknown purpose: {s}"))),
        }
    }
}
