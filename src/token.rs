//! Correlation tokens carried in `x-zeta-*` headers
//!
//! Each purpose has its own token type. Decoding is strict: a matched
//! message without the headers its purpose needs is an error, never
//! skipped, because the fetch has already consumed it.

use crate::error::{Error, Result};
use crate::message::MatchedMessage;
use crate::nonempty::NonEmpty;
use crate::purpose::Purpose;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub const KEY_HEADER: &str = "x-zeta-key";
pub const CODE_HEADER: &str = "x-zeta-code";

/// A token type decodable from a matched message.
pub trait Token: Sized {
    /// The purpose tag this token is searched by.
    const PURPOSE: Purpose;

    /// Decode one message.
    ///
    /// # Errors
    ///
    /// [`Error::MissingEmailHeaders`] if a required header is absent,
    /// or a purpose-specific validation error.
    fn decode(message: &MatchedMessage) -> Result<Self>;

    /// Decode every message, keeping their order.
    ///
    /// # Errors
    ///
    /// The first message that fails to decode fails the whole batch.
    fn decode_all(messages: &NonEmpty<MatchedMessage>) -> Result<NonEmpty<Self>> {
        messages.try_map(Self::decode)
    }
}

macro_rules! ascii_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

ascii_newtype!(
    /// Activation key from `x-zeta-key`.
    ActivationKey
);
ascii_newtype!(
    /// Activation code from `x-zeta-code`.
    ActivationCode
);
ascii_newtype!(
    /// Password-reset key from `x-zeta-key`.
    ResetKey
);
ascii_newtype!(
    /// Password-reset code from `x-zeta-code`.
    ResetCode
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activation {
    pub key: ActivationKey,
    pub code: ActivationCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordReset {
    pub key: ResetKey,
    pub code: ResetCode,
}

/// Invitation identifier from `x-zeta-code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InvitationId(pub Uuid);

impl fmt::Display for InvitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Token for Activation {
    const PURPOSE: Purpose = Purpose::Activation;

    fn decode(message: &MatchedMessage) -> Result<Self> {
        let (key, code) = key_and_code(message, Self::PURPOSE)?;
        Ok(Self {
            key: ActivationKey(key),
            code: ActivationCode(code),
        })
    }
}

impl Token for PasswordReset {
    const PURPOSE: Purpose = Purpose::PasswordReset;

    fn decode(message: &MatchedMessage) -> Result<Self> {
        let (key, code) = key_and_code(message, Self::PURPOSE)?;
        Ok(Self {
            key: ResetKey(key),
            code: ResetCode(code),
        })
    }
}

impl Token for InvitationId {
    const PURPOSE: Purpose = Purpose::Invitation;

    fn decode(message: &MatchedMessage) -> Result<Self> {
        let value = message
            .header(CODE_HEADER)
            .ok_or_else(|| Error::MissingEmailHeaders {
                purpose: Self::PURPOSE,
                uid: message.uid,
                missing: vec![CODE_HEADER],
            })?;
        let trimmed = value.trim();
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|e| Error::InvalidInvitationId {
                value: trimmed.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Read both `x-zeta-key` and `x-zeta-code`, reporting every missing
/// one at once.
fn key_and_code(message: &MatchedMessage, purpose: Purpose) -> Result<(String, String)> {
    let key = message.header(KEY_HEADER);
    let code = message.header(CODE_HEADER);
    match (key, code) {
        (Some(key), Some(code)) => Ok((
            ascii(message, KEY_HEADER, key)?,
            ascii(message, CODE_HEADER, code)?,
        )),
        _ => {
            let missing = [(KEY_HEADER, key), (CODE_HEADER, code)]
                .into_iter()
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| name)
                .collect();
            Err(Error::MissingEmailHeaders {
                purpose,
                uid: message.uid,
                missing,
            })
        }
    }
}

fn ascii(message: &MatchedMessage, header: &'static str, value: &str) -> Result<String> {
    if value.is_ascii() {
        Ok(value.to_string())
    } else {
        Err(Error::InvalidHeaderValue {
            header,
            uid: message.uid,
        })
    }
}
