//! Parsed representation of a matched e-mail

use crate::error::{Error, Result};
use mailparse::MailAddr;

/// One e-mail that satisfied the match criteria.
///
/// Keeps every top-level header in delivery order; decoders read the
/// first occurrence of the names they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedMessage {
    pub uid: u32,
    headers: Vec<(String, String)>,
}

impl MatchedMessage {
    /// Parse a raw RFC 2822 message fetched under `uid`. Header values
    /// are unfolded, decoded and trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the MIME structure is malformed.
    pub fn parse(uid: u32, raw: &[u8]) -> Result<Self> {
        let mail = mailparse::parse_mail(raw)
            .map_err(|e| Error::Parse(format!("UID {uid}: {e}")))?;
        let headers = mail
            .headers
            .iter()
            .map(|h| (h.get_key(), h.get_value().trim().to_string()))
            .collect();
        Ok(Self { uid, headers })
    }

    /// Build a message from already-split headers.
    #[must_use]
    pub const fn from_headers(uid: u32, headers: Vec<(String, String)>) -> Self {
        Self { uid, headers }
    }

    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers_named(name).next()
    }

    /// Every value of header `name`, in delivery order.
    pub fn headers_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Bare addresses in the first `name` header (`From`, `To`, ...).
    /// Display names are dropped and groups flattened; an unparseable
    /// header yields no addresses.
    #[must_use]
    pub fn addresses(&self, name: &str) -> Vec<String> {
        let Some(value) = self.header(name) else {
            return Vec::new();
        };
        let Ok(list) = mailparse::addrparse(value) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for addr in list.iter() {
            match addr {
                MailAddr::Single(info) => out.push(info.addr.clone()),
                MailAddr::Group(group) => out.extend(group.addrs.iter().map(|i| i.addr.clone())),
            }
        }
        out
    }
}
