//! Search criteria for automated e-mails

use crate::message::MatchedMessage;
use crate::purpose::Purpose;

/// What a matching e-mail looks like: unseen, from `from`, to `to`,
/// tagged with `purpose`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    pub from: String,
    pub to: String,
    pub purpose: Purpose,
}

impl MatchCriteria {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, purpose: Purpose) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            purpose,
        }
    }

    /// The IMAP `SEARCH` key list for these criteria.
    ///
    /// ```
    /// use zeta_inbox::{MatchCriteria, Purpose};
    ///
    /// let c = MatchCriteria::new("noreply@zeta.test", "qa@example.com", Purpose::Invitation);
    /// assert_eq!(
    ///     c.to_imap_query(),
    ///     r#"UNSEEN FROM "noreply@zeta.test" TO "qa@example.com" HEADER X-Zeta-Purpose "Invitation""#
    /// );
    /// ```
    #[must_use]
    pub fn to_imap_query(&self) -> String {
        format!(
            "UNSEEN FROM {} TO {} HEADER {} {}",
            quote(&self.from),
            quote(&self.to),
            Purpose::HEADER,
            quote(self.purpose.as_str()),
        )
    }

    /// Exact check of a message's headers against these criteria.
    ///
    /// IMAP `FROM`, `TO` and `HEADER` keys match substrings, so a search
    /// for `a@example.com` also returns mail to `qa@example.com`. The
    /// server's hits are narrowed with this before anything is marked
    /// seen: the sender must be the `From` address, the recipient one of
    /// the `To` addresses (both ASCII case-insensitive), and the purpose
    /// header must equal the wire value.
    #[must_use]
    pub fn matches(&self, message: &MatchedMessage) -> bool {
        let from = message
            .addresses("From")
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&self.from));
        let to = message
            .addresses("To")
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&self.to));
        let purpose = message.header(Purpose::HEADER) == Some(self.purpose.as_str());
        from && to && purpose
    }
}

/// IMAP quoted string (RFC 3501 `quoted`).
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
