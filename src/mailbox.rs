//! Mailbox handles and the public await operations

use crate::config::{self, MailboxSettings};
use crate::criteria::MatchCriteria;
use crate::error::{Error, Result};
use crate::matcher;
use crate::message::MatchedMessage;
use crate::nonempty::NonEmpty;
use crate::poll::{PollError, PollPolicy, poll_until_found};
use crate::pool::{ImapManager, Pool, PoolConfig, PoolStatus};
use crate::purpose::Purpose;
use crate::token::{Activation, InvitationId, PasswordReset, Token};
use std::path::Path;
use tracing::{info, warn};

/// One configured account plus the session pool bound to it.
///
/// Safe to share between tasks (e.g. behind an `Arc`): concurrent
/// awaits compete for the pool's `conn` sessions and never share one.
pub struct Mailbox {
    pool: Pool<ImapManager>,
    policy: PollPolicy,
}

/// Build one [`Mailbox`] per account in the JSON settings file at
/// `path`.
///
/// # Errors
///
/// See [`config::load_settings`].
pub async fn load_mailbox_config(path: impl AsRef<Path>) -> Result<Vec<Mailbox>> {
    let settings = config::load_settings(path).await?;
    Ok(settings.into_iter().map(Mailbox::new).collect())
}

impl Mailbox {
    /// Create a handle. No connection is opened until the first await.
    #[must_use]
    pub fn new(settings: MailboxSettings) -> Self {
        let config = PoolConfig::with_max_size(settings.conn);
        Self {
            pool: Pool::new(ImapManager::new(settings), config),
            policy: PollPolicy::default(),
        }
    }

    /// Replace the default 5 s / 120 s polling policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &MailboxSettings {
        self.pool.manager().settings()
    }

    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub async fn pool_status(&self) -> PoolStatus {
        self.pool.status().await
    }

    /// Run one search-and-fetch on a pooled session.
    ///
    /// The session goes back to the pool unless the attempt failed in
    /// transport (see [`Error::is_transport`]), in which case it is
    /// logged out and dropped.
    ///
    /// # Errors
    ///
    /// Connection, login, or any IMAP/MIME failure of this one attempt.
    pub async fn search(&self, criteria: &MatchCriteria) -> Result<Vec<MatchedMessage>> {
        let mut conn = self.pool.acquire().await?;
        let folder = &self.settings().folder;
        let result = matcher::search(conn.session(), folder, criteria).await;
        if let Err(e) = &result {
            warn!("Search on {} failed: {}", self.settings().user, e);
        }
        conn.finish(&result).await;
        result
    }

    /// Poll until at least one message matches `criteria`.
    ///
    /// # Errors
    ///
    /// [`Error::EmailTimeout`] if nothing matched within the policy's
    /// timeout; any error from a single attempt ends the wait at once.
    pub async fn await_mail(&self, criteria: &MatchCriteria) -> Result<NonEmpty<MatchedMessage>> {
        info!(
            "Waiting for {} e-mail from {} to {}",
            criteria.purpose, criteria.from, criteria.to
        );
        poll_until_found(self.policy, || self.search(criteria))
            .await
            .map_err(|e| match e {
                PollError::Failed(e) => e,
                PollError::TimedOut { waited } => Error::EmailTimeout {
                    purpose: criteria.purpose,
                    from: criteria.from.clone(),
                    to: criteria.to.clone(),
                    waited,
                },
            })
    }

    /// Wait for mail of `T`'s purpose and decode one token per message.
    ///
    /// # Errors
    ///
    /// As [`Mailbox::await_mail`], plus any decoding failure of a
    /// matched message.
    pub async fn await_tokens<T: Token>(&self, from: &str, to: &str) -> Result<NonEmpty<T>> {
        let criteria = MatchCriteria::new(from, to, T::PURPOSE);
        let messages = self.await_mail(&criteria).await?;
        T::decode_all(&messages)
    }

    /// Wait for activation e-mails from `from` to `to`.
    ///
    /// # Errors
    ///
    /// See [`Mailbox::await_tokens`].
    pub async fn await_activation_mail(&self, from: &str, to: &str) -> Result<NonEmpty<Activation>> {
        self.await_tokens(from, to).await
    }

    /// Wait for password-reset e-mails from `from` to `to`.
    ///
    /// # Errors
    ///
    /// See [`Mailbox::await_tokens`].
    pub async fn await_password_reset_mail(
        &self,
        from: &str,
        to: &str,
    ) -> Result<NonEmpty<PasswordReset>> {
        self.await_tokens(from, to).await
    }

    /// Wait for invitation e-mails from `from` to `to`.
    ///
    /// # Errors
    ///
    /// See [`Mailbox::await_tokens`].
    pub async fn await_invitation_mail(
        &self,
        from: &str,
        to: &str,
    ) -> Result<NonEmpty<InvitationId>> {
        self.await_tokens(from, to).await
    }

    /// Purpose-erased wait used by the CLI.
    ///
    /// # Errors
    ///
    /// See [`Mailbox::await_tokens`].
    pub async fn await_purpose(
        &self,
        purpose: Purpose,
        from: &str,
        to: &str,
    ) -> Result<serde_json::Value> {
        let value = match purpose {
            Purpose::Activation => serde_json::to_value(self.await_activation_mail(from, to).await?),
            Purpose::PasswordReset => {
                serde_json::to_value(self.await_password_reset_mail(from, to).await?)
            }
            Purpose::Invitation => serde_json::to_value(self.await_invitation_mail(from, to).await?),
        };
        value.map_err(|e| Error::Parse(format!("Token serialization failed: {e}")))
    }
}
