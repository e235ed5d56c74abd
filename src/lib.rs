//! Test-mail retrieval over IMAP
//!
//! Waits for the automated e-mails (account activation, password
//! reset, invitation) a service under test sends, and hands the
//! correlation tokens from their `x-zeta-*` headers back to the test
//! harness.
//!
//! ```no_run
//! use zeta_inbox::load_mailbox_config;
//!
//! # async fn run() -> zeta_inbox::Result<()> {
//! let mailboxes = load_mailbox_config("mailboxes.json").await?;
//! let tokens = mailboxes[0]
//!     .await_activation_mail("noreply@zeta.test", "qa+42@example.com")
//!     .await?;
//! println!("activate with {}", tokens.first().key);
//! # Ok(())
//! # }
//! ```
//!
//! Each [`Mailbox`] polls every 5 seconds for up to 2 minutes by
//! default, over at most `conn` pooled sessions.

mod config;
mod connection;
mod criteria;
mod error;
mod folder;
mod mailbox;
mod matcher;
mod message;
mod nonempty;
mod poll;
mod pool;
mod purpose;
mod token;

pub use config::{MailboxSettings, TlsMode, load_settings, parse_settings};
pub use criteria::MatchCriteria;
pub use error::{Error, Result};
pub use folder::Folder;
pub use mailbox::{Mailbox, load_mailbox_config};
pub use message::MatchedMessage;
pub use nonempty::NonEmpty;
pub use poll::{PollError, PollPolicy, poll_until_found};
pub use pool::{Manage, Pool, PoolConfig, PoolStatus, Pooled};
pub use purpose::Purpose;
pub use token::{
    Activation, ActivationCode, ActivationKey, InvitationId, PasswordReset, ResetCode, ResetKey,
    Token,
};
