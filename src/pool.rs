//! Bounded pool of authenticated sessions
//!
//! Each [`crate::Mailbox`] owns one pool. A semaphore caps the number
//! of sessions checked out at once; idle sessions wait in a queue and
//! are reused before new ones are opened. Nothing is opened eagerly.
//!
//! An idle session may have been dropped by the server in the meantime,
//! so each one is checked ([`Manage::check`]) before it is handed out.
//! One that fails is destroyed and the next candidate tried, falling
//! back to a fresh session.

use crate::connection::{self, ImapSession};
use crate::config::MailboxSettings;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::debug;

/// Creates and destroys the sessions a [`Pool`] hands out.
pub trait Manage: Send + Sync {
    type Session: Send;

    /// Open a new ready-to-use session.
    fn create(&self) -> impl Future<Output = Result<Self::Session>> + Send;

    /// Confirm an idle session still works before it is reused.
    fn check(&self, session: &mut Self::Session) -> impl Future<Output = Result<()>> + Send;

    /// Tear a session down.
    fn destroy(&self, session: Self::Session) -> impl Future<Output = ()> + Send;
}

/// Opens IMAP sessions for one account.
pub struct ImapManager {
    settings: MailboxSettings,
}

impl ImapManager {
    #[must_use]
    pub const fn new(settings: MailboxSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &MailboxSettings {
        &self.settings
    }
}

impl Manage for ImapManager {
    type Session = ImapSession;

    async fn create(&self) -> Result<ImapSession> {
        connection::connect(&self.settings).await
    }

    async fn check(&self, session: &mut ImapSession) -> Result<()> {
        connection::noop(session).await
    }

    async fn destroy(&self, session: ImapSession) {
        connection::logout(session).await;
    }
}

/// Sizing and idle policy for a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_size: NonZeroUsize,
    /// Idle sessions kept even after `max_idle_time`.
    pub min_idle: usize,
    pub max_idle_time: Duration,
}

impl PoolConfig {
    #[must_use]
    pub const fn with_max_size(max_size: NonZeroUsize) -> Self {
        Self {
            max_size,
            min_idle: 1,
            max_idle_time: Duration::from_secs(60),
        }
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub in_use: usize,
    pub idle: usize,
    pub max_size: usize,
}

struct Idle<S> {
    session: S,
    since: Instant,
}

pub struct Pool<M: Manage> {
    manager: M,
    config: PoolConfig,
    permits: Semaphore,
    idle: Mutex<VecDeque<Idle<M::Session>>>,
}

impl<M: Manage> Pool<M> {
    #[must_use]
    pub fn new(manager: M, config: PoolConfig) -> Self {
        Self {
            manager,
            permits: Semaphore::new(config.max_size.get()),
            config,
            idle: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub const fn manager(&self) -> &M {
        &self.manager
    }

    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Check out a session, waiting for a free slot if all
    /// `max_size` sessions are in use.
    ///
    /// Reuses the most recently returned idle session that passes
    /// [`Manage::check`]; idle sessions failing it are destroyed. With
    /// none left a new session is opened through the manager.
    ///
    /// # Errors
    ///
    /// Whatever [`Manage::create`] returns; there is no retry.
    pub async fn acquire(&self) -> Result<Pooled<'_, M>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Imap("session pool closed".into()))?;

        while let Some(mut session) = self.take_idle().await {
            match self.manager.check(&mut session).await {
                Ok(()) => {
                    debug!("Reusing idle session");
                    return Ok(Pooled {
                        pool: self,
                        session,
                        _permit: permit,
                    });
                }
                Err(e) => {
                    debug!("Idle session failed check, destroying: {}", e);
                    self.manager.destroy(session).await;
                }
            }
        }

        // The permit is dropped with the error, freeing the slot.
        let session = self.manager.create().await?;
        debug!("Opened new pooled session");
        Ok(Pooled {
            pool: self,
            session,
            _permit: permit,
        })
    }

    pub async fn status(&self) -> PoolStatus {
        let max_size = self.config.max_size.get();
        PoolStatus {
            in_use: max_size - self.permits.available_permits(),
            idle: self.idle.lock().await.len(),
            max_size,
        }
    }

    /// Pop the freshest idle session, destroying stale ones that exceed
    /// the `min_idle` reserve.
    async fn take_idle(&self) -> Option<M::Session> {
        let (fresh, stale) = {
            let mut idle = self.idle.lock().await;
            let mut stale = Vec::new();
            while idle.len() > self.config.min_idle
                && idle
                    .front()
                    .is_some_and(|i| i.since.elapsed() >= self.config.max_idle_time)
            {
                if let Some(i) = idle.pop_front() {
                    stale.push(i.session);
                }
            }
            (idle.pop_back().map(|i| i.session), stale)
        };

        for session in stale {
            debug!("Destroying session idle past {:?}", self.config.max_idle_time);
            self.manager.destroy(session).await;
        }
        fresh
    }

    async fn put_idle(&self, session: M::Session) {
        self.idle.lock().await.push_back(Idle {
            session,
            since: Instant::now(),
        });
    }
}

/// A session checked out of a [`Pool`].
///
/// Finish with [`Pooled::release`] while the session is still usable or
/// [`Pooled::discard`] once it is not; [`Pooled::finish`] picks one from
/// an operation's result. Dropping the guard without any of them closes
/// the session without logging out.
pub struct Pooled<'a, M: Manage> {
    pool: &'a Pool<M>,
    session: M::Session,
    _permit: SemaphorePermit<'a>,
}

impl<M: Manage> Pooled<'_, M> {
    /// Borrow the session for the current operation.
    pub const fn session(&mut self) -> &mut M::Session {
        &mut self.session
    }

    /// Return the session to the idle queue.
    pub async fn release(self) {
        let Self { pool, session, .. } = self;
        pool.put_idle(session).await;
    }

    /// Destroy the session; its slot becomes free for a new one.
    pub async fn discard(self) {
        let Self { pool, session, .. } = self;
        pool.manager.destroy(session).await;
    }

    /// Discard after a transport failure, release otherwise.
    ///
    /// A message that fails to parse says nothing about the connection,
    /// so [`Error::Parse`] and the other non-transport errors keep the
    /// session.
    pub async fn finish<T>(self, result: &Result<T>) {
        match result {
            Err(e) if e.is_transport() => self.discard().await,
            _ => self.release().await,
        }
    }
}
