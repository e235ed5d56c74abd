//! Search-and-fetch over one checked-out session
//!
//! A match takes three round trips:
//!
//! ```text
//!   UID SEARCH UNSEEN FROM .. TO .. HEADER ..     candidates (substring hits)
//!   UID FETCH <candidates> (UID BODY.PEEK[HEADER]) headers, flags untouched
//!   UID FETCH <exact> (UID BODY[])                 bodies, sets \Seen
//! ```
//!
//! Only messages whose bare `From`/`To` addresses and purpose value equal
//! the criteria reach the last step, so a near miss stays unseen for
//! whoever it was really sent to.

use crate::connection::{self, ImapSession};
use crate::criteria::MatchCriteria;
use crate::error::{Error, Result};
use crate::folder::Folder;
use crate::message::MatchedMessage;
use futures::TryStreamExt;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Which part of a message a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// `BODY.PEEK[HEADER]`; leaves `\Seen` alone.
    Header,
    /// `BODY[]`; the server flags the message `\Seen`.
    Full,
}

impl Section {
    const fn query(self) -> &'static str {
        match self {
            Self::Header => "(UID BODY.PEEK[HEADER])",
            Self::Full => "(UID BODY[])",
        }
    }
}

/// Find and fetch every unseen message in `folder` matching `criteria`.
///
/// Messages come back in ascending UID order. Each returned message has
/// been fetched with `BODY[]` and is now `\Seen`, so later searches no
/// longer return it: whatever the caller needs from a message must be
/// taken from this result. Candidates the server returned that fail the
/// exact comparison in [`MatchCriteria::matches`] are left unseen.
///
/// # Errors
///
/// Returns [`Error::Imap`] if SELECT, SEARCH or FETCH fails and
/// [`Error::Parse`] if a matched message cannot be parsed.
pub async fn search(
    session: &mut ImapSession,
    folder: &Folder,
    criteria: &MatchCriteria,
) -> Result<Vec<MatchedMessage>> {
    connection::select(session, folder).await?;

    let query = criteria.to_imap_query();
    let uids = session
        .uid_search(&query)
        .await
        .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

    let mut candidates: Vec<u32> = uids.into_iter().collect();
    if candidates.is_empty() {
        debug!("No messages matching '{}'", query);
        return Ok(vec![]);
    }
    candidates.sort_unstable();

    let heads = fetch_section(session, &candidates, Section::Header).await?;
    let exact: Vec<u32> = heads
        .into_iter()
        .filter(|(uid, head)| match MatchedMessage::parse(*uid, head) {
            Ok(message) => criteria.matches(&message),
            Err(e) => {
                debug!("Skipping UID {}: {}", uid, e);
                false
            }
        })
        .map(|(uid, _)| uid)
        .collect();

    if exact.is_empty() {
        debug!(
            "{} candidates for '{}', none an exact match",
            candidates.len(),
            query
        );
        return Ok(vec![]);
    }

    info!(
        "Found {} messages matching '{}' ({} candidates)",
        exact.len(),
        query,
        candidates.len()
    );

    let bodies = fetch_section(session, &exact, Section::Full).await?;
    bodies
        .into_iter()
        .map(|(uid, body)| MatchedMessage::parse(uid, &body))
        .collect()
}

fn uid_set(uids: &[u32]) -> String {
    uids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// UID FETCH one section of `uids`, keyed by UID.
///
/// Every requested UID must come back: a message expunged between the
/// SEARCH and the FETCH is reported as an error.
async fn fetch_section(
    session: &mut ImapSession,
    uids: &[u32],
    section: Section,
) -> Result<BTreeMap<u32, Vec<u8>>> {
    let fetches: Vec<_> = session
        .uid_fetch(uid_set(uids), section.query())
        .await
        .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?
        .try_collect()
        .await
        .map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;

    let mut parts = BTreeMap::new();
    for fetch in &fetches {
        let data = match section {
            Section::Header => fetch.header(),
            Section::Full => fetch.body(),
        };
        // Unsolicited FLAGS updates arrive as fetches without data.
        if let (Some(uid), Some(data)) = (fetch.uid, data) {
            parts.insert(uid, data.to_vec());
        }
    }

    if let Some(missing) = uids.iter().find(|uid| !parts.contains_key(uid)) {
        return Err(Error::Imap(format!("No data found for UID {missing}")));
    }
    Ok(parts)
}
