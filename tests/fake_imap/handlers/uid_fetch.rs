//! UID FETCH command handler.
//!
//! Message data goes out as counted literals:
//!
//! ```text
//! * <seq> FETCH (UID <uid> FLAGS (\Seen) BODY[] {<length>}
//! <exactly length bytes of raw RFC 2822 message>
//! )
//! ```
//!
//! `BODY[HEADER]` sends only the header block. Fetching `BODY[...]`
//! sets `\Seen` (RFC 3501 Section 6.4.5) while `BODY.PEEK[...]` does not,
//! so this handler mutates the shared mailbox.

use crate::fake_imap::io::{write_bytes, write_line};
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// The body section a UID FETCH asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchItems {
    /// `BODY.PEEK[...]`: leave `\Seen` alone.
    pub peek: bool,
    /// `[HEADER]` rather than the whole message.
    pub header_only: bool,
}

impl FetchItems {
    /// Read the section off the raw command line.
    pub fn from_command(line: &str) -> Self {
        let upper = line.to_ascii_uppercase();
        Self {
            peek: upper.contains("BODY.PEEK["),
            header_only: upper.contains("[HEADER]"),
        }
    }
}

/// Does `uid` fall inside `seq_set`? `*` is treated as unbounded.
fn in_set(seq_set: &SequenceSet, uid: u32) -> bool {
    let bound = |s: &SeqOrUid| match s {
        SeqOrUid::Value(v) => v.get(),
        SeqOrUid::Asterisk => u32::MAX,
    };
    seq_set.0.as_ref().iter().any(|seq| match seq {
        Sequence::Single(s) => bound(s) == uid,
        Sequence::Range(a, b) => {
            let (lo, hi) = (bound(a).min(bound(b)), bound(a).max(bound(b)));
            (lo..=hi).contains(&uid)
        }
    })
}

pub async fn handle_uid_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    items: FetchItems,
    mailbox: &Mutex<Mailbox>,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    // Collect under the lock, write after releasing it.
    let hits: Option<Vec<(usize, u32, bool, Vec<u8>)>> = {
        let mut guard = mailbox.lock().unwrap();
        let folder = match selected_folder {
            Some(name) => guard.get_folder_mut(name),
            None => None,
        };
        folder.map(|folder| {
            folder
                .emails
                .iter_mut()
                .enumerate()
                .filter(|(_, e)| in_set(sequence_set, e.uid))
                .map(|(idx, e)| {
                    if !items.peek {
                        e.seen = true;
                    }
                    let data = if items.header_only { e.head().to_vec() } else { e.raw.clone() };
                    (idx + 1, e.uid, e.seen, data)
                })
                .collect()
        })
    };

    let Some(hits) = hits else {
        let _ = write_line(stream, &format!("{tag} BAD No folder selected\r\n")).await;
        return;
    };

    let section = if items.header_only { "BODY[HEADER]" } else { "BODY[]" };
    for (seq, uid, seen, data) in hits {
        let flags = if seen { "\\Seen" } else { "" };
        let head = format!("* {seq} FETCH (UID {uid} FLAGS ({flags}) {section} {{{}}}\r\n", data.len());
        if write_line(stream, &head).await.is_err()
            || write_bytes(stream, &data).await.is_err()
            || write_line(stream, ")\r\n").await.is_err()
        {
            return;
        }
    }
    let _ = write_line(stream, &format!("{tag} OK FETCH completed\r\n")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use std::num::NonZeroU32;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: noreply@zeta.test\r\nSubject: hi\r\n\r\nbody";

    fn uids(list: &[u32]) -> SequenceSet {
        let seqs: Vec<Sequence> = list
            .iter()
            .map(|u| Sequence::Single(SeqOrUid::Value(NonZeroU32::new(*u).unwrap())))
            .collect();
        SequenceSet(seqs.try_into().unwrap())
    }

    const FULL: FetchItems = FetchItems {
        peek: false,
        header_only: false,
    };

    async fn run(set: &SequenceSet, mailbox: &Mutex<Mailbox>, selected: Option<&str>) -> String {
        run_items(set, FULL, mailbox, selected).await
    }

    async fn run_items(
        set: &SequenceSet,
        items: FetchItems,
        mailbox: &Mutex<Mailbox>,
        selected: Option<&str>,
    ) -> String {
        let (client, server) = tokio::io::duplex(8192);
        let mut stream = BufReader::new(server);
        handle_uid_fetch("F1", set, items, mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn sends_literal_and_marks_seen() {
        let mailbox = Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .email(7, false, RAW)
                .email(8, false, RAW)
                .build(),
        );

        let output = run(&uids(&[8]), &mailbox, Some("INBOX")).await;
        assert!(output.starts_with(&format!("* 2 FETCH (UID 8 FLAGS (\\Seen) BODY[] {{{}}}\r\n", RAW.len())));
        assert!(output.ends_with(")\r\nF1 OK FETCH completed\r\n"));

        let guard = mailbox.lock().unwrap();
        let inbox = guard.get_folder("INBOX").unwrap();
        assert!(!inbox.emails[0].seen);
        assert!(inbox.emails[1].seen);
    }

    #[test]
    fn items_are_read_off_the_command_line() {
        assert_eq!(FetchItems::from_command("A3 UID FETCH 1:2 (UID BODY[])"), FULL);
        assert_eq!(
            FetchItems::from_command("A3 UID FETCH 4 (UID body.peek[header])"),
            FetchItems {
                peek: true,
                header_only: true
            }
        );
    }

    #[tokio::test]
    async fn peeked_header_leaves_message_unseen() {
        let mailbox = Mutex::new(MailboxBuilder::new().folder("INBOX").email(7, false, RAW).build());
        let items = FetchItems {
            peek: true,
            header_only: true,
        };

        let output = run_items(&uids(&[7]), items, &mailbox, Some("INBOX")).await;
        let head = "From: noreply@zeta.test\r\nSubject: hi\r\n\r\n";
        assert_eq!(
            output,
            format!("* 1 FETCH (UID 7 FLAGS () BODY[HEADER] {{{}}}\r\n{head})\r\nF1 OK FETCH completed\r\n", head.len())
        );
        assert!(!mailbox.lock().unwrap().get_folder("INBOX").unwrap().emails[0].seen);
    }

    #[tokio::test]
    async fn multiple_uids_in_folder_order() {
        let mailbox = Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .email(1, false, RAW)
                .email(2, false, RAW)
                .email(3, false, RAW)
                .build(),
        );

        let output = run(&uids(&[3, 1]), &mailbox, Some("INBOX")).await;
        let first = output.find("UID 1 ").unwrap();
        let third = output.find("UID 3 ").unwrap();
        assert!(first < third);
        assert!(!output.contains("UID 2 "));
    }

    #[tokio::test]
    async fn unknown_uid_yields_only_ok() {
        let mailbox = Mutex::new(MailboxBuilder::new().folder("INBOX").build());
        let output = run(&uids(&[99]), &mailbox, Some("INBOX")).await;
        assert_eq!(output, "F1 OK FETCH completed\r\n");
    }

    #[tokio::test]
    async fn requires_selected_folder() {
        let mailbox = Mutex::new(MailboxBuilder::new().folder("INBOX").build());
        let output = run(&uids(&[1]), &mailbox, None).await;
        assert_eq!(output, "F1 BAD No folder selected\r\n");
    }
}
