//! SELECT command handler.
//!
//! Sends the untagged data async-imap expects (`FLAGS`, `EXISTS`,
//! `RECENT`, `UIDVALIDITY`, `UIDNEXT`) and returns the folder name on
//! success so later UID commands know where to look.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> Option<String> {
    let Some(folder) = mailbox.get_folder(folder_name) else {
        let _ = write_line(stream, &format!("{tag} NO [NONEXISTENT] No such folder\r\n")).await;
        return None;
    };

    let uid_next = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0) + 1;
    let lines = [
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n".to_string(),
        format!("* {} EXISTS\r\n", folder.emails.len()),
        "* 0 RECENT\r\n".to_string(),
        "* OK [UIDVALIDITY 1] UIDs valid\r\n".to_string(),
        format!("* OK [UIDNEXT {uid_next}] Predicted next UID\r\n"),
        format!("{tag} OK [READ-WRITE] SELECT completed\r\n"),
    ];
    for line in &lines {
        if write_line(stream, line).await.is_err() {
            return None;
        }
    }
    Some(folder.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: a@zeta.test\r\nSubject: hi\r\n\r\nbody";

    async fn run(folder_name: &str, mailbox: &Mailbox) -> (String, Option<String>) {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);
        let selected = handle_select("S1", folder_name, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), selected)
    }

    #[tokio::test]
    async fn reports_counts_and_next_uid() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(3, true, RAW)
            .email(9, false, RAW)
            .build();

        let (output, selected) = run("INBOX", &mailbox).await;
        assert_eq!(selected.as_deref(), Some("INBOX"));
        assert!(output.contains("* 2 EXISTS\r\n"));
        assert!(output.contains("[UIDNEXT 10]"));
        assert!(output.ends_with("S1 OK [READ-WRITE] SELECT completed\r\n"));
    }

    #[tokio::test]
    async fn empty_folder_predicts_uid_one() {
        let mailbox = MailboxBuilder::new().folder("Automated").build();
        let (output, _) = run("Automated", &mailbox).await;
        assert!(output.contains("* 0 EXISTS\r\n"));
        assert!(output.contains("[UIDNEXT 1]"));
    }

    #[tokio::test]
    async fn unknown_folder_is_no() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let (output, selected) = run("Elsewhere", &mailbox).await;
        assert!(selected.is_none());
        assert!(output.starts_with("S1 NO"));
    }
}
