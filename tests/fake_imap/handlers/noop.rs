//! NOOP command handler.
//!
//! The client sends NOOP to check an idle pooled session before reusing
//! it. A session the test has expired gets `* BYE` and no tagged reply,
//! and the server then closes it, as after a server-side idle timeout.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the NOOP command. Returns whether the session stays open.
pub async fn handle_noop<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    expired: bool,
    stream: &mut BufReader<S>,
) -> bool {
    if expired {
        let _ = write_line(stream, "* BYE Idle timeout\r\n").await;
        return false;
    }
    write_line(stream, &format!("{tag} OK NOOP completed\r\n"))
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn run(tag: &str, expired: bool) -> (String, bool) {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        let open = handle_noop(tag, expired, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), open)
    }

    #[tokio::test]
    async fn live_session_gets_ok() {
        let (output, open) = run("A7", false).await;
        assert_eq!(output, "A7 OK NOOP completed\r\n");
        assert!(open);
    }

    #[tokio::test]
    async fn expired_session_gets_bye() {
        let (output, open) = run("A7", true).await;
        assert_eq!(output, "* BYE Idle timeout\r\n");
        assert!(!open);
    }
}
