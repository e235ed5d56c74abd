//! LOGOUT command handler: untagged BYE, then the tagged OK.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_logout<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) {
    let _ = write_line(stream, "* BYE Fake server logging out\r\n").await;
    let _ = write_line(stream, &format!("{tag} OK LOGOUT completed\r\n")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn bye_precedes_tagged_ok() {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);
        handle_logout("A0009", &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        let output = String::from_utf8(buf).unwrap();

        let bye = output.find("* BYE").unwrap();
        let ok = output.find("A0009 OK LOGOUT completed\r\n").unwrap();
        assert!(bye < ok);
    }
}
