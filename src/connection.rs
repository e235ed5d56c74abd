//! IMAP connection and TLS helpers
//!
//! Provides the low-level `connect()`, `select()` and `logout()`
//! functions the session pool is built on.

use crate::config::{MailboxSettings, TlsMode};
use crate::error::{Error, Result};
use crate::folder::Folder;
use async_imap::{Client, Session};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<TlsStream<TcpStream>>>;

/// Build a TLS connector for `settings`.
///
/// Verifies against the webpki trust anchors unless the account opts
/// out with `accept_invalid_certs`. Uses the ring provider directly so
/// no process-wide default has to be installed.
fn tls_connector(settings: &MailboxSettings) -> Result<TlsConnector> {
    let builder =
        rustls::ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(e.to_string()))?;
    let config = if settings.accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Open a fresh, authenticated IMAP session.
///
/// Connects to the configured host via TCP, establishes TLS (either
/// immediately or through STARTTLS), reads the greeting, and logs in.
///
/// # Errors
///
/// Returns [`Error::Io`] if the TCP connect fails, [`Error::Tls`] if
/// the handshake fails, and [`Error::Imap`] if the server rejects the
/// greeting or the credentials.
pub async fn connect(settings: &MailboxSettings) -> Result<ImapSession> {
    let addr = format!("{}:{}", settings.host, settings.port());
    debug!("Connecting to IMAP server at {} ({:?})", addr, settings.tls);

    let mut tcp_stream = TcpStream::connect(&addr).await?;

    if settings.tls == TlsMode::StartTls {
        let mut client = Client::new(tcp_stream.compat());
        read_greeting(&mut client).await?;
        client
            .run_command_and_check_ok("STARTTLS", None)
            .await
            .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;
        tcp_stream = client.into_inner().into_inner();
    }

    let connector = tls_connector(settings)?;
    let server_name = ServerName::try_from(settings.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))?;

    let mut tls_client = Client::new(tls_stream.compat());
    if settings.tls == TlsMode::Implicit {
        read_greeting(&mut tls_client).await?;
    }

    let session = tls_client
        .login(&settings.user, &settings.pass)
        .await
        .map_err(|(e, _)| Error::Imap(format!("Login failed for {}: {e}", settings.user)))?;

    info!("Connected to IMAP server {} as {}", addr, settings.user);
    Ok(session)
}

async fn read_greeting<T>(client: &mut Client<T>) -> Result<()>
where
    T: futures::AsyncRead + futures::AsyncWrite + Unpin + std::fmt::Debug + Send,
{
    client
        .read_response()
        .await
        .map_err(|e| Error::Imap(format!("Failed to read greeting: {e}")))?
        .ok_or_else(|| Error::Imap("Connection closed before greeting".into()))?;
    Ok(())
}

/// SELECT a folder on an existing session.
///
/// # Errors
///
/// Returns [`Error::Imap`] if the server refuses the SELECT.
pub async fn select(session: &mut ImapSession, folder: &Folder) -> Result<()> {
    session
        .select(folder.as_str())
        .await
        .map_err(|e| Error::Imap(format!("Failed to select {folder}: {e}")))?;
    Ok(())
}

/// NOOP round trip on an idle session.
///
/// # Errors
///
/// Returns [`Error::Imap`] if the server has closed the connection or
/// answers with anything but OK.
pub async fn noop(session: &mut ImapSession) -> Result<()> {
    session
        .noop()
        .await
        .map_err(|e| Error::Imap(format!("NOOP failed: {e}")))
}

/// Orderly LOGOUT. Failures are logged, not returned: the session is
/// being thrown away either way.
pub async fn logout(mut session: ImapSession) {
    if let Err(e) = session.logout().await {
        debug!("Logout failed: {}", e);
    }
}

/// Certificate verifier that accepts all certificates
/// (for self-signed bridges and test servers).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
