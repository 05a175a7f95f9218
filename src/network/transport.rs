//! TCP and TLS transport setup.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig as TlsConfig, RootCertStore};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Open the TCP connection described by `config`.
pub(crate) async fn connect(config: &ClientConfig) -> Result<TcpStream, ClientError> {
    let address = config.address();
    info!(address = %address, tls = config.tls, "Connecting");

    let stream = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .map_err(|source| ClientError::Connect {
            address: address.clone(),
            source,
        })?;

    if let Err(e) = enable_keepalive(&stream) {
        warn!(address = %address, error = %e, "Failed to enable TCP keepalive");
    }
    if let Err(e) = stream.set_nodelay(true) {
        debug!(address = %address, error = %e, "Failed to set TCP_NODELAY");
    }

    Ok(stream)
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

/// Wrap an established TCP stream in TLS, verifying the server against the
/// system's root certificates.
pub(crate) async fn upgrade_to_tls(
    stream: TcpStream,
    host: &str,
) -> Result<TlsStream<TcpStream>, ClientError> {
    let tls_error = |source: io::Error| ClientError::Tls {
        host: host.to_string(),
        source,
    };

    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "Failed to add root cert");
        }
    }
    for e in &certs.errors {
        warn!(error = %e, "Error loading native certs");
    }

    let config = TlsConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| tls_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    let tls = connector
        .connect(server_name, stream)
        .await
        .map_err(tls_error)?;
    debug!(host = %host, "TLS handshake complete");

    Ok(tls)
}
