//! rustls client setup.

use std::fs::File;
use std::io::{self, BufReader};
use std::net::TcpStream;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, ClientConnection, DigitallySignedStruct};
use rustls::{RootCertStore, SignatureScheme, StreamOwned, SupportedProtocolVersion};

use crate::config::{TlsOptions, TlsVersion};
use crate::{Error, Result};

pub(crate) type TlsStream = StreamOwned<ClientConnection, TcpStream>;

/// Build the client config once per [`crate::Client`].
pub(crate) fn client_config(
    options: &TlsOptions,
    protocol: Option<TlsVersion>,
) -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let versions: Vec<&'static SupportedProtocolVersion> = match protocol {
        Some(TlsVersion::Tls12) => vec![&rustls::version::TLS12],
        Some(TlsVersion::Tls13) => vec![&rustls::version::TLS13],
        None => rustls::ALL_VERSIONS.to_vec(),
    };

    let roots = Arc::new(root_store(options)?);

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&versions)
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    let config = if options.is_strict() {
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        let verifier = RelaxedVerifier::new(options, roots, provider)?;
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth()
    };

    debug!(
        "TLS profile: {}",
        protocol.map(|p| p.to_string()).unwrap_or_else(|| "TLSv1.2+".into())
    );

    Ok(Arc::new(config))
}

fn root_store(options: &TlsOptions) -> Result<RootCertStore> {
    let mut store = RootCertStore::empty();
    store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    if let Some(path) = &options.cafile {
        let invalid = |e: &dyn std::fmt::Display| {
            Error::InvalidConfig(format!("cafile {}: {}", path.display(), e))
        };

        let file = File::open(path).map_err(|e| invalid(&e))?;
        let mut reader = BufReader::new(file);

        let mut added = 0;
        for cert in rustls_pemfile::certs(&mut reader) {
            let cert = cert.map_err(|e| invalid(&e))?;
            store.add(cert).map_err(|e| invalid(&e))?;
            added += 1;
        }
        debug!("Added {} certificates from {}", added, path.display());
    }

    Ok(store)
}

/// Run the handshake to completion over a connected socket.
pub(crate) fn handshake(
    mut tcp: TcpStream,
    host: &str,
    config: Arc<ClientConfig>,
) -> io::Result<TlsStream> {
    let name = ServerName::try_from(host.to_string())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut conn = ClientConnection::new(config, name)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    while conn.is_handshaking() {
        conn.complete_io(&mut tcp)?;
    }

    debug!(
        "TLS established with {}: {:?} {:?}",
        host,
        conn.protocol_version(),
        conn.negotiated_cipher_suite().map(|s| s.suite())
    );

    Ok(StreamOwned::new(conn, tcp))
}

/// Send close_notify without waiting for the peer.
pub(crate) fn close_notify(stream: &mut TlsStream) {
    stream.conn.send_close_notify();
    while stream.conn.wants_write() {
        if stream.conn.write_tls(&mut stream.sock).is_err() {
            break;
        }
    }
}

/// Webpki verification that forgives the failures the options allow.
#[derive(Debug)]
struct RelaxedVerifier {
    inner: Arc<WebPkiServerVerifier>,
    verify_peer: bool,
    verify_peer_name: bool,
    allow_self_signed: bool,
}

impl RelaxedVerifier {
    fn new(
        options: &TlsOptions,
        roots: Arc<RootCertStore>,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self> {
        let inner = WebPkiServerVerifier::builder_with_provider(roots, provider)
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        if !options.verify_peer {
            warn!("TLS peer verification is disabled");
        }
        if !options.verify_peer_name {
            warn!("TLS peer name verification is disabled");
        }
        if options.allow_self_signed {
            warn!("TLS accepts self-signed certificates");
        }

        Ok(RelaxedVerifier {
            inner,
            verify_peer: options.verify_peer,
            verify_peer_name: options.verify_peer_name,
            allow_self_signed: options.allow_self_signed,
        })
    }
}

fn is_name_mismatch(e: &CertificateError) -> bool {
    matches!(
        e,
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
    )
}

impl ServerCertVerifier for RelaxedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if !self.verify_peer {
            return Ok(ServerCertVerified::assertion());
        }

        let result = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        );

        match result {
            Err(rustls::Error::InvalidCertificate(e))
                if !self.verify_peer_name && is_name_mismatch(&e) =>
            {
                Ok(ServerCertVerified::assertion())
            }
            Err(rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer))
                if self.allow_self_signed && intermediates.is_empty() =>
            {
                Ok(ServerCertVerified::assertion())
            }
            r => r,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
