//! TLS material for secure mode.

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

use crate::domain::error::ServerError;

/// Certificate chain, key and the PEM the internal client trusts.
pub struct TlsMaterial {
    acceptor: TlsAcceptor,
    ca_pem: Vec<u8>,
}

impl TlsMaterial {
    /// Load the certificate chain and key. Unreadable or malformed files are
    /// fatal.
    pub fn load(certificate_file: &Path, key_file: &Path) -> Result<Self, ServerError> {
        let cert_pem = read(certificate_file)?;
        let key_pem = read(key_file)?;

        let certs = parse_certificates(&cert_pem)
            .map_err(|reason| tls_error(certificate_file, reason))?;
        let key = parse_private_key(&key_pem).map_err(|reason| tls_error(key_file, reason))?;

        let mut config = rustls::ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(certificate_file, e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| tls_error(certificate_file, format!("server config error: {e}")))?;

        // h2 first: RPC clients require it, browsers fall back to http/1.1.
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(Self {
            acceptor: TlsAcceptor::from(Arc::new(config)),
            ca_pem: cert_pem,
        })
    }

    pub fn acceptor(&self) -> TlsAcceptor {
        self.acceptor.clone()
    }

    /// Trust anchor for the internal HTTP→RPC dial.
    pub fn ca_pem(&self) -> &[u8] {
        &self.ca_pem
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ServerError> {
    std::fs::read(path).map_err(|e| tls_error(path, e.to_string()))
}

fn tls_error(path: &Path, reason: String) -> ServerError {
    ServerError::Tls {
        path: path.to_path_buf(),
        reason,
    }
}

/// Parse PEM-encoded certificates.
fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, String> {
    let certs = CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("failed to parse certificates: {e}"))?;
    if certs.is_empty() {
        return Err("no certificates found".to_string());
    }
    Ok(certs)
}

/// Parse PEM-encoded private key.
fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, String> {
    PrivateKeyDer::from_pem_slice(pem).map_err(|e| format!("failed to parse private key: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_loads_generated_pair() {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        let cert = write(generated.cert.pem().as_bytes());
        let key = write(generated.key_pair.serialize_pem().as_bytes());

        let material = TlsMaterial::load(cert.path(), key.path()).unwrap();
        assert_eq!(material.ca_pem(), generated.cert.pem().as_bytes());
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = TlsMaterial::load(
            Path::new("/nonexistent/cert.pem"),
            Path::new("/nonexistent/key.pem"),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("/nonexistent/cert.pem"));
    }

    #[test]
    fn test_garbage_certificate_rejected() {
        let cert = write(b"not a certificate");
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        let key = write(generated.key_pair.serialize_pem().as_bytes());

        let err = TlsMaterial::load(cert.path(), key.path()).err().unwrap();
        assert!(matches!(err, ServerError::Tls { .. }));
    }
}
