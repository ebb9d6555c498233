//! TLS for the printer's own LAN broker.
//!
//! Printers serve MQTT on 8883 with a self-signed certificate that names no
//! address, so LAN connections skip certificate and host name checks. The
//! handshake signatures are still verified against the presented key.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

/// Accepts whatever certificate the printer presents.
#[derive(Debug)]
struct AnyPrinterCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AnyPrinterCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Client config for a printer's self-signed LAN broker.
pub(crate) fn lan_client_config() -> Arc<ClientConfig> {
    let verifier = AnyPrinterCert {
        algorithms: rustls::crypto::ring::default_provider().signature_verification_algorithms,
    };
    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Arc::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_certificate_accepted() {
        let verifier = AnyPrinterCert {
            algorithms: rustls::crypto::ring::default_provider().signature_verification_algorithms,
        };
        let cert = CertificateDer::from(include_bytes!("../testdata/printer-cert.der").to_vec());
        let name = ServerName::try_from("192.168.1.40").unwrap();
        assert!(verifier
            .verify_server_cert(&cert, &[], &name, &[], UnixTime::now())
            .is_ok());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }
}
