//! Certificate inspection: pull the not-after timestamp out of a PEM certificate.

use chrono::{DateTime, Utc};
use rustls_pemfile::certs;
use std::io::Cursor;
use x509_parser::prelude::{FromDer, X509Certificate};

#[derive(Debug, thiserror::Error)]
pub enum CertError {
    #[error("invalid certificate PEM: {0}")]
    Pem(#[from] std::io::Error),
    #[error("no certificate found in PEM input")]
    Missing,
    #[error("failed to parse certificate: {0}")]
    Parse(String),
    #[error("invalid certificate expiry timestamp")]
    Timestamp,
}

/// Return the not-after timestamp of the first certificate in `pem`, in UTC
///
/// # Errors
///
/// Returns an error if the input holds no PEM certificate or the certificate
/// cannot be parsed
pub fn expiry(pem: &str) -> Result<DateTime<Utc>, CertError> {
    let mut reader = Cursor::new(pem.as_bytes());
    let cert_der = certs(&mut reader).next().ok_or(CertError::Missing)??;

    let (_, cert) =
        X509Certificate::from_der(cert_der.as_ref()).map_err(|e| CertError::Parse(e.to_string()))?;

    let raw = cert.validity().not_after.to_datetime();
    DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
        .ok_or(CertError::Timestamp)
}
