//! Public key extraction from PEM-encoded X.509 certificates
//!
//! The identity provider publishes its signing keys as self-signed
//! certificates. Verification only needs the SubjectPublicKeyInfo, so the
//! certificate is walked just far enough to slice it out:
//!
//! ```text
//! Certificate ::= SEQUENCE {
//!     tbsCertificate       SEQUENCE {
//!         version          [0] EXPLICIT (optional)
//!         serialNumber     INTEGER
//!         signature        SEQUENCE
//!         issuer           SEQUENCE
//!         validity         SEQUENCE
//!         subject          SEQUENCE
//!         subjectPublicKeyInfo SEQUENCE   <-- returned
//!         ...
//!     }
//!     ...
//! }
//! ```

use crate::error::{Error, Result};
use crate::limits::MAX_CERTIFICATE_PEM_SIZE;
use crate::utils::der::{
    DerReader, TAG_BIT_STRING, TAG_CONTEXT_0, TAG_INTEGER, TAG_OBJECT_IDENTIFIER, TAG_SEQUENCE,
};
use base64::{Engine, engine::general_purpose::STANDARD};

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// rsaEncryption OID 1.2.840.113549.1.1.1 (content octets only)
const RSA_ENCRYPTION_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];

fn cert_error(details: impl std::fmt::Display) -> Error {
    Error::CertificateParse(format!("certificate: {details}"))
}

/// Extract the DER SubjectPublicKeyInfo of an RSA certificate given as PEM
///
/// The returned bytes span the SPKI tag, length and content, ready to be
/// used as an RSA verification key.
pub fn extract_spki(pem: &str) -> Result<Vec<u8>> {
    if pem.len() > MAX_CERTIFICATE_PEM_SIZE {
        return Err(Error::CertificateTooLarge {
            size: pem.len(),
            max: MAX_CERTIFICATE_PEM_SIZE,
        });
    }

    let der = pem_to_der(pem)?;
    let spki = spki_from_der(&der)?;
    ensure_rsa_key(spki)?;

    Ok(spki.to_vec())
}

/// Strip the PEM armor and decode the base64 body
pub(crate) fn pem_to_der(pem: &str) -> Result<Vec<u8>> {
    let start = pem
        .find(PEM_BEGIN)
        .ok_or_else(|| cert_error("missing PEM header"))?
        + PEM_BEGIN.len();
    let end = pem[start..]
        .find(PEM_END)
        .ok_or_else(|| cert_error("missing PEM footer"))?
        + start;

    let body: String = pem[start..end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if body.is_empty() {
        return Err(cert_error("empty PEM body"));
    }

    STANDARD
        .decode(body)
        .map_err(|e| cert_error(format!("base64 decode failed: {e}")))
}

/// Slice the SubjectPublicKeyInfo out of a DER certificate
pub(crate) fn spki_from_der(der: &[u8]) -> Result<&[u8]> {
    let certificate = DerReader::new(der).expect(TAG_SEQUENCE, "certificate")?;
    let tbs = DerReader::new(certificate.content).expect(TAG_SEQUENCE, "tbsCertificate")?;

    let mut fields = DerReader::new(tbs.content);
    if fields.peek_tag() == Some(TAG_CONTEXT_0) {
        fields.read_tlv()?;
    }

    fields.expect(TAG_INTEGER, "serialNumber")?;
    fields.expect(TAG_SEQUENCE, "signature algorithm")?;
    fields.expect(TAG_SEQUENCE, "issuer")?;
    fields.expect(TAG_SEQUENCE, "validity")?;
    fields.expect(TAG_SEQUENCE, "subject")?;

    let spki = fields.expect(TAG_SEQUENCE, "subjectPublicKeyInfo")?;
    Ok(spki.raw)
}

/// Require the SPKI to carry an rsaEncryption key in a BIT STRING
fn ensure_rsa_key(spki: &[u8]) -> Result<()> {
    let info = DerReader::new(spki).expect(TAG_SEQUENCE, "subjectPublicKeyInfo")?;
    let mut parts = DerReader::new(info.content);

    let algorithm = parts.expect(TAG_SEQUENCE, "algorithm identifier")?;
    let oid = DerReader::new(algorithm.content).expect(TAG_OBJECT_IDENTIFIER, "algorithm")?;
    if oid.content != RSA_ENCRYPTION_OID {
        return Err(cert_error("public key is not an RSA key"));
    }

    let key = parts.expect(TAG_BIT_STRING, "subjectPublicKey")?;
    if key.content.len() < 2 {
        return Err(cert_error("empty subjectPublicKey"));
    }
    if !parts.is_empty() {
        return Err(cert_error("trailing data after subjectPublicKey"));
    }

    Ok(())
}
