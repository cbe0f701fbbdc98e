//! PEM encoding for certificates published in a JWKS `x5c` chain.
//!
//! An `x5c` entry is the standard (not URL-safe) base64 of a DER certificate
//! with no line breaks. PEM wants the same body wrapped at 64 columns between
//! armor lines, which is what `jsonwebtoken::DecodingKey::from_rsa_pem` reads.

/// PEM armor line opening a certificate.
pub const CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// PEM armor line closing a certificate.
pub const CERTIFICATE_FOOTER: &str = "-----END CERTIFICATE-----";

/// Line width of a PEM body (RFC 7468).
pub const PEM_LINE_WIDTH: usize = 64;

/// Wrap a base64 DER certificate as PEM text.
///
/// Whitespace inside `x5c_entry` is dropped before wrapping. The output ends
/// with a newline, matching `openssl x509 -outform PEM`.
#[must_use]
pub fn certificate_to_pem(x5c_entry: &str) -> String {
    let body: Vec<char> = x5c_entry.chars().filter(|c| !c.is_whitespace()).collect();

    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);
    pem.push_str(CERTIFICATE_HEADER);
    pem.push('\n');
    for line in body.chunks(PEM_LINE_WIDTH) {
        pem.extend(line.iter());
        pem.push('\n');
    }
    pem.push_str(CERTIFICATE_FOOTER);
    pem.push('\n');
    pem
}
