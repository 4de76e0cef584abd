pub mod cms;
pub mod credentials;

#[cfg(test)]
pub(crate) mod testing;

pub use cms::{sign, verify_detached, SIGNATURE_FILE};
pub use credentials::{
    detect_encoding, extract_from_pkcs12, load_intermediate, normalize_certificate,
    require_pem_key, CanonicalCertificate, CanonicalPrivateKey, Encoding,
    IntermediateCertificate, ResolvedCredential, SigningCredential,
};
