//! Certificate fixtures generated at test time.

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509Builder, X509NameBuilder, X509};

pub struct TestIdentity {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl TestIdentity {
    pub fn pkcs12(&self, password: &str) -> Vec<u8> {
        Pkcs12::builder()
            .name("walletpass test")
            .pkey(&self.key)
            .cert(&self.cert)
            .build2(password)
            .unwrap()
            .to_der()
            .unwrap()
    }
}

pub fn generate_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn build_cert(
    common_name: &str,
    key: &PKey<Private>,
    issuer: Option<&TestIdentity>,
    ca: bool,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(rand_serial()).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.cert.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    if ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
    }
    let signing_key = issuer.map_or(key, |i| &i.key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();
    builder.build()
}

fn rand_serial() -> u32 {
    let mut buf = [0u8; 4];
    openssl::rand::rand_bytes(&mut buf).unwrap();
    u32::from_be_bytes(buf) >> 1
}

/// A self-signed leaf identity.
pub fn self_signed(common_name: &str) -> TestIdentity {
    let key = generate_key();
    let cert = build_cert(common_name, &key, None, false);
    TestIdentity { cert, key }
}

/// An intermediate CA and a signer certificate it issued.
pub fn issued_chain() -> (TestIdentity, TestIdentity) {
    let ca_key = generate_key();
    let ca = TestIdentity {
        cert: build_cert("Test WWDR Intermediate", &ca_key, None, true),
        key: ca_key,
    };
    let signer_key = generate_key();
    let signer = TestIdentity {
        cert: build_cert("Pass Type ID: pass.com.example.card", &signer_key, Some(&ca), false),
        key: signer_key,
    };
    (ca, signer)
}
