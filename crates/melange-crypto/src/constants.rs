//! Cryptographic constants and domain separation strings.
//!
//! All constants are part of the on-disk and on-wire format. Changing any of them
//! invalidates stored identities and registration signatures.

/// Size of public keys (Ed25519 and X25519) in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of private keys (Ed25519 seed and X25519 secret) in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of Ed25519 signatures in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Size of XChaCha20-Poly1305 nonces in bytes (192 bits)
pub const NONCE_SIZE: usize = 24;

/// Size of XChaCha20-Poly1305 authentication tags in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Number of BLAKE3 bytes kept for an identity address (160 bits)
pub const ADDRESS_SIZE: usize = 20;

/// Number of BLAKE3 bytes kept for an endpoint fingerprint (128 bits)
pub const FINGERPRINT_SIZE: usize = 16;

/// Version byte prefixed to every canonical registration message
pub const MESSAGE_VERSION: u8 = 0x01;

/// Domain separation for identity address derivation
/// Format: BLAKE3("melange:identity:address:v1" || signing_public_key)
pub const DOMAIN_ADDRESS: &str = "melange:identity:address:v1";

/// Domain separation for server registration signatures
pub const DOMAIN_SERVER_REGISTRATION: &str = "melange:server:register:v1";

/// Domain separation for tracker alias registration signatures
pub const DOMAIN_ALIAS_REGISTRATION: &str = "melange:tracker:alias:v1";

/// Domain separation for the key sealing attributes to a server
/// Format: HKDF(X25519(identity, server),
///              "melange:server:seal:v1" || identity_enc_pk || server_enc_pk)
pub const DOMAIN_SERVER_SEAL: &str = "melange:server:seal:v1";

/// AAD prefix for sealed server attributes
pub const DOMAIN_SERVER_SEAL_AAD: &str = "melange:server:attributes:v1";

/// Domain separation for the identity key-wrapping key
/// Format: HKDF(service_master_key, "melange:identity:key-wrap:v1")
pub const DOMAIN_KEY_WRAP: &str = "melange:identity:key-wrap:v1";

/// AAD prefix for wrapped identity key material (followed by the address)
pub const DOMAIN_KEY_WRAP_AAD: &str = "melange:identity:wrapped-keys:v1";

/// Argon2id parameters for local account passwords
pub mod argon2_params {
    /// Memory cost in KiB (64 MiB)
    pub const MEMORY_COST: u32 = 65_536;
    /// Iteration count
    pub const TIME_COST: u32 = 3;
    /// Degree of parallelism
    pub const PARALLELISM: u32 = 1;
    /// Output length in bytes
    pub const OUTPUT_LEN: usize = 32;
    /// Argon2 version
    pub const VERSION: argon2::Version = argon2::Version::V0x13;

    /// Build the parameter set
    pub fn get_params() -> argon2::Params {
        argon2::Params::new(MEMORY_COST, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
            .expect("static argon2 parameters are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_are_distinct() {
        let domains = [
            DOMAIN_ADDRESS,
            DOMAIN_SERVER_REGISTRATION,
            DOMAIN_ALIAS_REGISTRATION,
            DOMAIN_SERVER_SEAL,
            DOMAIN_SERVER_SEAL_AAD,
            DOMAIN_KEY_WRAP,
            DOMAIN_KEY_WRAP_AAD,
        ];
        let unique: std::collections::HashSet<_> = domains.iter().collect();
        assert_eq!(unique.len(), domains.len());
    }

    #[test]
    fn test_argon2_params_are_valid() {
        let params = argon2_params::get_params();
        assert!(params.m_cost() > 0);
        assert!(params.t_cost() > 0);
    }
}
