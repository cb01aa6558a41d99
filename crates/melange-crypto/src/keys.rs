//! Key generation and management.
//!
//! An [`Identity`] is the unit being provisioned: an Ed25519 signing key pair, an
//! X25519 encryption key pair, and the address derived from the signing key.

use crate::{constants::*, errors::*, hashing::derive_address};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::{rngs::OsRng, RngCore};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519PrivateKey};
use zeroize::{Zeroize, Zeroizing};

/// Size of the exported secret material (signing seed || encryption secret)
pub const SECRET_MATERIAL_SIZE: usize = 2 * PRIVATE_KEY_SIZE;

/// Ed25519 signing key pair
#[derive(Clone)]
pub struct Ed25519KeyPair {
    private_key: SigningKey,
    public_key: VerifyingKey,
}

impl Ed25519KeyPair {
    /// Build an Ed25519 key pair from a 32-byte seed
    ///
    /// The seed MUST be 32 bytes of high-entropy random data.
    pub fn from_seed(seed: &[u8; PRIVATE_KEY_SIZE]) -> Self {
        let private_key = SigningKey::from_bytes(seed);
        let public_key = private_key.verifying_key();

        Self {
            private_key,
            public_key,
        }
    }

    /// Get the public key bytes
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.to_bytes()
    }

    /// Get a reference to the private key
    ///
    /// # Security
    ///
    /// Never log or persist the returned key unwrapped.
    pub fn private_key(&self) -> &SigningKey {
        &self.private_key
    }

    /// Get a reference to the public key
    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }
}

/// X25519 encryption key pair
#[derive(Clone)]
pub struct X25519KeyPair {
    private_key: X25519PrivateKey,
    public_key: X25519PublicKey,
}

impl X25519KeyPair {
    /// Build an X25519 key pair from a 32-byte secret
    pub fn from_seed(seed: &[u8; PRIVATE_KEY_SIZE]) -> Self {
        let private_key = X25519PrivateKey::from(*seed);
        let public_key = X25519PublicKey::from(&private_key);

        Self {
            private_key,
            public_key,
        }
    }

    /// Generate a fresh X25519 key pair from the OS random source
    pub fn generate() -> Result<Self> {
        let seed = random_seed()?;
        Ok(Self::from_seed(&seed))
    }

    /// Get the public key bytes
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        *self.public_key.as_bytes()
    }

    /// Get a reference to the public key
    pub fn public_key(&self) -> &X25519PublicKey {
        &self.public_key
    }

    /// Perform Diffie-Hellman key agreement
    pub fn diffie_hellman(&self, their_public: &[u8; PUBLIC_KEY_SIZE]) -> Zeroizing<[u8; 32]> {
        let their_public = X25519PublicKey::from(*their_public);
        let shared_secret = self.private_key.diffie_hellman(&their_public);
        Zeroizing::new(*shared_secret.as_bytes())
    }

    fn secret_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.private_key.to_bytes())
    }
}

/// A freshly provisioned cryptographic identity
///
/// Immutable once created. The address is a stable function of the signing
/// public key, see [`derive_address`].
#[derive(Clone)]
pub struct Identity {
    signing_key: Ed25519KeyPair,
    encryption_key: X25519KeyPair,
    address: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Generate a new identity using the OS cryptographically secure RNG
    ///
    /// Every call draws fresh randomness; nothing is derived from caller input.
    pub fn generate() -> Result<Self> {
        let signing_seed = random_seed()?;
        let encryption_seed = random_seed()?;
        Ok(Self::from_seeds(&signing_seed, &encryption_seed))
    }

    /// Rebuild an identity from its two 32-byte secrets
    pub fn from_seeds(
        signing_seed: &[u8; PRIVATE_KEY_SIZE],
        encryption_seed: &[u8; PRIVATE_KEY_SIZE],
    ) -> Self {
        let signing_key = Ed25519KeyPair::from_seed(signing_seed);
        let encryption_key = X25519KeyPair::from_seed(encryption_seed);
        let address = derive_address(&signing_key.public_key_bytes());

        Self {
            signing_key,
            encryption_key,
            address,
        }
    }

    /// Rebuild an identity from material produced by [`Identity::secret_material`]
    pub fn from_secret_material(material: &[u8]) -> Result<Self> {
        if material.len() != SECRET_MATERIAL_SIZE {
            return Err(CryptoError::KeyLength {
                expected: SECRET_MATERIAL_SIZE,
                actual: material.len(),
            });
        }

        let mut signing_seed = [0u8; PRIVATE_KEY_SIZE];
        let mut encryption_seed = [0u8; PRIVATE_KEY_SIZE];
        signing_seed.copy_from_slice(&material[..PRIVATE_KEY_SIZE]);
        encryption_seed.copy_from_slice(&material[PRIVATE_KEY_SIZE..]);

        let identity = Self::from_seeds(&signing_seed, &encryption_seed);
        signing_seed.zeroize();
        encryption_seed.zeroize();
        Ok(identity)
    }

    /// Export both secrets as `signing_seed || encryption_secret`
    ///
    /// # Security
    ///
    /// Only ever hand the result to [`crate::wrap_identity_keys`].
    pub fn secret_material(&self) -> Zeroizing<Vec<u8>> {
        let mut material = Zeroizing::new(Vec::with_capacity(SECRET_MATERIAL_SIZE));
        material.extend_from_slice(&self.signing_key.private_key().to_bytes());
        material.extend_from_slice(self.encryption_key.secret_bytes().as_slice());
        material
    }

    /// Derived address of this identity
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Ed25519 public key bytes
    pub fn signing_public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing_key.public_key_bytes()
    }

    /// X25519 public key bytes
    pub fn encryption_public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.encryption_key.public_key_bytes()
    }

    /// Signing key pair
    pub fn signing_key_pair(&self) -> &Ed25519KeyPair {
        &self.signing_key
    }

    /// Encryption key pair
    pub fn encryption_key_pair(&self) -> &X25519KeyPair {
        &self.encryption_key
    }
}

/// Generate a random nonce for encryption
pub fn generate_nonce() -> Result<[u8; NONCE_SIZE]> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(nonce)
}

fn random_seed() -> Result<[u8; PRIVATE_KEY_SIZE]> {
    let mut seed = [0u8; PRIVATE_KEY_SIZE];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(seed)
}
