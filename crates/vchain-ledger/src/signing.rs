use ed25519_dalek::{Signer, Verifier};
use vchain_types::AccountId;

use crate::error::{LedgerError, LedgerResult};
use crate::records::{SignedTransaction, TransactionEnvelope};

/// Ed25519 key that controls a ledger account.
///
/// The account id is the base58 encoding of the public key.
pub struct SigningCredential(ed25519_dalek::SigningKey);

impl SigningCredential {
    /// Generate a new random credential.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Create from a hex-encoded 32-byte secret.
    pub fn from_hex(secret: &str) -> LedgerResult<Self> {
        let bytes = hex::decode(secret.trim())
            .map_err(|e| LedgerError::InvalidKey(format!("secret is not hex: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            LedgerError::InvalidKey(format!("secret must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// The account this credential signs for.
    pub fn account_id(&self) -> AccountId {
        account_id_for_key(&self.0.verifying_key().to_bytes())
    }

    /// Raw secret key bytes.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }

    /// Sign an envelope.
    pub fn sign_envelope(&self, envelope: TransactionEnvelope) -> LedgerResult<SignedTransaction> {
        let signature = self.sign(&envelope.signing_bytes()?).to_vec();
        Ok(SignedTransaction {
            envelope,
            signature,
        })
    }
}

impl std::fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningCredential({}, <redacted>)", self.account_id())
    }
}

/// Account id of a raw ed25519 public key.
pub fn account_id_for_key(public_key: &[u8; 32]) -> AccountId {
    AccountId::from_trusted(bs58::encode(public_key).into_string())
}

/// Check `signature` over `message` against the key behind `account`.
pub fn verify_signature(account: &AccountId, message: &[u8], signature: &[u8]) -> LedgerResult<()> {
    let key_bytes: [u8; 32] = bs58::decode(account.as_str())
        .into_vec()
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| LedgerError::InvalidKey(format!("{account} is not an ed25519 public key")))?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| LedgerError::InvalidKey(e.to_string()))?;
    let signature: [u8; 64] = signature.try_into().map_err(|_| LedgerError::BadSignature)?;
    key.verify(message, &ed25519_dalek::Signature::from_bytes(&signature))
        .map_err(|_| LedgerError::BadSignature)
}

/// Verify a signed transaction against its own source account.
pub fn verify_transaction(tx: &SignedTransaction) -> LedgerResult<()> {
    verify_signature(
        &tx.envelope.source_account,
        &tx.envelope.signing_bytes()?,
        &tx.signature,
    )
}
