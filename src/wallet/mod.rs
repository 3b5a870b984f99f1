use log::debug;
use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use serde_json::Value;

use crate::blockchain::{Block, STARTING_BALANCE};
use crate::crypto::signing_digest;
use crate::error::WalletError;
use crate::transaction::Transaction;

/// A secp256k1 key pair. The address is the hex of the compressed public key.
/// Balance is never stored; it is recomputed from the chain.
#[derive(Debug, Clone)]
pub struct Wallet {
    secret_key: SecretKey,
    address: String,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    pub fn new() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self::from_parts(secret_key, public_key)
    }

    /// Restore a wallet from a hex-encoded 32-byte secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, WalletError> {
        let bytes = hex::decode(secret_hex.trim()).map_err(|_| WalletError::InvalidKey)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| WalletError::InvalidKey)?;
        let public_key = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret_key);
        Ok(Self::from_parts(secret_key, public_key))
    }

    fn from_parts(secret_key: SecretKey, public_key: PublicKey) -> Self {
        Self {
            secret_key,
            address: hex::encode(public_key.serialize()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Hex DER ECDSA signature over the canonical digest of `data`.
    pub fn sign(&self, data: &Value) -> String {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest(signing_digest(data));
        hex::encode(secp.sign_ecdsa(&msg, &self.secret_key).serialize_der())
    }

    /// Build and sign a transfer, checking `amount` against the balance
    /// this wallet holds on `chain`.
    pub fn create_transaction(
        &self,
        recipient: &str,
        amount: u64,
        chain: &[Block],
    ) -> Result<Transaction, WalletError> {
        let balance = Self::calculate_balance(chain, &self.address);
        if amount > balance {
            return Err(WalletError::InsufficientFunds { amount, balance });
        }
        Transaction::new(self, balance, recipient, amount)
    }

    /// Balance of `address` on `chain`.
    ///
    /// Scans oldest to newest. A block in which the address authored a
    /// transaction resets the running total to that transaction's change
    /// entry plus whatever the other transactions of that block credit;
    /// later blocks then add their credits on top. Without any spend the
    /// result is [`STARTING_BALANCE`] plus every credit.
    pub fn calculate_balance(chain: &[Block], address: &str) -> u64 {
        let mut has_conducted = false;
        let mut outputs_total: u64 = 0;

        for block in chain {
            let Some(txs) = block.data.transactions() else {
                continue;
            };
            let credit = |tx: &Transaction| tx.output_map.get(address).copied().unwrap_or(0);

            match txs.iter().rev().find(|tx| tx.input.address() == Some(address)) {
                Some(spend) => {
                    has_conducted = true;
                    outputs_total = txs
                        .iter()
                        .filter(|tx| tx.input.address() != Some(address))
                        .fold(credit(spend), |acc, tx| acc.saturating_add(credit(tx)));
                }
                None => {
                    outputs_total = txs
                        .iter()
                        .fold(outputs_total, |acc, tx| acc.saturating_add(credit(tx)));
                }
            }
        }

        if has_conducted {
            outputs_total
        } else {
            STARTING_BALANCE.saturating_add(outputs_total)
        }
    }
}

/// Fresh secp256k1 key pair as `(secret_hex, address)`.
pub fn generate_keypair_hex() -> (String, String) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    (hex::encode(sk.secret_bytes()), hex::encode(pk.serialize()))
}

/// Verify a hex DER signature by the hex-encoded public key over `data`.
/// Malformed keys or signatures count as a failed verification.
pub fn verify_signature(public_key_hex: &str, data: &Value, signature_hex: &str) -> bool {
    let secp = Secp256k1::verification_only();

    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        debug!("signature is not hex");
        return false;
    };
    let Ok(sig) = Signature::from_der(&sig_bytes) else {
        debug!("signature is not valid DER");
        return false;
    };
    let Ok(pk) = hex::decode(public_key_hex)
        .map_err(|_| ())
        .and_then(|bytes| PublicKey::from_slice(&bytes).map_err(|_| ()))
    else {
        debug!("public key {public_key_hex} is malformed");
        return false;
    };

    let msg = Message::from_digest(signing_digest(data));
    secp.verify_ecdsa(&msg, &sig, &pk).is_ok()
}
