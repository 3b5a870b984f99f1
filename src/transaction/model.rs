use std::collections::BTreeMap;

use chrono::Utc;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::blockchain::MINING_REWARD;
use crate::error::{TransactionError, WalletError};
use crate::wallet::{Wallet, verify_signature};

/// Who pays for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TxInput {
    /// Signed spend; `amount` is the payer's balance at signing time.
    Ordinary {
        timestamp: i64,
        amount: u64,
        address: String,
        signature: String,
    },
    /// Newly issued funds for the miner; nothing to verify.
    Reward { timestamp: i64 },
}

impl TxInput {
    pub fn address(&self) -> Option<&str> {
        match self {
            TxInput::Ordinary { address, .. } => Some(address),
            TxInput::Reward { .. } => None,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            TxInput::Ordinary { timestamp, .. } | TxInput::Reward { timestamp } => *timestamp,
        }
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, TxInput::Reward { .. })
    }
}

/// A signed value transfer. The output map holds one entry per payee plus
/// the payer's change, and always sums to the input amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub output_map: BTreeMap<String, u64>,
    pub input: TxInput,
}

impl Transaction {
    /// Spend `amount` of `balance` from `sender` to `recipient`.
    pub fn new(
        sender: &Wallet,
        balance: u64,
        recipient: &str,
        amount: u64,
    ) -> Result<Self, WalletError> {
        let change = balance
            .checked_sub(amount)
            .ok_or(WalletError::InsufficientFunds { amount, balance })?;

        let mut output_map = BTreeMap::new();
        output_map.insert(recipient.to_string(), amount);
        *output_map.entry(sender.address().to_string()).or_insert(0) += change;

        let input = Self::create_input(sender, balance, &output_map);
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input,
        })
    }

    /// Reward paying [`MINING_REWARD`] to the miner.
    pub fn reward(miner_address: &str) -> Self {
        let mut output_map = BTreeMap::new();
        output_map.insert(miner_address.to_string(), MINING_REWARD);
        Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input: TxInput::Reward {
                timestamp: Utc::now().timestamp_millis(),
            },
        }
    }

    /// Add `amount` for `recipient` to a pending transaction authored by
    /// `sender`, paid out of the sender's change, and sign again.
    pub fn update(
        &mut self,
        sender: &Wallet,
        recipient: &str,
        amount: u64,
    ) -> Result<(), WalletError> {
        let change = self.output_map.get(sender.address()).copied().unwrap_or(0);
        if amount > change {
            return Err(WalletError::InsufficientFunds {
                amount,
                balance: change,
            });
        }

        *self.output_map.entry(recipient.to_string()).or_insert(0) += amount;
        if let Some(own) = self.output_map.get_mut(sender.address()) {
            *own -= amount;
        }

        let balance = match &self.input {
            TxInput::Ordinary { amount, .. } => *amount,
            TxInput::Reward { .. } => change,
        };
        self.input = Self::create_input(sender, balance, &self.output_map);
        Ok(())
    }

    fn create_input(sender: &Wallet, balance: u64, output_map: &BTreeMap<String, u64>) -> TxInput {
        TxInput::Ordinary {
            timestamp: Utc::now().timestamp_millis(),
            amount: balance,
            address: sender.address().to_string(),
            signature: sender.sign(&json!(output_map)),
        }
    }

    pub fn output_total(&self) -> u128 {
        self.output_map.values().map(|v| *v as u128).sum()
    }

    /// Standalone checks: output sum and signature for ordinary spends,
    /// the fixed amount for rewards. Needs no chain context.
    pub fn validate(&self) -> Result<(), TransactionError> {
        match &self.input {
            TxInput::Reward { .. } => {
                let mut values = self.output_map.values();
                match (values.next(), values.next()) {
                    (Some(&MINING_REWARD), None) => Ok(()),
                    _ => Err(TransactionError::InvalidReward {
                        id: self.id.clone(),
                        expected: MINING_REWARD,
                    }),
                }
            }
            TxInput::Ordinary {
                amount,
                address,
                signature,
                ..
            } => {
                let outputs = self.output_total();
                if outputs != *amount as u128 {
                    return Err(TransactionError::OutputSumMismatch {
                        id: self.id.clone(),
                        input: *amount,
                        outputs,
                    });
                }
                if !verify_signature(address, &json!(self.output_map), signature) {
                    return Err(TransactionError::InvalidSignature {
                        id: self.id.clone(),
                        address: address.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                error!("invalid transaction: {e}");
                false
            }
        }
    }
}
