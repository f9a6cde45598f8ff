//! Version-aware block decoding.
//!
//! The node changed its block record format over time. Which format a record
//! uses depends only on its height, so decoding is a pure function of
//! `(height, bytes)`.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScanError;
use crate::transaction::Transaction;

/// One transaction record exactly as the node stored it.
pub type RawTransaction = Value;

/// Block record formats, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockVersion {
    /// `0.1a`: `confirmed_transaction_list` + integer `time_stamp`.
    V0_1a,
    /// `0.3`: `transactions` + hex `timestamp`.
    V0_3,
    /// `0.4`: same fields as `0.3`.
    V0_4,
    /// `0.5`: same fields as `0.3`.
    V0_5,
}

impl BlockVersion {
    fn uses_legacy_fields(self) -> bool {
        self < BlockVersion::V0_3
    }
}

/// Minimum height at which each block format takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionThresholds {
    /// First height of format `0.1a`.
    pub v0_1a: u64,
    /// First height of format `0.3`, where the field names change.
    pub v0_3: u64,
    /// First height of format `0.4`.
    pub v0_4: u64,
    /// First height of format `0.5`.
    pub v0_5: u64,
}

impl Default for VersionThresholds {
    fn default() -> Self {
        Self {
            v0_1a: 0,
            v0_3: 10_324_749,
            v0_4: 12_640_761,
            v0_5: 14_473_622,
        }
    }
}

impl VersionThresholds {
    /// Format in effect at `height`: the highest threshold `<= height` wins.
    /// Heights below every threshold fall back to the oldest format.
    pub fn version_at(&self, height: u64) -> BlockVersion {
        [
            (self.v0_5, BlockVersion::V0_5),
            (self.v0_4, BlockVersion::V0_4),
            (self.v0_3, BlockVersion::V0_3),
            (self.v0_1a, BlockVersion::V0_1a),
        ]
        .into_iter()
        .find(|(min, _)| height >= *min)
        .map(|(_, v)| v)
        .unwrap_or(BlockVersion::V0_1a)
    }

    /// `true` if thresholds never decrease from one format to the next.
    pub fn is_ascending(&self) -> bool {
        self.v0_1a <= self.v0_3 && self.v0_3 <= self.v0_4 && self.v0_4 <= self.v0_5
    }
}

/// A decoded block. Transactions keep their on-chain order.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Height the record was read at.
    pub height: u64,
    /// Format the record was decoded with.
    pub version: BlockVersion,
    /// Epoch microseconds.
    pub timestamp: i64,
    /// Raw transaction records, decoded lazily.
    pub transactions: Vec<RawTransaction>,
}

impl Block {
    /// Decode every transaction in order, tagged with this block's context.
    ///
    /// Stops at the first transaction with an unknown version.
    pub fn decode_transactions(&self) -> Result<Vec<Transaction>, ScanError> {
        self.transactions
            .iter()
            .map(|raw| Transaction::decode(raw, Some(self.height), Some(self.timestamp)))
            .collect()
    }
}

/// Stateless decoder holding the format thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockDecoder {
    thresholds: VersionThresholds,
}

impl BlockDecoder {
    /// Decoder for the given format thresholds.
    pub fn new(thresholds: VersionThresholds) -> Self {
        Self { thresholds }
    }

    /// Decode the raw record found at `height`.
    pub fn decode(&self, height: u64, raw: &[u8]) -> Result<Block, ScanError> {
        let malformed = |reason: String| ScanError::MalformedBlock { height, reason };

        let mut record: Value =
            serde_json::from_slice(raw).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
        let version = self.thresholds.version_at(height);

        let (tx_field, ts_field) = if version.uses_legacy_fields() {
            ("confirmed_transaction_list", "time_stamp")
        } else {
            ("transactions", "timestamp")
        };

        let timestamp = match record.get(ts_field) {
            None => return Err(malformed(format!("missing `{ts_field}`"))),
            Some(ts) if version.uses_legacy_fields() => ts
                .as_i64()
                .ok_or_else(|| malformed(format!("`{ts_field}` is not an integer: {ts}")))?,
            Some(ts) => parse_hex_timestamp(ts)
                .ok_or_else(|| malformed(format!("`{ts_field}` is not a hex integer: {ts}")))?,
        };

        let transactions = match record.get_mut(tx_field).map(Value::take) {
            Some(Value::Array(txs)) => txs,
            Some(other) => {
                return Err(malformed(format!("`{tx_field}` is not a list: {other}")))
            }
            None => return Err(malformed(format!("missing `{tx_field}`"))),
        };

        Ok(Block {
            height,
            version,
            timestamp,
            transactions,
        })
    }
}

/// Base-16 with an optional `0x` prefix.
fn parse_hex_timestamp(v: &Value) -> Option<i64> {
    let s = v.as_str()?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    i64::from_str_radix(digits, 16).ok()
}
