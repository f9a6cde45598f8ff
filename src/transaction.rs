//! Normalized transactions.
use serde_json::Value;

use crate::error::ScanError;
use crate::target::{Column, Row};

/// Transaction record versions the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxVersion {
    /// `0x1`, or no `version` field at all.
    V1,
    /// `0x3`: adds `dataType`/`data` and renames the hash to `txHash`.
    V3,
}

impl TxVersion {
    /// Version used when the record has no `version` field.
    pub const DEFAULT_TAG: &'static str = "0x1";

    /// Parse the raw `version` tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "0x1" => Some(TxVersion::V1),
            "0x3" => Some(TxVersion::V3),
            _ => None,
        }
    }
}

/// Normalized view of one transaction. Every field is optional; an absent
/// field in the raw record is `None`, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Record version the fields were read with.
    pub version: TxVersion,
    /// Sender address.
    pub from: Option<String>,
    /// Recipient address or contract.
    pub to: Option<String>,
    /// Transferred amount, as the hex string the node stores.
    pub value: Option<String>,
    /// `call`, `deploy`, `message`... (v3 only).
    pub datatype: Option<String>,
    /// Raw payload (v3 only).
    pub data: Option<Value>,
    /// `data.method` of a call payload.
    pub method: Option<String>,
    /// `data.params` of a call payload.
    pub params: Option<Value>,
    /// Hash the result record is stored under.
    pub txhash: Option<String>,
    /// Height of the enclosing block.
    pub blockheight: Option<u64>,
    /// Timestamp of the enclosing block.
    pub blocktimestamp: Option<i64>,
}

impl Transaction {
    /// Decode `raw`, reading its version from the `version` field.
    ///
    /// Only an unrecognized version fails. An explicit `null` version is
    /// unrecognized; only a missing field means `0x1`.
    pub fn decode(
        raw: &Value,
        blockheight: Option<u64>,
        blocktimestamp: Option<i64>,
    ) -> Result<Self, ScanError> {
        let version = match raw.get("version") {
            None => TxVersion::V1,
            Some(Value::String(tag)) => {
                TxVersion::from_tag(tag).ok_or_else(|| ScanError::UnsupportedVersion {
                    version: tag.clone(),
                    height: blockheight,
                })?
            }
            Some(other) => {
                return Err(ScanError::UnsupportedVersion {
                    version: other.to_string(),
                    height: blockheight,
                })
            }
        };
        Ok(Self::decode_as(raw, version, blockheight, blocktimestamp))
    }

    /// Decode `raw` with a known version; infallible.
    pub fn decode_as(
        raw: &Value,
        version: TxVersion,
        blockheight: Option<u64>,
        blocktimestamp: Option<i64>,
    ) -> Self {
        let payload = raw.get("data");
        let (datatype, data, hash_field) = match version {
            TxVersion::V1 => (None, None, "tx_hash"),
            TxVersion::V3 => (text(raw.get("dataType")), present(payload), "txHash"),
        };

        Self {
            version,
            from: text(raw.get("from")),
            to: text(raw.get("to")),
            value: text(raw.get("value")),
            datatype,
            data,
            // `get` on a non-object payload (a plain message string) yields None
            method: text(payload.and_then(|d| d.get("method"))),
            params: present(payload.and_then(|d| d.get("params"))),
            txhash: text(raw.get(hash_field)),
            blockheight,
            blocktimestamp,
        }
    }

    /// Parameter names of a structured call payload.
    pub fn param_keys(&self) -> impl Iterator<Item = &str> {
        self.params
            .as_ref()
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }

    /// Value of one output column.
    pub fn column(&self, column: Column) -> Value {
        fn opt_str(s: &Option<String>) -> Value {
            s.as_deref().map_or(Value::Null, Value::from)
        }
        match column {
            Column::Block => self.blockheight.map_or(Value::Null, Value::from),
            Column::From => opt_str(&self.from),
            Column::To => opt_str(&self.to),
            Column::Value => opt_str(&self.value),
            Column::Datatype => opt_str(&self.datatype),
            Column::Data => self.data.clone().unwrap_or(Value::Null),
            Column::Txhash => opt_str(&self.txhash),
            Column::Blocktimestamp => self.blocktimestamp.map_or(Value::Null, Value::from),
        }
    }

    /// Project onto `columns`, in the given order.
    pub fn project(&self, columns: &[Column]) -> Row {
        Row {
            fields: columns.iter().map(|&c| (c, self.column(c))).collect(),
        }
    }
}

fn present(v: Option<&Value>) -> Option<Value> {
    match v {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.clone()),
    }
}

/// String fields only; a number or object where a string belongs is absent.
fn text(v: Option<&Value>) -> Option<String> {
    v?.as_str().map(str::to_owned)
}
