//! Extraction targets: a filter, a progress cursor, and an output layout.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::matcher::Filter;

/// Output fields a target may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    /// Block height.
    Block,
    /// Sender address.
    From,
    /// Recipient address.
    To,
    /// Transferred amount.
    Value,
    /// Payload type (v3 only).
    Datatype,
    /// Raw payload (v3 only).
    Data,
    /// Transaction hash.
    Txhash,
    /// Block timestamp.
    Blocktimestamp,
}

impl Column {
    /// Every column, in default output order.
    pub const ALL: [Column; 8] = [
        Column::Block,
        Column::From,
        Column::To,
        Column::Value,
        Column::Datatype,
        Column::Data,
        Column::Txhash,
        Column::Blocktimestamp,
    ];

    /// Lowercase name, as used in configuration and headers.
    pub fn name(self) -> &'static str {
        match self {
            Column::Block => "block",
            Column::From => "from",
            Column::To => "to",
            Column::Value => "value",
            Column::Datatype => "datatype",
            Column::Data => "data",
            Column::Txhash => "txhash",
            Column::Blocktimestamp => "blocktimestamp",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown column `{s}`"))
    }
}

/// One projected transaction, ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Selected columns in output order.
    pub fields: Vec<(Column, Value)>,
}

impl Row {
    /// Value of `column`, if it was projected.
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }
}

/// An independently configured consumer of the transaction stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Unique name, usually the output file.
    pub name: String,
    /// Rule transactions must satisfy.
    pub filter: Filter,
    /// Last fully processed block height.
    pub cursor: u64,
    /// Fields emitted per row, in order.
    pub columns: Vec<Column>,
    /// Rows emitted over the target's lifetime.
    #[serde(default)]
    pub matched: u64,
}

impl Target {
    /// Fresh target that has processed nothing. Empty `columns` selects all.
    pub fn new(name: impl Into<String>, filter: Filter, columns: Vec<Column>) -> Self {
        let columns = if columns.is_empty() {
            Column::ALL.to_vec()
        } else {
            columns
        };
        Self {
            name: name.into(),
            filter,
            cursor: 0,
            columns,
            matched: 0,
        }
    }
}

/// Summary line for one stored target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetStatus {
    /// Target name.
    pub name: String,
    /// Last fully processed block height.
    pub cursor: u64,
    /// Rows emitted over the target's lifetime.
    pub matched: u64,
    /// The target's rule.
    pub filter: Filter,
}

impl From<&Target> for TargetStatus {
    fn from(t: &Target) -> Self {
        Self {
            name: t.name.clone(),
            cursor: t.cursor,
            matched: t.matched,
            filter: t.filter.clone(),
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  last block:       {}", self.cursor)?;
        writeln!(f, "  transactions:     {}", self.matched)?;
        write!(f, "  rules:            {}", self.filter)
    }
}
