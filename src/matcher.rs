//! Rule evaluation: does a transaction satisfy a target's filter?
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::chain::ChainStore;
use crate::error::ScanError;
use crate::transaction::Transaction;

/// Status value of a successful transaction result.
const STATUS_SUCCESS: &str = "0x1";

/// A target's extraction rule. An empty set leaves its dimension
/// unconstrained; dimensions combine with AND, set members with OR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Accepted sender addresses.
    pub from: BTreeSet<String>,
    /// Accepted recipient addresses.
    pub to: BTreeSet<String>,
    /// Accepted `dataType` values.
    pub datatypes: BTreeSet<String>,
    /// Accepted `data.method` names.
    pub methods: BTreeSet<String>,
    /// Parameter names; any one present in `data.params` is enough.
    pub params: BTreeSet<String>,
    /// Skip the success lookup and keep failed transactions too.
    pub include_failed: bool,
}

impl Filter {
    /// `true` when no dimension is constrained.
    pub fn is_unconstrained(&self) -> bool {
        self.from.is_empty()
            && self.to.is_empty()
            && self.datatypes.is_empty()
            && self.methods.is_empty()
            && self.params.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = [
            ("from", &self.from),
            ("to", &self.to),
            ("datatypes", &self.datatypes),
            ("methods", &self.methods),
            ("params", &self.params),
        ];
        if self.is_unconstrained() {
            f.write_str("any")?;
        }
        for (n, (name, set)) in dims.iter().filter(|(_, s)| !s.is_empty()).enumerate() {
            if n > 0 {
                f.write_str("; ")?;
            }
            let items: Vec<&str> = set.iter().map(String::as_str).collect();
            write!(f, "{name}={}", items.join(","))?;
        }
        if self.include_failed {
            f.write_str(" (including failed)")?;
        }
        Ok(())
    }
}

fn member(set: &BTreeSet<String>, field: Option<&str>) -> bool {
    set.is_empty() || field.is_some_and(|v| set.contains(v))
}

/// Evaluate `filter` against `tx`. Short-circuits in the order
/// from, to, datatype, method, param keys.
pub fn matches(tx: &Transaction, filter: &Filter) -> bool {
    member(&filter.from, tx.from.as_deref())
        && member(&filter.to, tx.to.as_deref())
        && member(&filter.datatypes, tx.datatype.as_deref())
        && member(&filter.methods, tx.method.as_deref())
        && (filter.params.is_empty() || tx.param_keys().any(|k| filter.params.contains(k)))
}

/// Look up the transaction's result and report whether `result.status`
/// is `0x1`.
pub fn was_successful<C: ChainStore + ?Sized>(
    tx: &Transaction,
    chain: &C,
) -> Result<bool, ScanError> {
    let txhash = tx.txhash.as_deref().ok_or(ScanError::MissingResult)?;
    let raw = chain.transaction_result(txhash)?;

    let malformed = |reason: String| ScanError::MalformedResult {
        txhash: txhash.to_string(),
        reason,
    };
    let record: Value =
        serde_json::from_slice(&raw).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    let status = record
        .get("result")
        .and_then(|r| r.get("status"))
        .ok_or_else(|| malformed("missing `result.status`".into()))?;

    Ok(status.as_str() == Some(STATUS_SUCCESS))
}

/// [`was_successful`], with the recoverable failures folded into "not
/// successful": a missing hash or a missing result record is logged and
/// the transaction is dropped. Other errors propagate.
pub fn confirmed_successful<C: ChainStore + ?Sized>(
    tx: &Transaction,
    chain: &C,
) -> Result<bool, ScanError> {
    match was_successful(tx, chain) {
        Ok(ok) => Ok(ok),
        Err(e @ (ScanError::MissingResult | ScanError::NotFound(_))) => {
            warn!(
                block = ?tx.blockheight,
                txhash = ?tx.txhash,
                error = %e,
                "success check failed; treating transaction as not successful"
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MemoryKv, NodeLedger};
    use serde_json::json;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn tx(raw: Value) -> Transaction {
        Transaction::decode(&raw, Some(1), Some(0)).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = Filter::default();
        assert!(f.is_unconstrained());
        assert!(matches(&tx(json!({})), &f));
        assert!(matches(&tx(json!({"version": "0x3", "from": "hxZ"})), &f));
    }

    #[test]
    fn membership_is_exact_not_substring() {
        let f = Filter {
            from: set(&["hxA"]),
            ..Default::default()
        };
        assert!(matches(&tx(json!({"from": "hxA"})), &f));
        assert!(!matches(&tx(json!({"from": "hxAB"})), &f));
        assert!(!matches(&tx(json!({"from": "hx"})), &f));
        assert!(!matches(&tx(json!({"to": "hxA"})), &f));

        let numeric = Filter {
            from: set(&["5"]),
            ..Default::default()
        };
        assert!(!matches(&tx(json!({"from": 5})), &numeric));
    }

    #[test]
    fn dimensions_are_conjunctive() {
        let f = Filter {
            from: set(&["hxA", "hxB"]),
            methods: set(&["transfer"]),
            ..Default::default()
        };
        let hit = json!({"from": "hxB", "data": {"method": "transfer"}});
        let wrong_method = json!({"from": "hxB", "data": {"method": "vote"}});
        assert!(matches(&tx(hit), &f));
        assert!(!matches(&tx(wrong_method), &f));
    }

    #[test]
    fn datatype_only_exists_on_v3() {
        let f = Filter {
            datatypes: set(&["call"]),
            ..Default::default()
        };
        assert!(matches(&tx(json!({"version": "0x3", "dataType": "call"})), &f));
        assert!(!matches(&tx(json!({"dataType": "call"})), &f));
    }

    #[test]
    fn any_param_key_matches() {
        let f = Filter {
            params: set(&["_value", "_to"]),
            ..Default::default()
        };
        let call = json!({"version": "0x3", "data": {"method": "m", "params": {"_to": "hxC", "x": 1}}});
        let other = json!({"version": "0x3", "data": {"method": "m", "params": {"x": 1}}});
        let list_params = json!({"version": "0x3", "data": {"params": ["_to"]}});
        let message = json!({"version": "0x3", "data": "hello"});
        assert!(matches(&tx(call), &f));
        assert!(!matches(&tx(other), &f));
        assert!(!matches(&tx(list_params), &f));
        assert!(!matches(&tx(message), &f));
    }

    #[test]
    fn success_reads_nested_status() {
        let mut kv = MemoryKv::new();
        kv.put_tx_result("0xok", &json!({"result": {"status": "0x1"}}));
        kv.put_tx_result("0xfail", &json!({"result": {"status": "0x0"}}));
        kv.put_tx_result("0xbroken", &json!({"result": {}}));
        let ledger = NodeLedger::new(kv);

        let ok = tx(json!({"version": "0x3", "txHash": "0xok"}));
        let fail = tx(json!({"version": "0x3", "txHash": "0xfail"}));
        let broken = tx(json!({"version": "0x3", "txHash": "0xbroken"}));
        assert!(was_successful(&ok, &ledger).unwrap());
        assert!(!was_successful(&fail, &ledger).unwrap());
        assert!(matches!(
            was_successful(&broken, &ledger),
            Err(ScanError::MalformedResult { .. })
        ));
    }

    #[test]
    fn missing_hash_is_never_assumed_successful() {
        let ledger = NodeLedger::new(MemoryKv::new());
        let no_hash = tx(json!({"from": "hxA"}));
        assert!(matches!(
            was_successful(&no_hash, &ledger),
            Err(ScanError::MissingResult)
        ));
        assert!(!confirmed_successful(&no_hash, &ledger).unwrap());

        let unknown = tx(json!({"tx_hash": "nope"}));
        assert!(!confirmed_successful(&unknown, &ledger).unwrap());
    }

    #[test]
    fn display_lists_constrained_dimensions() {
        let f = Filter {
            from: set(&["hxA"]),
            methods: set(&["transfer"]),
            include_failed: true,
            ..Default::default()
        };
        assert_eq!(f.to_string(), "from=hxA; methods=transfer (including failed)");
        assert_eq!(Filter::default().to_string(), "any");
    }
}
