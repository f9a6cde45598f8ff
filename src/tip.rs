//! Locate the highest block present in the store.
use tracing::debug;

use crate::chain::ChainStore;
use crate::error::ScanError;

/// Initial probe step.
pub const DEFAULT_PROBE_STEP: u64 = 1_000_000;

/// Highest height with a readable block, found with a shrinking-step probe.
///
/// Starting from `last = 0`, probe `last + step`; on a hit advance `last`
/// and keep the step, on a miss divide the step by ten. When a step of one
/// misses, `last` is the tip. Errors other than `NotFound` propagate.
pub fn find_last_block<C: ChainStore + ?Sized>(
    chain: &C,
    initial_step: u64,
) -> Result<u64, ScanError> {
    let mut step = initial_step.max(1);
    let mut last = 0u64;
    let mut probes = 0u32;

    loop {
        let found = match last.checked_add(step) {
            Some(candidate) => {
                probes += 1;
                match chain.block_by_height(candidate) {
                    Ok(_) => Some(candidate),
                    Err(e) if e.is_not_found() => None,
                    Err(e) => return Err(e),
                }
            }
            None => None,
        };

        match found {
            Some(height) => last = height,
            None if step == 1 => {
                debug!(tip = last, probes, "located chain tip");
                return Ok(last);
            }
            None => step = (step / 10).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Blocks `0..=tip` exist; reads are counted.
    struct Contiguous {
        tip: u64,
        reads: AtomicU32,
    }

    impl Contiguous {
        fn new(tip: u64) -> Self {
            Self {
                tip,
                reads: AtomicU32::new(0),
            }
        }
    }

    impl ChainStore for Contiguous {
        fn block_by_height(&self, height: u64) -> Result<Vec<u8>, ScanError> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            if height <= self.tip {
                Ok(b"{}".to_vec())
            } else {
                Err(ScanError::NotFound(format!("height {height}")))
            }
        }

        fn transaction_result(&self, txhash: &str) -> Result<Vec<u8>, ScanError> {
            Err(ScanError::NotFound(txhash.to_string()))
        }
    }

    #[test]
    fn empty_store_reports_zero() {
        assert_eq!(find_last_block(&Contiguous::new(0), DEFAULT_PROBE_STEP).unwrap(), 0);
    }

    #[test]
    fn exact_step_boundaries() {
        for tip in [1, 9, 10, 999_999, 1_000_000, 1_000_001, 10_324_749, 14_473_622] {
            assert_eq!(
                find_last_block(&Contiguous::new(tip), DEFAULT_PROBE_STEP).unwrap(),
                tip,
                "tip {tip}"
            );
        }
    }

    #[test]
    fn probe_count_is_logarithmic() {
        let store = Contiguous::new(5_432_198);
        assert_eq!(find_last_block(&store, DEFAULT_PROBE_STEP).unwrap(), 5_432_198);
        // at most 10 probes per step size
        assert!(store.reads.load(Ordering::Relaxed) <= 70);
    }

    #[test]
    fn backend_errors_propagate() {
        struct Broken;
        impl ChainStore for Broken {
            fn block_by_height(&self, _: u64) -> Result<Vec<u8>, ScanError> {
                Err(ScanError::Backend("io".into()))
            }
            fn transaction_result(&self, _: &str) -> Result<Vec<u8>, ScanError> {
                Err(ScanError::Backend("io".into()))
            }
        }
        assert!(matches!(
            find_last_block(&Broken, DEFAULT_PROBE_STEP),
            Err(ScanError::Backend(_))
        ));
    }

    proptest! {
        #[test]
        fn finds_exact_tip(tip in 0u64..30_000_000) {
            prop_assert_eq!(find_last_block(&Contiguous::new(tip), DEFAULT_PROBE_STEP).unwrap(), tip);
        }

        #[test]
        fn any_initial_step_converges(tip in 0u64..5_000_000, step in 1u64..10_000_000) {
            prop_assert_eq!(find_last_block(&Contiguous::new(tip), step).unwrap(), tip);
        }
    }
}
