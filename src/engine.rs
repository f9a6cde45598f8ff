//! Orchestrator for multi-target extraction:
//! 1) load each target's filter and cursor,
//! 2) walk the shared block stream, decoding each height exactly once,
//! 3) fan matching transactions out to the targets that still need them,
//! 4) persist every cursor for the heights actually completed.
use std::fmt;

use anyhow::{bail, Context};
use tracing::{debug, info, warn};

use crate::{
    block::{BlockDecoder, VersionThresholds},
    cancel::CancelSignal,
    chain::ChainStore,
    config::ScanConfig,
    error::ScanError,
    hooks::TxSink,
    matcher::{confirmed_successful, matches},
    progress::{NoProgress, ProgressReporter},
    store::TargetStore,
    target::{Target, TargetStatus},
    tip::{find_last_block, DEFAULT_PROBE_STEP},
};

/// Why a pass stopped.
#[derive(Debug)]
pub enum StopReason {
    /// Every requested height was processed.
    Completed,
    /// The cancellation signal was observed between heights.
    Cancelled,
    /// A block was missing or unreadable: the end of the available chain.
    EndOfChain(ScanError),
    /// A transaction could not be decoded; the decoder needs updating.
    Aborted(ScanError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => f.write_str("completed"),
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::EndOfChain(e) => write!(f, "end of available chain ({e})"),
            StopReason::Aborted(e) => write!(f, "aborted ({e})"),
        }
    }
}

/// Outcome of one `extract` or `update` pass.
#[derive(Debug)]
pub struct ScanReport {
    /// First height the pass attempted.
    pub first: u64,
    /// Last height the pass was asked to reach.
    pub last: u64,
    /// Highest height fully processed, if any.
    pub completed: Option<u64>,
    /// Heights decoded and fully processed.
    pub blocks: u64,
    /// Rows emitted per target during this pass, in load order.
    pub matches: Vec<(String, u64)>,
    /// Why the pass ended.
    pub stop: StopReason,
}

impl ScanReport {
    /// Rows emitted across all targets.
    pub fn total_matches(&self) -> u64 {
        self.matches.iter().map(|(_, n)| n).sum()
    }

    /// `true` when every requested height was processed.
    pub fn is_complete(&self) -> bool {
        matches!(self.stop, StopReason::Completed)
    }
}

/// Extraction engine. `C` = ledger store, `S` = output sink,
/// `T` = target store, `P` = progress reporter.
pub struct SyncManager<C, S, T, P = NoProgress> {
    chain: C,
    sink: S,
    store: T,
    progress: P,
    decoder: BlockDecoder,
    cancel: CancelSignal,
    tip_step: u64,
}

impl<C, S, T> SyncManager<C, S, T, NoProgress>
where
    C: ChainStore,
    S: TxSink,
    T: TargetStore,
{
    /// Engine with default thresholds, no progress output and its own
    /// cancellation signal.
    pub fn new(chain: C, sink: S, store: T) -> Self {
        Self {
            chain,
            sink,
            store,
            progress: NoProgress,
            decoder: BlockDecoder::default(),
            cancel: CancelSignal::new(),
            tip_step: DEFAULT_PROBE_STEP,
        }
    }
}

impl<C, S, T, P> SyncManager<C, S, T, P>
where
    C: ChainStore,
    S: TxSink,
    T: TargetStore,
    P: ProgressReporter,
{
    /// Report progress to `progress` after every height.
    pub fn with_progress<Q: ProgressReporter>(self, progress: Q) -> SyncManager<C, S, T, Q> {
        SyncManager {
            chain: self.chain,
            sink: self.sink,
            store: self.store,
            progress,
            decoder: self.decoder,
            cancel: self.cancel,
            tip_step: self.tip_step,
        }
    }

    /// Poll `cancel` between heights.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Decode blocks with custom format thresholds.
    pub fn with_thresholds(mut self, thresholds: VersionThresholds) -> Self {
        self.decoder = BlockDecoder::new(thresholds);
        self
    }

    /// First step of the chain-tip probe; clamped to at least 1.
    pub fn with_tip_probe_step(mut self, step: u64) -> Self {
        self.tip_step = step.max(1);
        self
    }

    /// Apply the decoding and tip-probe settings of `config`.
    pub fn with_config(self, config: &ScanConfig) -> Self {
        self.with_thresholds(config.thresholds)
            .with_tip_probe_step(config.tip_probe_step)
    }

    /// The ledger being scanned.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// The output sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The target store.
    pub fn store(&self) -> &T {
        &self.store
    }

    /// Signal polled between heights; clone it to cancel from elsewhere.
    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Store a new target (or replace an existing one) with its cursor reset.
    pub async fn register(&self, mut target: Target) -> anyhow::Result<()> {
        target.cursor = 0;
        target.matched = 0;
        self.store
            .save_target(&target)
            .await
            .with_context(|| format!("save target {}", target.name))?;
        info!(target_name = %target.name, rules = %target.filter, "registered target");
        Ok(())
    }

    /// Status of `names`, or of every stored target when `names` is empty.
    pub async fn status(&self, names: &[&str]) -> anyhow::Result<Vec<TargetStatus>> {
        let targets = if names.is_empty() {
            let stored = self.store.target_names().await?;
            let stored: Vec<&str> = stored.iter().map(String::as_str).collect();
            self.load_targets(&stored).await?
        } else {
            self.load_targets(names).await?
        };
        Ok(targets.iter().map(TargetStatus::from).collect())
    }

    /// Drop the stored configuration of `names`, or of every target when
    /// `names` is empty. Returns the names actually removed.
    pub async fn remove(&self, names: &[&str]) -> anyhow::Result<Vec<String>> {
        let names: Vec<String> = if names.is_empty() {
            self.store.target_names().await?
        } else {
            names.iter().map(|n| n.to_string()).collect()
        };
        let mut removed = Vec::new();
        for name in names {
            if self.store.remove_target(&name).await? {
                info!(target_name = %name, "removed target");
                removed.push(name);
            } else {
                warn!(target_name = %name, "no such target");
            }
        }
        Ok(removed)
    }

    /// Full scan of `[first_block, last_block]` for `names`.
    ///
    /// Every target restarts from `first_block - 1`. The genesis block is
    /// never scanned.
    pub async fn extract(
        &self,
        names: &[&str],
        first_block: u64,
        last_block: u64,
    ) -> anyhow::Result<ScanReport> {
        let mut targets = self.load_targets(names).await?;
        if first_block == 0 {
            info!("genesis block ignored");
        }
        let first = first_block.max(1);
        for t in &mut targets {
            t.cursor = first - 1;
        }
        info!(
            targets = targets.len(),
            first,
            last = last_block,
            "extracting transactions"
        );

        let mut pass = Pass::new(first, last_block, &targets);
        let all = vec![true; targets.len()];
        for height in first..=last_block {
            let outcome = self
                .process_height(height, &mut targets, &all, &mut pass)
                .await;
            if let Some(stop) = self.settle(outcome, &targets).await? {
                pass.stop = stop;
                break;
            }
            for t in &mut targets {
                t.cursor = height;
            }
            if self.height_done(height, last_block, &mut pass) {
                break;
            }
        }

        self.persist(&targets).await?;
        Ok(pass.finish())
    }

    /// Incremental scan: bring `names` up to `last_block`, or to the chain
    /// tip when `None`.
    ///
    /// Each height is decoded once for all targets. A target only receives
    /// transactions while its cursor equals the lowest cursor, so targets
    /// that start ahead never see heights they already covered.
    pub async fn update(
        &self,
        names: &[&str],
        last_block: Option<u64>,
    ) -> anyhow::Result<ScanReport> {
        let mut targets = self.load_targets(names).await?;
        let Some(mut lowest) = targets.iter().map(|t| t.cursor).min() else {
            bail!("no targets to update");
        };

        let last = match last_block {
            Some(h) => h,
            None => find_last_block(&self.chain, self.tip_step).context("locate chain tip")?,
        };
        info!(
            targets = targets.len(),
            from = lowest + 1,
            last,
            "updating targets"
        );

        let mut pass = Pass::new(lowest + 1, last, &targets);
        while lowest < last {
            let height = lowest + 1;
            let at_lowest: Vec<bool> = targets.iter().map(|t| t.cursor == lowest).collect();

            let outcome = self
                .process_height(height, &mut targets, &at_lowest, &mut pass)
                .await;
            if let Some(stop) = self.settle(outcome, &targets).await? {
                pass.stop = stop;
                break;
            }
            for (t, _) in targets.iter_mut().zip(&at_lowest).filter(|(_, a)| **a) {
                t.cursor += 1;
            }
            lowest += 1;
            if self.height_done(height, last, &mut pass) {
                break;
            }
        }

        self.persist(&targets).await?;
        Ok(pass.finish())
    }

    async fn load_targets(&self, names: &[&str]) -> anyhow::Result<Vec<Target>> {
        let mut targets = Vec::with_capacity(names.len());
        for name in names {
            let t = self
                .store
                .load_target(name)
                .await
                .with_context(|| format!("load target {name}"))?
                .with_context(|| format!("target {name} is not initialized"))?;
            targets.push(t);
        }
        Ok(targets)
    }

    /// Decode `height` once and deliver its matches to every target flagged
    /// in `active`. Returns a stop reason when the pass must end here with
    /// nothing emitted for this height.
    async fn process_height(
        &self,
        height: u64,
        targets: &mut [Target],
        active: &[bool],
        pass: &mut Pass,
    ) -> anyhow::Result<Option<StopReason>> {
        let block = match self
            .chain
            .block_by_height(height)
            .and_then(|raw| self.decoder.decode(height, &raw))
        {
            Ok(block) => block,
            Err(e) if e.is_end_of_chain() => return Ok(Some(StopReason::EndOfChain(e))),
            Err(e) => return Err(e).with_context(|| format!("read block {height}")),
        };
        // Decode the whole block before emitting anything from it.
        let txs = match block.decode_transactions() {
            Ok(txs) => txs,
            Err(e) => return Ok(Some(StopReason::Aborted(e))),
        };

        // Every rule and success check runs before the first append, so a
        // failing lookup leaves the height untouched.
        let mut hits = Vec::new();
        for tx in &txs {
            let mut success = None;
            for (i, t) in targets.iter().enumerate() {
                if !active[i] || !matches(tx, &t.filter) {
                    continue;
                }
                if !t.filter.include_failed {
                    let ok = match success {
                        Some(ok) => ok,
                        None => {
                            let ok = confirmed_successful(tx, &self.chain).with_context(|| {
                                format!("success check at block {height}")
                            })?;
                            success = Some(ok);
                            ok
                        }
                    };
                    if !ok {
                        continue;
                    }
                }
                debug!(target_name = %t.name, block = height, txhash = ?tx.txhash, "matched");
                hits.push((i, tx.project(&t.columns)));
            }
        }

        let mut emitted = vec![0u64; targets.len()];
        for (i, row) in hits {
            let name = &targets[i].name;
            self.sink
                .append_transaction(name, row)
                .await
                .with_context(|| format!("append to {name} at block {height}"))?;
            emitted[i] += 1;
        }
        for (i, n) in emitted.into_iter().enumerate() {
            targets[i].matched += n;
            pass.matches[i] += n;
        }
        Ok(None)
    }

    /// Turn a height's outcome into "continue" (`None`) or a stop reason.
    /// Hard failures persist completed progress before propagating.
    async fn settle(
        &self,
        outcome: anyhow::Result<Option<StopReason>>,
        targets: &[Target],
    ) -> anyhow::Result<Option<StopReason>> {
        match outcome {
            Ok(None) => Ok(None),
            Ok(Some(stop)) => {
                warn!(reason = %stop, "stopping scan early");
                Ok(Some(stop))
            }
            Err(e) => {
                if let Err(persist_err) = self.persist(targets).await {
                    warn!(error = %persist_err, "could not persist cursors after failure");
                }
                Err(e)
            }
        }
    }

    /// Bookkeeping after a completed height. Returns `true` when the
    /// cancellation signal asks the pass to stop.
    fn height_done(&self, height: u64, last: u64, pass: &mut Pass) -> bool {
        pass.completed = Some(height);
        pass.blocks += 1;
        self.progress
            .report(height, last, pass.matches.iter().sum());
        if self.cancel.is_cancelled() {
            info!(block = height, "cancelled, stopping after completed block");
            pass.stop = StopReason::Cancelled;
            return true;
        }
        false
    }

    async fn persist(&self, targets: &[Target]) -> anyhow::Result<()> {
        self.sink.flush().await.context("flush sink")?;
        for t in targets {
            self.store
                .save_target(t)
                .await
                .with_context(|| format!("save cursor of {}", t.name))?;
            debug!(target_name = %t.name, cursor = t.cursor, "persisted cursor");
        }
        Ok(())
    }
}

/// Running state of one pass.
struct Pass {
    first: u64,
    last: u64,
    completed: Option<u64>,
    blocks: u64,
    names: Vec<String>,
    matches: Vec<u64>,
    stop: StopReason,
}

impl Pass {
    fn new(first: u64, last: u64, targets: &[Target]) -> Self {
        Self {
            first,
            last,
            completed: None,
            blocks: 0,
            names: targets.iter().map(|t| t.name.clone()).collect(),
            matches: vec![0; targets.len()],
            stop: StopReason::Completed,
        }
    }

    fn finish(self) -> ScanReport {
        let report = ScanReport {
            first: self.first,
            last: self.last,
            completed: self.completed,
            blocks: self.blocks,
            matches: self.names.into_iter().zip(self.matches).collect(),
            stop: self.stop,
        };
        info!(
            first = report.first,
            completed = ?report.completed,
            blocks = report.blocks,
            matches = report.total_matches(),
            stop = %report.stop,
            "scan finished"
        );
        report
    }
}
