//! Run orchestration: validate, resolve, preflight, reconcile, verify, score.

use std::time::Duration;

use tracing::{error, info, warn};
use tsc_checklist::{evaluate, next_steps, CheckTargets, Checklist, Verdict};
use tsc_config::{resolve_profile, unidentified_profile, SetupConfig};
use tsc_ledger::{Ledger, ObservedState, ObservedStateReader, Query, ReadFailure, ReadScope};
use tsc_schemas::{short_addr, Address, TargetConfiguration, WalletKind};
use uuid::Uuid;

use crate::engine::ReconciliationEngine;
use crate::error::ReconcileError;
use crate::guard::DegradedModeGuard;
use crate::preflight::preflight;
use crate::types::{RecoverableFailure, RunReport, Warning};

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub run_id: Uuid,
    /// Wait the profile's safety delay before the first mutation.
    pub honor_safety_delay: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            honor_safety_delay: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Controller {
    options: RunOptions,
}

impl Controller {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// One full reconciliation run.
    ///
    /// `Err` only for failures that leave nothing to score: invalid
    /// configuration (before any ledger call) or an expired deadline. Every
    /// other outcome, including an unreadable network id or a phase 1-2
    /// abort, is an `Ok` report with a checklist and verdict.
    pub async fn run<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        config: &SetupConfig,
    ) -> Result<RunReport, ReconcileError> {
        let target = config.target.to_target().map_err(|failures| {
            for f in &failures {
                error!(label = %f.label, kind = ?f.kind, "invalid address");
            }
            ReconcileError::FatalPrecondition { failures }
        })?;

        match config.policy.deadline() {
            Some(limit) => tokio::time::timeout(limit, self.run_validated(ledger, config, &target))
                .await
                .map_err(|_| {
                    error!(secs = limit.as_secs(), "run deadline exceeded; confirmed effects persist");
                    ReconcileError::DeadlineExceeded { after: limit }
                })?,
            None => self.run_validated(ledger, config, &target).await,
        }
    }

    async fn run_validated<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        config: &SetupConfig,
        target: &TargetConfiguration,
    ) -> Result<RunReport, ReconcileError> {
        let run_id = self.options.run_id;
        let mut warnings = Vec::new();
        let mut failures = Vec::new();
        let mut aborted = None;

        let profile = match ledger.network_id().await {
            Ok(network_id) => resolve_profile(network_id),
            Err(error) => {
                error!(%error, "network id unreadable; fallback profile, no mutation will be issued");
                failures.push(RecoverableFailure::Read(ReadFailure::new(
                    Query::NetworkId,
                    &error,
                )));
                aborted = Some(ReconcileError::Ledger {
                    query: Query::NetworkId,
                    error,
                });
                unidentified_profile()
            }
        };
        info!(
            run_id = %run_id,
            network_id = profile.network_id,
            profile = profile.kind.as_str(),
            "reconcile run started"
        );

        let reader = ObservedStateReader::new(ledger);

        let operator = if aborted.is_some() {
            None
        } else {
            match preflight(ledger, &profile, &config.token, target.helper_contract).await {
                Ok(pre) => {
                    warnings.extend(pre.warnings);
                    Some(pre.operator)
                }
                Err(failure) => {
                    error!(%failure, "preflight failed; no mutation will be issued");
                    aborted = Some(ReconcileError::from(failure));
                    None
                }
            }
        };

        let mut scope = ReadScope {
            exclusion_subjects: Vec::new(),
            balance_holders: operator.into_iter().collect(),
        };
        let initial = reader.snapshot(&scope).await;
        let pool = resolve_pool(&initial, target, &mut warnings);
        scope.exclusion_subjects = exclusion_subjects(target, profile.router, pool);
        scope
            .balance_holders
            .extend(WalletKind::ALL.map(|k| target.wallet(k)));

        let (mut guard, degraded_warning) = DegradedModeGuard::observe_start(&initial);
        warnings.extend(degraded_warning);

        let mut engine = ReconciliationEngine::new(
            ledger,
            target,
            &profile,
            &config.policy,
            operator.unwrap_or(Address::ZERO),
            pool,
        );

        if aborted.is_none() {
            let delay = profile.safety_delay();
            if self.options.honor_safety_delay && delay > Duration::ZERO {
                warn!(ms = profile.safety_delay_ms, network = %profile.name, "safety delay before first mutation");
                tokio::time::sleep(delay).await;
            }

            aborted = match engine.bind_helper().await {
                Ok(()) => {
                    if let Some(f) = guard.check_after_helper(&reader).await {
                        engine.note_failure(f);
                    }
                    engine.bind_wallets().await.err()
                }
                Err(e) => Some(e),
            };
        }

        if aborted.is_none() {
            engine.configure_venue().await;
            engine.exclude_system_addresses().await;
            engine.activate_features().await;
            engine.fund_treasury().await;
        }

        let targets = CheckTargets {
            router: profile.router,
            pool,
        };
        let mut final_state = reader.snapshot(&scope).await;
        let mut checklist = evaluate(&final_state, &targets);
        let mut verdict = run_verdict(&checklist, &guard, aborted.as_ref());

        if aborted.is_none() && engine.complete_setup(&verdict).await {
            final_state = reader.snapshot(&scope).await;
            checklist = evaluate(&final_state, &targets);
            verdict = run_verdict(&checklist, &guard, aborted.as_ref());
        }

        let advisories = next_steps(&final_state, pool);
        let (records, engine_failures, engine_warnings) = engine.into_parts();
        warnings.extend(engine_warnings);
        failures.extend(engine_failures);
        failures.extend(final_state.read_failures().into_iter().map(RecoverableFailure::Read));

        let report = RunReport {
            run_id,
            profile,
            pool,
            records,
            failures,
            warnings,
            degraded: guard.into_status(),
            checklist,
            verdict,
            advisories,
            aborted,
        };
        info!(
            run_id = %run_id,
            verdict = %report.verdict,
            mutations = report.mutation_count(),
            failures = report.failures.len(),
            "reconcile run finished"
        );
        Ok(report)
    }
}

/// The checklist verdict, forced NOT-READY by an unresolved degraded mode or
/// an aborted run. Setup completion is gated on this, not on the raw
/// checklist.
fn run_verdict(
    checklist: &Checklist,
    guard: &DegradedModeGuard,
    aborted: Option<&ReconcileError>,
) -> Verdict {
    let mut verdict = checklist.verdict();
    if guard.is_unresolved() {
        verdict =
            verdict.not_ready_because("Degraded mode unresolved after helper binding".to_string());
    }
    if let Some(e) = aborted {
        verdict = verdict.not_ready_because(format!("Run aborted: {e}"));
    }
    verdict
}

/// On-chain pool wins; the configured pool is used until one is registered.
fn resolve_pool(
    initial: &ObservedState,
    target: &TargetConfiguration,
    warnings: &mut Vec<Warning>,
) -> Option<Address> {
    match (initial.pool(), target.liquidity_pool) {
        (Ok(Some(on_chain)), Some(configured)) if on_chain != configured => {
            warn!(
                on_chain = %short_addr(&on_chain),
                configured = %short_addr(&configured),
                "pool mismatch; using on-chain pool"
            );
            warnings.push(Warning::PoolMismatch {
                on_chain,
                configured,
            });
            Some(on_chain)
        }
        (Ok(Some(on_chain)), _) => Some(on_chain),
        (_, configured) => configured,
    }
}

fn exclusion_subjects(
    target: &TargetConfiguration,
    router: Address,
    pool: Option<Address>,
) -> Vec<Address> {
    let mut out = vec![router];
    out.extend(pool);
    for (_, a) in target.system_addresses() {
        if !out.contains(&a) {
            out.push(a);
        }
    }
    out
}
