//! The reconciliation pipeline.
//!
//! One method per phase; the controller calls them in order. Each step reads
//! the live value, mutates only on mismatch, waits for confirmation, then
//! re-reads to verify. Nothing is cached between steps.

use tracing::{debug, error, info, warn};
use tsc_checklist::Verdict;
use tsc_ledger::{Ledger, LedgerError, Mutation, ObservedStateReader, OpOptions, Reading, Receipt};
use tsc_schemas::{
    short_addr, Address, FeatureFlag, NetworkProfile, SetupPolicy, TargetConfiguration,
    WalletKind, WalletRebindPolicy,
};

use crate::error::ReconcileError;
use crate::funding::FundingAllocator;
use crate::step::{ReconciliationStep, Rule, Setting, SettingValue};
use crate::types::{AuditTrail, Outcome, Phase, PhaseRecord, RecoverableFailure, Warning};

enum StepResult {
    Unchanged,
    Applied,
    /// Left alone because policy forbids replacing the observed value.
    Refused(SettingValue),
}

struct StepFailure {
    observed: Option<SettingValue>,
    reason: String,
}

pub struct ReconciliationEngine<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
    reader: ObservedStateReader<'a, L>,
    target: &'a TargetConfiguration,
    profile: &'a NetworkProfile,
    policy: &'a SetupPolicy,
    operator: Address,
    pool: Option<Address>,
    opts: OpOptions,
    trail: AuditTrail,
    failures: Vec<RecoverableFailure>,
    warnings: Vec<Warning>,
}

impl<'a, L: Ledger + ?Sized> ReconciliationEngine<'a, L> {
    pub fn new(
        ledger: &'a L,
        target: &'a TargetConfiguration,
        profile: &'a NetworkProfile,
        policy: &'a SetupPolicy,
        operator: Address,
        pool: Option<Address>,
    ) -> Self {
        Self {
            ledger,
            reader: ObservedStateReader::new(ledger),
            target,
            profile,
            policy,
            operator,
            pool,
            opts: OpOptions {
                gas_limit: profile.gas_ceiling_per_operation,
            },
            trail: AuditTrail::default(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn trail(&self) -> &AuditTrail {
        &self.trail
    }

    pub fn note_failure(&mut self, f: RecoverableFailure) {
        self.failures.push(f);
    }

    pub fn into_parts(self) -> (AuditTrail, Vec<RecoverableFailure>, Vec<Warning>) {
        (self.trail, self.failures, self.warnings)
    }

    // -----------------------------------------------------------------------
    // Phase 1-2: identity bindings (fatal on failure)
    // -----------------------------------------------------------------------

    pub async fn bind_helper(&mut self) -> Result<(), ReconcileError> {
        let helper = self.target.helper_contract;
        let step = ReconciliationStep::new(
            Phase::HelperBinding,
            "helper_contract",
            Setting::HelperBinding,
            Rule::Bind(helper),
            Mutation::SetHelperBinding { address: helper },
        );
        self.execute(&step)
            .await
            .map(|_| ())
            .map_err(|f| identity_failure(&step, f))
    }

    pub async fn bind_wallets(&mut self) -> Result<(), ReconcileError> {
        for kind in WalletKind::ALL {
            let desired = self.target.wallet(kind);
            let rule = match self.policy.wallet_rebind {
                WalletRebindPolicy::Refuse => Rule::BindIfUnset(desired),
                WalletRebindPolicy::Overwrite => Rule::Bind(desired),
            };
            let step = ReconciliationStep::new(
                Phase::WalletBindings,
                format!("{kind}_wallet"),
                Setting::WalletBinding(kind),
                rule,
                Mutation::SetWalletBinding {
                    kind,
                    address: desired,
                },
            );
            match self.execute(&step).await {
                Ok(StepResult::Refused(SettingValue::Address(bound))) => {
                    warn!(
                        wallet = %kind,
                        bound = %short_addr(&bound),
                        desired = %short_addr(&desired),
                        "wallet already bound elsewhere; left unchanged"
                    );
                    self.warnings.push(Warning::WalletConflict {
                        wallet: kind,
                        bound,
                        desired,
                    });
                }
                Ok(_) => {}
                Err(f) => return Err(identity_failure(&step, f)),
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase 3-4: per-address settings (failures isolated per address)
    // -----------------------------------------------------------------------

    /// Router and pool must collect fees and be free of cooldowns.
    pub async fn configure_venue(&mut self) {
        let phase = Phase::VenueConfiguration;
        let mut venues = vec![("router".to_string(), self.profile.router)];
        match self.pool {
            Some(pool) => venues.push(("liquidity_pool".to_string(), pool)),
            None => {
                self.skip(phase, "liquidity_pool", "no liquidity pool");
                self.warnings.push(Warning::NoLiquidityPool);
            }
        }
        for (label, addr) in venues {
            self.per_address(phase, &label, addr, false, true).await;
        }
    }

    pub async fn exclude_system_addresses(&mut self) {
        let phase = Phase::SystemExclusions;
        for (label, addr) in self.target.system_addresses() {
            if addr == self.profile.router || Some(addr) == self.pool {
                self.skip(phase, &label, "trading venue; stays in fee collection");
                self.warnings.push(Warning::VenueNotExcluded {
                    subject: label,
                    address: addr,
                });
                continue;
            }
            self.per_address(phase, &label, addr, true, true).await;
        }
    }

    async fn per_address(
        &mut self,
        phase: Phase,
        label: &str,
        addr: Address,
        fee_excluded: bool,
        cooldown_excluded: bool,
    ) {
        let steps = [
            ReconciliationStep::new(
                phase,
                format!("{label}.fee_exclusion"),
                Setting::FeeExclusion(addr),
                Rule::Flag(fee_excluded),
                Mutation::SetFeeExclusion {
                    address: addr,
                    excluded: fee_excluded,
                },
            ),
            ReconciliationStep::new(
                phase,
                format!("{label}.cooldown_exclusion"),
                Setting::CooldownExclusion(addr),
                Rule::Flag(cooldown_excluded),
                Mutation::SetCooldownExclusion {
                    address: addr,
                    excluded: cooldown_excluded,
                },
            ),
        ];
        for step in steps {
            if let Err(f) = self.execute(&step).await {
                warn!(
                    phase = %phase,
                    subject = %step.subject,
                    address = %short_addr(&addr),
                    reason = %f.reason,
                    "per-address step failed; continuing"
                );
                self.failures.push(RecoverableFailure::PerAddress {
                    phase,
                    subject: step.subject,
                    address: addr,
                    reason: f.reason,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 5: features
    // -----------------------------------------------------------------------

    pub async fn activate_features(&mut self) {
        for flag in FeatureFlag::ALL {
            if !self.target.features.wants(flag) {
                continue;
            }
            let step = ReconciliationStep::new(
                Phase::FeatureActivation,
                flag.as_str(),
                Setting::Feature(flag),
                Rule::EnableOnly,
                Mutation::ToggleFeature { flag },
            );
            if let Err(f) = self.execute(&step).await {
                warn!(feature = %flag, reason = %f.reason, "feature activation failed; continuing");
                self.failures.push(RecoverableFailure::Feature {
                    flag,
                    reason: f.reason,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 6: treasury funding
    // -----------------------------------------------------------------------

    pub async fn fund_treasury(&mut self) {
        let phase = Phase::TreasuryFunding;
        if !self.policy.fund_wallets {
            self.skip(phase, "treasury", "funding disabled by policy");
            return;
        }

        let allocator = FundingAllocator::new(self.profile.funding_amount);
        let mut recipients = Vec::new();
        for kind in WalletKind::ALL {
            let subject = format!("{kind}_wallet");
            let desired = self.target.wallet(kind);
            let wallet = match self.reader.wallet_binding(kind).await {
                Ok(w) if w == desired => w,
                Ok(w) if w == Address::ZERO => {
                    self.funding_skip(kind, &subject, "wallet not bound".to_string());
                    continue;
                }
                Ok(w) => {
                    let reason = format!(
                        "wallet bound to {}, not the configured {}",
                        short_addr(&w),
                        short_addr(&desired)
                    );
                    self.funding_skip(kind, &subject, reason);
                    continue;
                }
                Err(e) => {
                    self.funding_skip(kind, &subject, e.to_string());
                    continue;
                }
            };
            let step = disburse_step(kind, wallet, &allocator);
            match self.reader.balance_of(wallet).await {
                Ok(b) if FundingAllocator::needs_funding(b) => recipients.push(step),
                Ok(b) => {
                    debug!(wallet = %kind, balance = %b, "already funded");
                    let held = Some(SettingValue::Amount(b));
                    self.record(&step, None, held, held, Outcome::AlreadyConfigured, None);
                }
                Err(e) => self.funding_skip(kind, &subject, e.to_string()),
            }
        }
        if recipients.is_empty() {
            return;
        }

        let treasury = match self.reader.balance_of(self.operator).await {
            Ok(t) => t,
            Err(e) => {
                let reason = format!("treasury balance unreadable: {e}");
                self.skip_funding(&recipients, &reason);
                return;
            }
        };
        if !allocator.admits(treasury) {
            warn!(
                treasury = %treasury,
                required = %allocator.required_treasury(),
                "insufficient balance; funding skipped"
            );
            let reason = format!(
                "insufficient balance: treasury {treasury} < required {}",
                allocator.required_treasury()
            );
            self.skip_funding(&recipients, &reason);
            return;
        }

        for step in recipients {
            let Mutation::Disburse { wallet: kind, .. } = step.mutation else {
                continue;
            };
            if let Err(f) = self.execute(&step).await {
                warn!(wallet = %kind, reason = %f.reason, "disbursement failed; continuing");
                self.failures.push(RecoverableFailure::Funding {
                    wallet: kind,
                    reason: f.reason,
                });
            }
        }
    }

    fn skip_funding(&mut self, recipients: &[ReconciliationStep], reason: &str) {
        for step in recipients {
            if let Mutation::Disburse { wallet, .. } = step.mutation {
                self.funding_skip(wallet, &step.subject, reason.to_string());
            }
        }
    }

    fn funding_skip(&mut self, wallet: WalletKind, subject: &str, reason: String) {
        self.skip(Phase::TreasuryFunding, subject, &reason);
        self.failures
            .push(RecoverableFailure::Funding { wallet, reason });
    }

    // -----------------------------------------------------------------------
    // Phase 7: setup completion (opt-in)
    // -----------------------------------------------------------------------

    /// Mark setup completed when policy asks for it and the converged state
    /// is READY. Returns true if a mutation was confirmed.
    pub async fn complete_setup(&mut self, verdict: &Verdict) -> bool {
        let phase = Phase::SetupCompletion;
        if !self.policy.complete_setup {
            return false;
        }
        if !verdict.is_ready() {
            self.skip(phase, "setup_completed", "verdict is NOT-READY");
            return false;
        }
        match self.reader.liquidity_pool().await {
            Ok(p) if p != Address::ZERO => {}
            Ok(_) => {
                self.skip(phase, "setup_completed", "liquidity pool not registered on the token");
                return false;
            }
            Err(e) => {
                self.skip(phase, "setup_completed", &e.to_string());
                return false;
            }
        }

        let step = ReconciliationStep::new(
            phase,
            "setup_completed",
            Setting::SetupCompleted,
            Rule::EnableOnly,
            Mutation::MarkSetupCompleted,
        );
        match self.execute(&step).await {
            Ok(StepResult::Applied) => true,
            Ok(_) => false,
            Err(f) => {
                self.failures
                    .push(RecoverableFailure::SetupCompletion { reason: f.reason });
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step execution
    // -----------------------------------------------------------------------

    async fn execute(&mut self, step: &ReconciliationStep) -> Result<StepResult, StepFailure> {
        let before = match self.read_setting(step.setting).await {
            Ok(v) => v,
            Err(e) => {
                let reason = e.to_string();
                self.record(step, None, None, None, Outcome::Failed { reason: reason.clone() }, None);
                return Err(StepFailure {
                    observed: None,
                    reason,
                });
            }
        };

        if step.conflicts(&before) {
            let reason = format!("bound to {before}; rebind refused by policy");
            self.record(step, None, Some(before), None, Outcome::Skipped { reason }, None);
            return Ok(StepResult::Refused(before));
        }

        if !step.precondition(&before) {
            debug!(phase = %step.phase, subject = %step.subject, value = %before, "already configured");
            self.record(step, None, Some(before), Some(before), Outcome::AlreadyConfigured, None);
            return Ok(StepResult::Unchanged);
        }

        let receipt = match self.apply(&step.mutation).await {
            Ok(r) => r,
            Err(e) => {
                let reason = e.to_string();
                error!(phase = %step.phase, op = %step.mutation, error = %e, "mutation failed");
                self.record(
                    step,
                    Some(step.mutation.clone()),
                    Some(before),
                    None,
                    Outcome::Failed { reason: reason.clone() },
                    None,
                );
                return Err(StepFailure {
                    observed: Some(before),
                    reason,
                });
            }
        };

        match self.read_setting(step.setting).await {
            Ok(after) if step.postcondition(&after) => {
                self.record(
                    step,
                    Some(step.mutation.clone()),
                    Some(before),
                    Some(after),
                    Outcome::Confirmed,
                    Some(receipt),
                );
                Ok(StepResult::Applied)
            }
            Ok(after) => {
                let reason = format!(
                    "confirmed but re-read {after}, expected {}",
                    step.desired()
                );
                self.record(
                    step,
                    Some(step.mutation.clone()),
                    Some(before),
                    Some(after),
                    Outcome::Failed { reason: reason.clone() },
                    Some(receipt),
                );
                Err(StepFailure {
                    observed: Some(after),
                    reason,
                })
            }
            Err(e) => {
                let reason = format!("confirmed but unverified: {e}");
                self.record(
                    step,
                    Some(step.mutation.clone()),
                    Some(before),
                    None,
                    Outcome::Failed { reason: reason.clone() },
                    Some(receipt),
                );
                Err(StepFailure {
                    observed: None,
                    reason,
                })
            }
        }
    }

    /// Submit, then block until durably confirmed.
    async fn apply(&self, m: &Mutation) -> Result<Receipt, LedgerError> {
        let handle = self.ledger.submit(m, &self.opts).await?;
        info!(op = %m, nonce = handle.nonce, "submitted; waiting for confirmation");
        let receipt = self.ledger.wait_confirmed(&handle).await?;
        info!(op = %m, block = receipt.block, "confirmed");
        Ok(receipt)
    }

    async fn read_setting(&self, setting: Setting) -> Reading<SettingValue> {
        let r = &self.reader;
        match setting {
            Setting::HelperBinding => r.helper_binding().await.map(SettingValue::Address),
            Setting::WalletBinding(k) => r.wallet_binding(k).await.map(SettingValue::Address),
            Setting::FeeExclusion(a) => r.fee_excluded(a).await.map(SettingValue::Flag),
            Setting::CooldownExclusion(a) => r.cooldown_excluded(a).await.map(SettingValue::Flag),
            Setting::Feature(f) => r.feature(f).await.map(SettingValue::Flag),
            Setting::Balance(a) => r.balance_of(a).await.map(SettingValue::Amount),
            Setting::SetupCompleted => r.setup_completed().await.map(SettingValue::Flag),
        }
    }

    fn record(
        &mut self,
        step: &ReconciliationStep,
        action: Option<Mutation>,
        before: Option<SettingValue>,
        after: Option<SettingValue>,
        outcome: Outcome,
        receipt: Option<Receipt>,
    ) {
        self.trail.push(PhaseRecord {
            phase: step.phase,
            subject: step.subject.clone(),
            action,
            before: before.map(|v| v.to_string()),
            after: after.map(|v| v.to_string()),
            outcome,
            receipt,
        });
    }

    fn skip(&mut self, phase: Phase, subject: &str, reason: &str) {
        debug!(phase = %phase, subject, reason, "skipped");
        self.trail.push(PhaseRecord {
            phase,
            subject: subject.to_string(),
            action: None,
            before: None,
            after: None,
            outcome: Outcome::Skipped {
                reason: reason.to_string(),
            },
            receipt: None,
        });
    }
}

fn disburse_step(
    kind: WalletKind,
    wallet: Address,
    allocator: &FundingAllocator,
) -> ReconciliationStep {
    ReconciliationStep::new(
        Phase::TreasuryFunding,
        format!("{kind}_wallet"),
        Setting::Balance(wallet),
        Rule::FundIfEmpty(allocator.amount),
        Mutation::Disburse {
            wallet: kind,
            amount: allocator.amount,
        },
    )
}

fn identity_failure(step: &ReconciliationStep, f: StepFailure) -> ReconcileError {
    error!(
        phase = %step.phase,
        subject = %step.subject,
        reason = %f.reason,
        "identity binding failed; aborting pipeline"
    );
    ReconcileError::IdentityBindingFailure {
        phase: step.phase,
        subject: step.subject.clone(),
        expected: step.desired(),
        observed: f.observed.map(|v| v.to_string()),
        reason: f.reason,
    }
}
