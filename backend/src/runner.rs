//! Batch runner for lead distribution.
//!
//! Responsibilities:
//! - Walk the uploaded leads strictly in order, one lead fully applied
//!   before the next one starts.
//! - Resolve matching subscribers from the store and let the distributor
//!   decide every subscriber's copy of the lead.
//! - Apply the resulting mutation set: lead, then assignments, then counter
//!   updates.
//! - Contain every per-lead problem at the lead boundary and tally the run.
//!
//! Non-responsibilities:
//! - Lock/unlock decisions (allocation crate).
//! - Retries or timeouts: a failed store call fails its lead.
//!
//! Sequential processing is what keeps quota accounting exact: each lead
//! sees the counters written by the lead before it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use allocation::{Lead, LeadDistributor, LeadId, PlanPolicy, ValidationError};
use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::error::{InputError, LeadError, MutationStage};
use crate::intake::{Workbook, load_leads};
use crate::logger::{annotate_span, child_span, warn_if_slow};
use crate::metrics::counters::Counters;
use crate::notify::{Notification, Notifier, Severity};
use crate::store::LeadStore;

/// What happened to a single input lead.
#[derive(Debug)]
pub enum LeadOutcome {
    /// Every mutation for the lead was applied.
    Distributed {
        lead_id: LeadId,
        unlocked: usize,
        locked: usize,
    },
    /// No subscriber services the lead's category. `lead_id` is set when
    /// unmatched leads are persisted.
    Unmatched { lead_id: Option<LeadId> },
    /// The lead failed validation and was not processed.
    Skipped { reason: ValidationError },
    /// A store call failed; the lead's remaining mutations were abandoned.
    Failed { error: LeadError },
}

impl LeadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LeadOutcome::Distributed { .. })
    }
}

/// Result of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per input lead, in input order.
    pub outcomes: Vec<LeadOutcome>,
}

impl BatchReport {
    pub fn total_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, LeadOutcome::Skipped { .. }))
    }

    pub fn unmatched_count(&self) -> usize {
        self.count(|o| matches!(o, LeadOutcome::Unmatched { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, LeadOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&LeadOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Distribution Complete! Processed {} of {} leads.",
            self.success_count(),
            self.total_count()
        )
    }
}

pub struct BatchRunner {
    store: Arc<dyn LeadStore>,
    notifier: Arc<dyn Notifier>,
    distributor: LeadDistributor,

    /// Persist leads nobody services before skipping them.
    persist_unmatched: bool,

    /// Budget for a single store call before a slow-call warning.
    slow_store_call: Duration,

    /// Observability counters (does not affect behavior).
    counters: Counters,
}

impl BatchRunner {
    pub fn new(store: Arc<dyn LeadStore>, notifier: Arc<dyn Notifier>) -> Self {
        let defaults = AppConfig::default();
        Self {
            store,
            notifier,
            distributor: LeadDistributor::new(defaults.plan_policy),
            persist_unmatched: defaults.persist_unmatched_leads,
            slow_store_call: defaults.slow_store_call,
            counters: Counters::default(),
        }
    }

    pub fn from_config(
        store: Arc<dyn LeadStore>,
        notifier: Arc<dyn Notifier>,
        cfg: &AppConfig,
    ) -> Self {
        Self::new(store, notifier)
            .with_policy(cfg.plan_policy)
            .persist_unmatched(cfg.persist_unmatched_leads)
            .slow_store_call(cfg.slow_store_call)
    }

    pub fn with_policy(mut self, policy: PlanPolicy) -> Self {
        self.distributor = LeadDistributor::new(policy);
        self
    }

    pub fn persist_unmatched(mut self, persist: bool) -> Self {
        self.persist_unmatched = persist;
        self
    }

    pub fn slow_store_call(mut self, max: Duration) -> Self {
        self.slow_store_call = max;
        self
    }

    pub fn with_counters(mut self, counters: Counters) -> Self {
        self.counters = counters;
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Validate an upload and distribute the leads of its first file.
    ///
    /// Input problems are reported and returned before anything is written.
    pub async fn run_upload(
        &self,
        files: &[Workbook],
        now: DateTime<Utc>,
    ) -> Result<BatchReport, InputError> {
        let leads = files
            .first()
            .ok_or(InputError::NoFile)
            .and_then(|wb| {
                annotate_span(Some(&wb.name), None);
                load_leads(wb, now)
            });

        match leads {
            Ok(leads) => Ok(self.run(&leads).await),
            Err(e) => {
                error!(error = %e, "upload rejected");
                self.notifier
                    .notify(Notification::new(e.to_string(), Severity::Error));
                Err(e)
            }
        }
    }

    /// Distribute every lead in order. Never fails as a whole: each lead's
    /// outcome is recorded in the report.
    #[instrument(skip_all, target = "runner", fields(total = leads.len()))]
    pub async fn run(&self, leads: &[Lead]) -> BatchReport {
        self.notifier.notify(Notification::new(
            "Starting lead distribution...",
            Severity::Info,
        ));

        let mut report = BatchReport {
            outcomes: Vec::with_capacity(leads.len()),
        };

        for (idx, lead) in leads.iter().enumerate() {
            let outcome = self
                .process_lead(lead)
                .instrument(child_span("lead", idx))
                .await;
            report.outcomes.push(outcome);
        }

        info!(
            success = report.success_count(),
            total = report.total_count(),
            skipped = report.skipped_count(),
            unmatched = report.unmatched_count(),
            failed = report.failed_count(),
            "distribution finished"
        );

        self.notifier
            .notify(Notification::new(report.to_string(), Severity::Success));

        report
    }

    async fn process_lead(&self, lead: &Lead) -> LeadOutcome {
        match self.try_process_lead(lead).await {
            Ok(outcome) => outcome,
            Err(LeadError::Validation(reason)) => {
                warn!(lead = %lead.describe(), "skipping lead, missing 'Service_Category' data");
                Counters::bump(&self.counters.leads_skipped, 1);
                LeadOutcome::Skipped { reason }
            }
            Err(error) => {
                error!(lead = %lead.describe(), error = %error, "failed to process lead");
                self.notifier.notify(Notification::new(
                    format!("Error processing lead: {error}"),
                    Severity::Error,
                ));
                Counters::bump(&self.counters.leads_failed, 1);
                LeadOutcome::Failed { error }
            }
        }
    }

    async fn try_process_lead(&self, lead: &Lead) -> Result<LeadOutcome, LeadError> {
        let category = lead.category()?;
        annotate_span(None, Some(category));

        let subscribers = warn_if_slow(
            "db_find_subscribers",
            self.slow_store_call,
            self.store.find_subscribers_by_category(category),
        )
        .await
        .map_err(LeadError::store(MutationStage::FindSubscribers))?;

        if subscribers.is_empty() {
            let lead_id = if self.persist_unmatched {
                Some(self.create_lead(lead).await?)
            } else {
                None
            };

            info!(category = %category, "no subscribers found for category");
            Counters::bump(&self.counters.leads_unmatched, 1);
            return Ok(LeadOutcome::Unmatched { lead_id });
        }

        let distribution = self.distributor.distribute(lead, &subscribers)?;

        // Apply in order: lead, links, counters.
        let lead_id = self.create_lead(&distribution.lead).await?;

        for planned in &distribution.assignments {
            let link = planned.bind(lead_id);
            warn_if_slow(
                "db_create_assignment",
                self.slow_store_call,
                self.store.create_assignment(&link),
            )
            .await
            .map_err(LeadError::store(MutationStage::CreateAssignment))?;
        }

        for update in &distribution.counter_updates {
            warn_if_slow(
                "db_update_lead_count",
                self.slow_store_call,
                self.store.update_subscriber_count(update),
            )
            .await
            .map_err(LeadError::store(MutationStage::UpdateCount))?;
        }

        let (unlocked, locked) = (distribution.unlocked(), distribution.locked());

        Counters::bump(&self.counters.leads_distributed, 1);
        Counters::bump(&self.counters.assignments_unlocked, unlocked as u64);
        Counters::bump(&self.counters.assignments_locked, locked as u64);
        Counters::bump(
            &self.counters.counters_incremented,
            distribution.counter_updates.len() as u64,
        );

        debug!(lead_id = %lead_id, unlocked, locked, "lead distributed");

        Ok(LeadOutcome::Distributed {
            lead_id,
            unlocked,
            locked,
        })
    }

    async fn create_lead(&self, lead: &Lead) -> Result<LeadId, LeadError> {
        warn_if_slow(
            "db_create_lead",
            self.slow_store_call,
            self.store.create_lead(lead),
        )
        .await
        .map_err(LeadError::store(MutationStage::CreateLead))
    }
}
