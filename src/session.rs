//! Screen state for day-by-day activity browsing
//!
//! The session owns the selected date and the last applied result. Each
//! aggregation run is tagged with a [`RunTicket`] when it starts; completions
//! carrying any ticket other than the active one are discarded, so a slow run
//! for a previous date can never overwrite the current date's totals.

use crate::aggregator::DailyAggregator;
use crate::error::ActivityError;
use crate::provider::HealthDataProvider;
use crate::types::{DailyResult, Permission};
use chrono::{Duration, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

/// Tag identifying one aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub date: NaiveDate,
}

/// Completion of an aggregation run
#[derive(Debug)]
pub struct RunOutcome {
    pub ticket: RunTicket,
    pub permissions: Vec<Permission>,
    pub result: Result<DailyResult, ActivityError>,
}

/// Run the aggregation a ticket was issued for.
///
/// Does not touch the session; pass the outcome to [`ActivitySession::apply`].
pub async fn run<P: HealthDataProvider>(
    aggregator: &DailyAggregator<P>,
    ticket: RunTicket,
) -> RunOutcome {
    let (permissions, result) = match aggregator.prepare().await {
        Ok(permissions) => {
            let result = aggregator.collect(ticket.date).await;
            (permissions, result)
        }
        Err(e) => (Vec::new(), Err(e)),
    };
    RunOutcome {
        ticket,
        permissions,
        result,
    }
}

/// Owned state of the activity screen
#[derive(Debug)]
pub struct ActivitySession {
    current_date: NaiveDate,
    active_run: Option<RunTicket>,
    result: Option<DailyResult>,
    permissions: Vec<Permission>,
    permission_error: Option<ActivityError>,
    fetch_error: Option<ActivityError>,
}

impl ActivitySession {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            current_date: date,
            active_run: None,
            result: None,
            permissions: Vec::new(),
            permission_error: None,
            fetch_error: None,
        }
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    /// Result for the current date, once a run for it has been applied
    pub fn result(&self) -> Option<&DailyResult> {
        self.result.as_ref()
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Initialization or permission failure of the last applied run
    pub fn permission_error(&self) -> Option<&ActivityError> {
        self.permission_error.as_ref()
    }

    /// Read failure of the last applied run
    pub fn fetch_error(&self) -> Option<&ActivityError> {
        self.fetch_error.as_ref()
    }

    /// Whether a run for the current date is in flight
    pub fn is_loading(&self) -> bool {
        self.active_run.is_some()
    }

    /// Move the selected date by `days` (negative goes back).
    ///
    /// Clears the displayed result and invalidates any run in flight.
    pub fn navigate(&mut self, days: i64) -> NaiveDate {
        match self.current_date.checked_add_signed(Duration::days(days)) {
            Some(date) => {
                self.current_date = date;
                self.active_run = None;
                self.result = None;
                self.permission_error = None;
                self.fetch_error = None;
            }
            None => warn!(days, date = %self.current_date, "date navigation out of range"),
        }
        self.current_date
    }

    /// Start a run for the current date. Any earlier run becomes stale.
    pub fn begin_run(&mut self) -> RunTicket {
        let ticket = RunTicket {
            run_id: Uuid::new_v4(),
            date: self.current_date,
        };
        self.active_run = Some(ticket);
        ticket
    }

    /// Apply a run outcome. Returns `false` if the run is stale and was discarded.
    pub fn apply(&mut self, outcome: RunOutcome) -> bool {
        if self.active_run != Some(outcome.ticket) {
            warn!(
                run_id = %outcome.ticket.run_id,
                run_date = %outcome.ticket.date,
                current_date = %self.current_date,
                "discarding stale aggregation run"
            );
            return false;
        }

        self.active_run = None;
        self.permissions = outcome.permissions;
        self.permission_error = None;
        self.fetch_error = None;

        match outcome.result {
            Ok(result) => {
                info!(
                    run_id = %outcome.ticket.run_id,
                    date = %result.date,
                    total_steps = result.total_steps,
                    "applied aggregation run"
                );
                self.result = Some(result);
            }
            Err(e @ (ActivityError::ProviderInitFailed | ActivityError::PermissionDenied(_))) => {
                self.result = None;
                self.permission_error = Some(e);
            }
            Err(e) => {
                self.result = None;
                self.fetch_error = Some(e);
            }
        }
        true
    }

    /// Run and apply an aggregation for the current date
    pub async fn refresh<P: HealthDataProvider>(
        &mut self,
        aggregator: &DailyAggregator<P>,
    ) -> Option<&DailyResult> {
        let ticket = self.begin_run();
        let outcome = run(aggregator, ticket).await;
        self.apply(outcome);
        self.result()
    }
}
