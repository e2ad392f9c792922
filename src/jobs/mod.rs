//! The scheduled background jobs: budget alert emails and recurring
//! transaction materialization.

mod budget_alerts;
mod recurring;

pub use budget_alerts::{check_budget_alerts, run_budget_alert_job};
pub use recurring::{
    ProcessOutcome, RecurringEvent, UserThrottle, find_due_recurring, process_recurring_event,
    run_recurring_processor, run_recurring_trigger_job,
};
