//! Pure KPI workflow rules: record status transitions, the calculation
//! lifecycle and reward/penalty computation. Nothing in here touches the
//! database; handlers consult these functions and persist the outcome.

pub mod payout;
pub mod period;
pub mod policy;
pub mod reward;
pub mod status;
