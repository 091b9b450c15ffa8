//! State module for check outcomes and sweep lifecycle
//!
//! # Components
//!
//! - `RegistrationRecord` / `CheckResult`: the typed outcome of one domain check
//! - `SweepState`: the `Idle | Running` state machine guarding periodic sweeps

mod record;
mod sweep_state;

// Re-export main types
pub use record::{CheckResult, CheckStatus, Records, RegistrationRecord};
pub use sweep_state::{SweepGuard, SweepPhase, SweepState};
