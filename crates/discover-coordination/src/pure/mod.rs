//! Pure decision functions for leases, discovery and election.
//!
//! Functional core, imperative shell: everything here is deterministic and
//! takes time and randomness as arguments. The async code in
//! [`crate::lease`], [`crate::directory`] and [`crate::election`] calls into
//! these for every decision it makes.
//!
//! # Tiger Style
//!
//! - Saturating arithmetic throughout
//! - No I/O, no clocks, no global state

pub mod directory;
pub mod election;
pub mod lease;

pub use directory::matches_filter;
pub use election::ElectionDecision;
pub use election::count_competitors;
pub use election::decide_election;
pub use lease::BackoffResult;
pub use lease::compute_backoff_with_jitter;
pub use lease::effective_renew_interval_ms;
pub use lease::is_valid_transition;
pub use lease::should_abandon_renewal;
