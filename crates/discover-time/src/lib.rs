//! Time sources for lease bookkeeping.
//!
//! Backends stamp every registration with a lease deadline in Unix
//! milliseconds. Where that clock comes from decides whether tests can run
//! renewal and election loops deterministically, so it is injected through
//! the [`TimeProvider`] trait:
//!
//! - [`SystemTimeProvider`]: wall clock, for production backends.
//! - [`TokioTimeProvider`]: follows tokio's clock, including a paused test
//!   clock, so backend expiry and client sleeps share one timeline.
//! - [`SimulatedTimeProvider`]: fully manual, behind the `simulation` feature.
//!
//! # Tiger Style
//!
//! - No `.expect()` or `.unwrap()` - fallback to 0 before the epoch
//! - Saturating arithmetic on every advance

#[cfg(feature = "simulation")]
use std::sync::Arc;
#[cfg(feature = "simulation")]
use std::sync::atomic::AtomicU64;
#[cfg(feature = "simulation")]
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Current Unix timestamp in milliseconds, 0 if the clock is before the epoch.
#[inline]
pub fn current_time_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Source of "now" for lease deadlines.
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    /// Current time in Unix milliseconds.
    fn now_unix_ms(&self) -> u64;
}

/// Wall-clock time provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    #[inline]
    fn now_unix_ms(&self) -> u64 {
        current_time_ms()
    }
}

/// Time provider driven by `tokio::time::Instant`.
///
/// Anchored to the wall clock once at construction; afterwards it advances
/// only as tokio's clock advances. Under `#[tokio::test(start_paused = true)]`
/// that makes lease expiry follow the runtime's virtual time.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Copy)]
pub struct TokioTimeProvider {
    anchor_unix_ms: u64,
    anchor: tokio::time::Instant,
}

#[cfg(feature = "tokio")]
impl TokioTimeProvider {
    /// Anchor a new provider at the current wall-clock and tokio instants.
    pub fn new() -> Self {
        Self {
            anchor_unix_ms: current_time_ms(),
            anchor: tokio::time::Instant::now(),
        }
    }
}

#[cfg(feature = "tokio")]
impl Default for TokioTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tokio")]
impl TimeProvider for TokioTimeProvider {
    fn now_unix_ms(&self) -> u64 {
        let elapsed_ms = self.anchor.elapsed().as_millis() as u64;
        self.anchor_unix_ms.saturating_add(elapsed_ms)
    }
}

/// Manually driven time provider.
///
/// Clones share the same clock.
///
/// ```ignore
/// let time = SimulatedTimeProvider::new(1_000_000);
/// time.advance_ms(500);
/// assert_eq!(time.now_unix_ms(), 1_000_500);
/// ```
#[cfg(feature = "simulation")]
#[derive(Debug, Clone)]
pub struct SimulatedTimeProvider {
    current_time_ms: Arc<AtomicU64>,
}

#[cfg(feature = "simulation")]
impl SimulatedTimeProvider {
    /// Start the clock at `initial_time_ms`.
    pub fn new(initial_time_ms: u64) -> Self {
        Self {
            current_time_ms: Arc::new(AtomicU64::new(initial_time_ms)),
        }
    }

    /// Move the clock forward, saturating at `u64::MAX`.
    pub fn advance_ms(&self, delta_ms: u64) {
        let _ = self
            .current_time_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| Some(now.saturating_add(delta_ms)));
    }

    /// Set the clock to an absolute value.
    pub fn set_ms(&self, time_ms: u64) {
        self.current_time_ms.store(time_ms, Ordering::SeqCst);
    }
}

#[cfg(feature = "simulation")]
impl TimeProvider for SimulatedTimeProvider {
    #[inline]
    fn now_unix_ms(&self) -> u64 {
        self.current_time_ms.load(Ordering::SeqCst)
    }
}
