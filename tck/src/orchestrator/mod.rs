//! Time and randomness sources for deterministic test runs.
//!
//! Everything that waits goes through [`Clock`] and everything random goes
//! through [`TestRng`], so a failing run can be replayed from its seed with
//! time fully under the test's control.

/// Injectable time source
pub mod clock;
/// Seeded randomness
pub mod rng;

pub use clock::{Clock, PausedClock, SystemClock};
pub use rng::TestRng;
