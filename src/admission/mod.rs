//! Admission control core: shared client stores, the three rate limiting
//! algorithms, and the expiry sweepers that bound their memory.

mod engine;
mod fixed_window;
mod policy;
mod sliding_window;
mod store;
mod sweeper;
mod token_bucket;

pub use engine::{AdmissionEngine, Algorithm};
pub use fixed_window::{FixedWindowLimiter, FixedWindowState};
pub use policy::AdmissionPolicy;
pub use sliding_window::{SlidingWindowLimiter, SlidingWindowState};
pub use store::{ClientStore, LastSeen};
pub use sweeper::{spawn_sweeper, SweepSchedule};
pub use token_bucket::{TokenBucketLimiter, TokenBucketState};
