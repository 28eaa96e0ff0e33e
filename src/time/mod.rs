pub mod clock;
pub mod delta;

pub use clock::{Clock, ManualClock, SystemClock};
