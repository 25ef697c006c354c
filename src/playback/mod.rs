pub mod scheduler;
pub mod session;

pub use scheduler::{frame_wait, sweep, Clock, Iteration, PlaybackStats, Scheduler, SystemClock};
pub use session::{PlayFlag, PlaybackSession, SpeedSet};
