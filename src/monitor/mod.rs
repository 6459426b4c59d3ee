//! Live change monitoring
//!
//! A sequential-tick loop: fetch the full snapshot, diff it against
//! the previous one by id set, push the resulting events into a
//! bounded ring, recompute aggregate stats, render. The loop awaits
//! one full fetch+render cycle before sleeping, so ticks never
//! overlap.
//!
//! An unreachable store flips the connection state to disconnected
//! and the loop keeps retrying on the same interval; the process
//! never exits because of a failed tick. Shutdown is an explicit
//! stop signal, not OS signal handling.

mod diff;
mod engine;
mod events;

pub use diff::diff_snapshots;
pub use engine::{ChangeMonitor, ConnectionState, MonitorState, RenderPort};
pub use events::{ChangeEvent, ChangeKind, EventRing};
