pub mod engine;
pub mod render;
pub mod session;

pub use engine::{QueueCommand, QueueEngine, QueueOutcome};
pub use session::{
    JoinOutcome, LastEvent, LastEventKind, LeaveOutcome, OverflowPolicy, QueuePolicy, QueueSession,
};
