//! Run engine: the per-run execution state machine.

pub mod events;
pub mod run;
pub mod state;

pub use events::RunEvent;
pub use run::{RunEngine, RunOptions};
pub use state::{RunReport, RunState, RunStatus, Step, ToolCallState, ToolCallStatus};
