//! Application Layer - control loop and command handling
//!
//! - `orchestrator`: periodic scan/monitor loop with single-flight guards
//! - `pacer`: minimum-gap pacing for upstream calls
//! - `commands`: the manual command interface (force entry/exit, blacklist)

pub mod commands;
pub mod orchestrator;
pub mod pacer;

pub use commands::{CommandError, CommandHandler};
pub use orchestrator::Orchestrator;
pub use pacer::Pacer;
