//! Process launcher for the supervised bot.
//!
//! Spawns `<interpreter> <entrypoint>` in the project directory with the bot's
//! environment, appending stdout and stderr to log files that are rotated
//! before each launch.

mod error;
mod launch;
mod record;
mod rotate;

pub use error::{LaunchError, LaunchResult};
pub use launch::{launch, LaunchMode, LaunchSpec, LaunchedProcess};
pub use record::ProcessRecord;
pub use rotate::{rotate_if_needed, RotationPolicy};
