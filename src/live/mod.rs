pub mod scheduler;
pub mod state;

pub use scheduler::Scheduler;
pub use state::{ChannelSettings, ChannelSnapshot, LiveChannel, LiveManifestState};
