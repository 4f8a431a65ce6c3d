// Data structures shared by the queue tools

pub mod device;
pub mod player_command;
pub mod queue_state;
pub mod track;

// Re-export types from child modules
pub use device::*;
pub use player_command::*;
pub use queue_state::*;
pub use track::*;
