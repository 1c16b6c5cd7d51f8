//! Bevy integration for arcshot.
//!
//! The session lives in a single resource and is advanced by one fixed-step
//! system. Other systems only feed it commands, mirror its visual requests
//! onto entities and republish its events as Bevy messages.

pub mod components;
pub mod events;
pub mod plugin;
pub mod resources;
pub mod systems;

#[cfg(test)]
pub(crate) mod test_utils;

pub use components::*;
pub use events::*;
pub use plugin::ArcshotPlugin;
pub use resources::*;
