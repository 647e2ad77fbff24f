pub mod mute;
pub mod setup;
