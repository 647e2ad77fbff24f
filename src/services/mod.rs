pub mod cases;
pub mod directory;
pub mod logs;
pub mod mutes;
