pub mod attendance;
pub mod core;
pub mod prefs;
pub mod roster;
