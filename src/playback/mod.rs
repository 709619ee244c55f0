//! Client-side playback: confirm access, fetch bytes, then play locally.

pub mod coordinator;
pub mod player;
pub mod resource;
pub mod session;
