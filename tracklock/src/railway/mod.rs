//! Track model and vehicle control.

pub mod grid;
pub mod track;
pub mod topology;
pub mod inference;
pub mod switches;
pub mod locks;
pub mod actions;
pub mod vehicle;
