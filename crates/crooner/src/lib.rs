//! crooner: learn melodies from a score corpus and improvise new ones.
//!
//! The binary wires the pieces together; the library half exists so the
//! batch and seed logic can be tested without spawning a process.

pub mod batch;
pub mod commands;
pub mod seeds;

pub use batch::{BatchReport, SongFailure};
pub use seeds::Seed;
