//! Ranked match collection.

pub mod collector;
pub mod mset;

pub use collector::MatchCollector;
pub use mset::{MSet, MSetItem, TermInfo};
