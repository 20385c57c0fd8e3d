//! Authority Planner - turn-based AI for the Authority faction

pub mod ai;
pub mod core;
pub mod persistence;
pub mod security;
pub mod world;
