pub mod common;
pub mod config;
pub mod map;
pub mod pathfinder;
pub mod region;
pub mod scenario;
pub mod stat;
