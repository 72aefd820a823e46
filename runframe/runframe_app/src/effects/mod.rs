pub mod persistence;
pub mod runner;
pub mod scheduler;
