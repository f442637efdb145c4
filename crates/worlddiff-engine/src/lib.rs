pub mod compare;
pub mod config;
pub mod diff;
pub mod mode;
pub mod runner;
