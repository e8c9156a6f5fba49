pub mod constants;
pub mod config;
pub mod stats;
pub mod grid;
pub mod mole;
pub mod phase;
pub mod result;
pub mod session;
