//! Port traits the domain calls through.

pub mod config_port;
pub mod data_port;
pub mod export_port;
pub mod solver_port;
