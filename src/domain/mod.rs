//! Domain types for boosting a franchise listing and the ports the flow talks through.

pub mod package;
pub mod ports;
pub mod session;
