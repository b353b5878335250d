//! Route handlers, one module per resource

pub mod health;
pub mod heartbeat;
pub mod servers;
pub mod status;
