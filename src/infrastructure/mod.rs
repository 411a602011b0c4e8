//! Adapters for the ports in `domain::ports`: the REST backend, the hosted
//! checkout and the timer.

pub mod checkout;
pub mod clock;
pub mod http;
