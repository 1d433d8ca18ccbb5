//! Train ticket booking server.
//!
//! Answers seat availability queries over segments of a train journey and
//! books seats so that no two active tickets for the same seat ever cover
//! overlapping parts of the route.

pub mod booking;
pub mod domain;
pub mod server;
pub mod store;
