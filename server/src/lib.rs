//! Channel server library.
//!
//! Packet dispatch, the region registry and the WebSocket front end, exposed
//! for use in tests and the server binary.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod handlers;
pub mod send;
pub mod world;
pub mod ws;
