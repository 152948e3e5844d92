//! Forward proxy tunneling
//!
//! This module implements the CONNECT handshake: request formatting and
//! response validation, and the driver that runs them over a socket.

pub mod handler;
pub mod tunnel;

pub use handler::{ProxyHandler, ProxyResponseResult};
pub use tunnel::{EstablishedTunnel, HandshakeOutcome, Tunnel};
