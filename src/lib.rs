//! Tunnelgate - HTTP CONNECT tunneling through forward proxies
//!
//! Core library for the client side of the CONNECT handshake.

pub mod config;
pub mod http;
pub mod proxy;
