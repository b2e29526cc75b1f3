//! Application layer: the client-side state holders and the workflows that
//! drive them.
//!
//! Each holder keeps its state in a `tokio::sync::watch` channel with a
//! single writer, so views subscribe instead of polling. `StorefrontContext`
//! wires them together for one session.

pub mod cart;
pub mod checkout;
pub mod context;
pub mod kitchen;
pub mod notifications;
pub mod session;
