//! Domain layer: value objects, wire types and the ports the application
//! layer talks through.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod delivery;
pub mod inventory;
pub mod kitchen;
pub mod menu;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
