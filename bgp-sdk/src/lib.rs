//! Shared types for the BarcodeGen Pro API.
//!
//! This crate carries everything both sides of the wire agree on: request
//! and response bodies, status enums, phone-number classification for the
//! supported mobile-money networks, and the HMAC signature scheme used by
//! the provider webhook.

#![forbid(unsafe_code)]

pub mod objects;
pub mod phone;
pub mod signature;
