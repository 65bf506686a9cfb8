#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dashboard;
pub mod entities;
pub mod events;
pub mod framework;
pub mod layout;
pub mod processors;
pub mod provider;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
