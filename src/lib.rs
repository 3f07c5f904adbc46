//! stockdash: equity dashboard core with returns analytics and price forecasts
//! for a fixed universe of large-cap symbols.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
