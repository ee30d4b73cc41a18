//! Domain layer for the ride-dispatch engine.
//!
//! This crate contains the entities in §3 (`Driver`, `Ride`, `Trip`,
//! `Payment`, `IdempotencyRecord`) and the pure formulas that don't need a
//! store to evaluate: fare/surge pricing (§4.4, §4.5) and the haversine
//! distance shared by the geo index and the trip engine.

pub mod geo;
pub mod models;
pub mod pricing;
