//! Persistence layer for the ride-dispatch engine's durable state store (§4.1).
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the transactional multi-row
//!   commits (`assign_ride_atomic`, `end_trip`) that back the matching and
//!   trip-lifecycle flows

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
