//! Common utilities shared across gate components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, unverified header parsing)
pub mod jwt;
