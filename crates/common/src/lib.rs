//! Common utilities and types shared across Shield components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT pre-validation utilities (size, header, time claims)
pub mod jwt;
