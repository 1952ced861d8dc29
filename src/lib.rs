//! Yander marketing site backend.
//!
//! Renders content-store documents for the blog and changelog, and forwards
//! waitlist and contact-sales submissions to external destinations.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
