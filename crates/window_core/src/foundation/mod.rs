//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Geometry value types (points, sizes, rectangles, insets)
//! - Time sources
//! - Logging utilities

pub mod geometry;
pub mod time;
pub mod logging;
