//! Core types and utilities shared by the scenegex crates.
//!
//! This crate provides the math primitives used by the scene snapshot and
//! the exporter, and the unified error type.

pub mod error;
pub mod math;

pub use error::{Error, Result};
pub use math::{Mat4, Quat, Vec2, Vec3, Vec4, EPSILON};
