//! Lodestone Core Types
//!
//! This crate provides the foundational value types for the Lodestone force
//! layout engine. It includes:
//!
//! - **Geometry**: Points, viewport sizes and square extents ([`geometry`] module)
//! - **Pins**: Independent reasons a node is held in place ([`pin::Pins`])

pub mod geometry;
pub mod pin;
