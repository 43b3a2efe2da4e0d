//! Error types for Lodestone operations.
//!
//! This module provides the main error type [`LayoutError`]. Configuration
//! problems are reported when a simulation starts, never from inside a tick.

use std::io;

use thiserror::Error;

/// Which end of a link an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEndpoint {
    Source,
    Target,
}

impl std::fmt::Display for LinkEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// The main error type for Lodestone operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Link {link} has {endpoint} index {index}, but the graph has {node_count} nodes")]
    InvalidLink {
        link: usize,
        endpoint: LinkEndpoint,
        index: usize,
        node_count: usize,
    },

    #[error("Invalid value for `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Node {index} does not exist (graph has {node_count} nodes)")]
    UnknownNode { index: usize, node_count: usize },
}

impl From<toml::de::Error> for LayoutError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
