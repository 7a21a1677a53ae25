//! Graph-subsystem error type.

use glam::Vec3;
use thiserror::Error;

use nav_core::NodeId;

/// Errors produced by `nav-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("no graph node within reach of {point}")]
    NoNearbyNode { point: Vec3 },

    #[error("no path from {from} to {to}")]
    NoPath { from: NodeId, to: NodeId },

    #[error("node {0} not found in graph")]
    NodeNotFound(NodeId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;
