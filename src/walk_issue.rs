// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::NodeError;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueSeverity {
    // the node is in the tree, but some of its details are missing
    Degraded,
    // the device did not answer (typically because it is suspended) and is not in the tree
    Skipped,
    // the node and everything below it are missing from the tree; its siblings are unaffected
    SubtreeAborted,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Degraded => f.write_str("degraded"),
            IssueSeverity::Skipped => f.write_str("skipped"),
            IssueSeverity::SubtreeAborted => f.write_str("subtree aborted"),
        }
    }
}

/// Where in the topology a problem occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeLocation {
    pub host_controller: String,
    pub hub_name: Option<String>,
    pub port: Option<u32>,
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host_controller)?;
        if let Some(hub_name) = &self.hub_name {
            write!(f, " > {}", hub_name)?;
        }
        if let Some(port) = self.port {
            write!(f, " > [Port{}]", port)?;
        }
        Ok(())
    }
}

/// A per-node failure which the walk recovered from.
#[derive(Debug)]
pub struct WalkIssue {
    pub location: NodeLocation,
    pub severity: IssueSeverity,
    pub error: NodeError,
}

impl fmt::Display for WalkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.location, self.severity, self.error)
    }
}
