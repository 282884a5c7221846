use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{EdgeTypeId, TraverseError};

/// Edge orientation followed by one hop.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges whose source is the current vertex.
    Out,
    /// Follow edges whose target is the current vertex.
    In,
    /// Intended to follow both orientations. Only the outgoing range is
    /// scanned; incoming edges are not merged in.
    Both,
}

impl Direction {
    /// Whether the hop scans the outgoing edge range.
    ///
    /// `Both` aliases `Out`.
    pub fn scans_outgoing(self) -> bool {
        match self {
            Direction::Out | Direction::Both => true,
            Direction::In => false,
        }
    }

    /// Orientation label used in metrics and logs.
    pub fn scan_label(self) -> &'static str {
        if self.scans_outgoing() {
            "out"
        } else {
            "in"
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => write!(f, "out"),
            Direction::In => write!(f, "in"),
            Direction::Both => write!(f, "both"),
        }
    }
}

impl FromStr for Direction {
    type Err = TraverseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "out" => Ok(Direction::Out),
            "in" => Ok(Direction::In),
            "both" => Ok(Direction::Both),
            _ => Err(TraverseError::Invalid("direction must be out, in or both")),
        }
    }
}

/// One hop of the condition chain: which edge type to follow and in which direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Edge type followed by this hop.
    pub edge_type: EdgeTypeId,
    /// Orientation followed by this hop.
    pub direction: Direction,
}

impl Condition {
    /// Creates a hop condition.
    pub fn new(edge_type: EdgeTypeId, direction: Direction) -> Self {
        Self {
            edge_type,
            direction,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.edge_type, self.direction)
    }
}

/// Parses `"<edge type>:<direction>"`, e.g. `"7:out"`.
impl FromStr for Condition {
    type Err = TraverseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, dir) = s
            .split_once(':')
            .ok_or(TraverseError::Invalid("hop must look like <edge type>:<direction>"))?;
        let edge_type = ty
            .trim()
            .parse::<i64>()
            .map_err(|_| TraverseError::Invalid("edge type must be an integer"))?;
        Ok(Condition::new(EdgeTypeId(edge_type), dir.parse()?))
    }
}
