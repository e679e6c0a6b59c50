//! Technology node identity (C1 support) and scaling tables (C2).

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the eleven process technology nodes the scaling tables and
/// process library are calibrated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TechNode {
    N180,
    N130,
    N90,
    N65,
    N45,
    N32,
    N20,
    N16,
    N14,
    N10,
    N7,
}

impl TechNode {
    pub const ALL: [TechNode; 11] = [
        TechNode::N180,
        TechNode::N130,
        TechNode::N90,
        TechNode::N65,
        TechNode::N45,
        TechNode::N32,
        TechNode::N20,
        TechNode::N16,
        TechNode::N14,
        TechNode::N10,
        TechNode::N7,
    ];

    /// Index into `power_scaling_factors`, over all eleven nodes.
    fn power_index(self) -> usize {
        Self::ALL.iter().position(|n| *n == self).expect("exhaustive")
    }

    /// Index into the 9-node area scaling tables, starting at 90nm.
    fn area_index(self) -> Option<usize> {
        AREA_NODES.iter().position(|n| *n == self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TechNode::N180 => "180nm",
            TechNode::N130 => "130nm",
            TechNode::N90 => "90nm",
            TechNode::N65 => "65nm",
            TechNode::N45 => "45nm",
            TechNode::N32 => "32nm",
            TechNode::N20 => "20nm",
            TechNode::N16 => "16nm",
            TechNode::N14 => "14nm",
            TechNode::N10 => "10nm",
            TechNode::N7 => "7nm",
        }
    }
}

impl fmt::Display for TechNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TechNode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TechNode::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTechNode(s.to_string()))
    }
}

const AREA_NODES: [TechNode; 9] = [
    TechNode::N90,
    TechNode::N65,
    TechNode::N45,
    TechNode::N32,
    TechNode::N20,
    TechNode::N16,
    TechNode::N14,
    TechNode::N10,
    TechNode::N7,
];

/// Logic/analog area scaling factors, `[src][dst]`, over the 90nm..7nm subset.
#[rustfmt::skip]
const AREA_SCALING_FACTORS: [[f64; 9]; 9] = [
    [1.0,  0.53, 0.35, 0.16,  0.075, 0.067, 0.061, 0.036, 0.021],
    [1.9,  1.0,  0.66, 0.31,  0.14,  0.13,  0.12,  0.068, 0.039],
    [2.8,  1.5,  1.0,  0.46,  0.21,  0.19,  0.17,  0.1,   0.059],
    [6.1,  3.3,  2.2,  1.0,   0.46,  0.41,  0.38,  0.22,  0.13],
    [13.0, 7.1,  4.7,  2.2,   1.0,   0.89,  0.82,  0.48,  0.28],
    [15.0, 7.9,  5.3,  2.4,   1.1,   1.0,   0.91,  0.54,  0.31],
    [16.0, 8.7,  5.8,  2.7,   1.2,   1.1,   1.0,   0.59,  0.34],
    [28.0, 15.0, 9.8,  4.5,   2.1,   1.9,   1.7,   1.0,   0.58],
    [48.0, 25.0, 17.0, 7.8,   3.6,   3.2,   2.9,   1.7,   1.0],
];

/// Memory area scaling factors, `[src][dst]`, over the same 9-node subset.
#[rustfmt::skip]
const MEMORY_AREA_SCALING_FACTORS: [[f64; 9]; 9] = [
    [1.0,   0.53, 0.43, 0.19,  0.1,   0.12, 0.1,  0.096, 0.077],
    [1.9,   1.0,  0.836, 0.372, 0.187, 0.238, 0.2,  0.18,  0.143],
    [2.2,   1.18, 1.0,  0.44,  0.22,  0.275, 0.22, 0.21,  0.17],
    [5.1,   2.75, 2.3,  1.0,   0.51,  0.63,  0.53, 0.49,  0.40],
    [9.75,  5.3,  4.47, 1.98,  1.0,   1.22,  1.03, 0.96,  0.77],
    [8.2,   4.3,  3.7,  1.6,   0.8,   1.0,   0.82, 0.79,  0.62],
    [9.6,   5.22, 4.4,  1.9,   0.96,  1.2,   1.0,  0.94,  0.75],
    [10.5,  5.6,  4.6,  2.02,  1.05,  1.3,   1.06, 1.0,   0.798],
    [13.0,  6.8,  5.9,  2.5,   1.3,   1.6,   1.3,  1.2,   1.0],
];

/// Per-inverter dynamic power factor, over all eleven nodes, 180nm..7nm.
const POWER_SCALING_FACTORS: [f64; 11] = [
    105.0, 26.1, 13.0, 8.58, 5.19, 2.47, 1.51, 1.28, 0.995, 0.866, 0.789,
];

/// Area scale factor when moving a block from `src` to `dst`.
pub fn area_scaling_factor(src: TechNode, dst: TechNode, is_memory: bool) -> Result<f64, CoreError> {
    let si = src.area_index().ok_or_else(|| CoreError::UnknownTechNode(src.to_string()))?;
    let di = dst.area_index().ok_or_else(|| CoreError::UnknownTechNode(dst.to_string()))?;
    let table = if is_memory {
        &MEMORY_AREA_SCALING_FACTORS
    } else {
        &AREA_SCALING_FACTORS
    };
    Ok(table[si][di])
}

/// Power scale factor when moving a block from `src` to `dst`.
pub fn power_scaling_factor(src: TechNode, dst: TechNode) -> f64 {
    POWER_SCALING_FACTORS[dst.power_index()] / POWER_SCALING_FACTORS[src.power_index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_eleven_nodes() {
        for n in TechNode::ALL {
            assert_eq!(TechNode::from_str(n.as_str()).unwrap(), n);
        }
    }

    #[test]
    fn unknown_node_is_an_error() {
        assert!(matches!(
            TechNode::from_str("3nm"),
            Err(CoreError::UnknownTechNode(_))
        ));
    }

    #[test]
    fn area_scaling_identity_on_diagonal() {
        for n in AREA_NODES {
            assert_eq!(area_scaling_factor(n, n, false).unwrap(), 1.0);
            assert_eq!(area_scaling_factor(n, n, true).unwrap(), 1.0);
        }
    }

    #[test]
    fn power_scaling_identity() {
        assert_eq!(power_scaling_factor(TechNode::N7, TechNode::N7), 1.0);
    }

    #[test]
    fn area_lookup_outside_subset_fails() {
        assert!(matches!(
            area_scaling_factor(TechNode::N180, TechNode::N90, false),
            Err(CoreError::UnknownTechNode(_))
        ));
    }
}
