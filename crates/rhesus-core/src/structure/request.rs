use serde::{Deserialize, Serialize};
use std::fmt;

/// A (chain, sequence number) pair naming one residue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResidueLocus {
    pub chain: String,
    pub seq_number: i32,
}

impl ResidueLocus {
    pub fn new(chain: &str, seq_number: i32) -> Self {
        Self {
            chain: normalize_chain(chain),
            seq_number,
        }
    }
}

impl fmt::Display for ResidueLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.seq_number)
    }
}

/// How a structure widget presents its model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresentationMode {
    Cartoon,
    Surface,
    Interaction { chain_a: String, chain_b: String },
    Pocket,
    ResidueQuery(ResidueLocus),
}

impl PresentationMode {
    pub fn label(&self) -> &'static str {
        match self {
            PresentationMode::Cartoon => "cartoon",
            PresentationMode::Surface => "surface",
            PresentationMode::Interaction { .. } => "interaction",
            PresentationMode::Pocket => "pocket",
            PresentationMode::ResidueQuery(_) => "residue-query",
        }
    }

    /// Next mode in the user-facing cycle. Modes that carry chains or a
    /// residue are fixed to the request that created them.
    pub fn cycled(&self) -> Option<PresentationMode> {
        match self {
            PresentationMode::Cartoon => Some(PresentationMode::Surface),
            PresentationMode::Surface => Some(PresentationMode::Pocket),
            PresentationMode::Pocket => Some(PresentationMode::Cartoon),
            PresentationMode::Interaction { .. } | PresentationMode::ResidueQuery(_) => None,
        }
    }
}

/// Inputs for one fetch-and-render cycle of a structure widget
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureRequest {
    pub structure_id: String,
    pub mode: PresentationMode,
}

impl StructureRequest {
    pub fn cartoon(structure_id: &str) -> Self {
        Self::with_mode(structure_id, PresentationMode::Cartoon)
    }

    pub fn surface(structure_id: &str) -> Self {
        Self::with_mode(structure_id, PresentationMode::Surface)
    }

    pub fn pocket(structure_id: &str) -> Self {
        Self::with_mode(structure_id, PresentationMode::Pocket)
    }

    /// Chain identifiers are upper-cased before any lookup
    pub fn interaction(structure_id: &str, chain_a: &str, chain_b: &str) -> Self {
        Self::with_mode(
            structure_id,
            PresentationMode::Interaction {
                chain_a: normalize_chain(chain_a),
                chain_b: normalize_chain(chain_b),
            },
        )
    }

    pub fn residue_query(structure_id: &str, chain: &str, seq_number: i32) -> Self {
        Self::with_mode(
            structure_id,
            PresentationMode::ResidueQuery(ResidueLocus::new(chain, seq_number)),
        )
    }

    pub fn with_mode(structure_id: &str, mode: PresentationMode) -> Self {
        Self {
            structure_id: structure_id.trim().to_string(),
            mode,
        }
    }
}

impl fmt::Display for StructureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mode {
            PresentationMode::Interaction { chain_a, chain_b } => {
                write!(f, "{} interaction {}/{}", self.structure_id, chain_a, chain_b)
            }
            PresentationMode::ResidueQuery(locus) => {
                write!(f, "{} residue {}", self.structure_id, locus)
            }
            mode => write!(f, "{} {}", self.structure_id, mode.label()),
        }
    }
}

pub fn normalize_chain(chain: &str) -> String {
    chain.trim().to_ascii_uppercase()
}
