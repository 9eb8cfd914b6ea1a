//! Structure retrieval, parsing, analysis and presentation

pub mod atom;
pub mod engine;
pub mod fetch;
pub mod interaction;
pub mod parser;
pub mod request;
pub mod sequence;
pub mod viewer;

use thiserror::Error;

pub use engine::{RenderEngine, SceneRecorder, Selection};
pub use fetch::{RcsbClient, StructureSource};
pub use interaction::{ChainInteraction, Classification, InteractionFinding};
pub use parser::Structure;
pub use request::{normalize_chain, PresentationMode, ResidueLocus, StructureRequest};
pub use sequence::{Fasta, SequenceView};
pub use viewer::{LoadState, StructureViewer, ViewReport};

/// Failure to obtain structure text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("'{0}' is not a valid structure identifier")]
    InvalidId(String),

    #[error("structure {id} request failed with HTTP {status}")]
    Status { id: String, status: u16 },

    #[error("structure {id} request failed: {message}")]
    Network { id: String, message: String },
}

/// Structure text that could not be read as PDB
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no atom records found")]
    NoAtoms,

    #[error("malformed atom record on line {line}")]
    InvalidAtom { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("residue {locus} not found in {structure_id}")]
    ResidueNotFound {
        structure_id: String,
        locus: ResidueLocus,
    },

    #[error("chain {chain} not found in {structure_id}")]
    ChainNotFound { structure_id: String, chain: String },
}

impl ViewError {
    /// Text shown inside the failed widget
    pub fn user_message(&self, structure_id: &str) -> String {
        match self {
            ViewError::Fetch(_) | ViewError::Parse(_) => format!(
                "Could not load PDB structure for ID: {}. Please ensure it's a valid ID.",
                structure_id
            ),
            ViewError::ResidueNotFound { locus, .. } => format!(
                "Residue {} was not found in structure {}.",
                locus, structure_id
            ),
            ViewError::ChainNotFound { chain, .. } => format!(
                "Chain {} was not found in structure {}.",
                chain, structure_id
            ),
        }
    }
}
