//! Chain sequence widget state

use serde::{Deserialize, Serialize};

use super::fetch::StructureSource;
use super::parser::Structure;
use super::request::normalize_chain;
use super::viewer::LoadState;
use super::{FetchError, ViewError};

const FASTA_LINE_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fasta {
    pub header: String,
    pub sequence: String,
}

impl Fasta {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// FASTA text with the sequence wrapped at 60 columns
    pub fn to_fasta(&self) -> String {
        let mut out = format!(">{}", self.header);
        let chars: Vec<char> = self.sequence.chars().collect();
        for line in chars.chunks(FASTA_LINE_WIDTH) {
            out.push('\n');
            out.extend(line.iter());
        }
        out
    }
}

/// Sequence of one chain of one structure
#[derive(Debug, Clone)]
pub struct SequenceView {
    structure_id: String,
    chain: String,
    generation: u64,
    state: LoadState<Fasta>,
}

impl SequenceView {
    pub fn new(structure_id: &str, chain: &str) -> Self {
        Self {
            structure_id: structure_id.trim().to_string(),
            chain: normalize_chain(chain),
            generation: 1,
            state: LoadState::Loading,
        }
    }

    pub fn structure_id(&self) -> &str {
        &self.structure_id
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &LoadState<Fasta> {
        &self.state
    }

    /// Re-enter `Loading`, invalidating any fetch in flight
    pub fn restart(&mut self) -> u64 {
        self.generation += 1;
        self.state = LoadState::Loading;
        self.generation
    }

    pub fn apply(&mut self, generation: u64, fetched: Result<String, FetchError>) -> bool {
        if generation != self.generation {
            return false;
        }

        let outcome = fetched
            .map_err(ViewError::from)
            .and_then(|text| Structure::from_pdb_str(&text).map_err(ViewError::from))
            .and_then(|structure| self.extract(&structure));

        self.state = match outcome {
            Ok(fasta) => LoadState::Ready(fasta),
            Err(error) => {
                tracing::warn!(
                    "sequence {}:{} failed: {}",
                    self.structure_id,
                    self.chain,
                    error
                );
                LoadState::Failed(error.user_message(&self.structure_id))
            }
        };
        true
    }

    pub async fn load<S: StructureSource>(&mut self, source: &S) -> bool {
        let generation = self.generation;
        let fetched = source.fetch(&self.structure_id).await;
        self.apply(generation, fetched)
    }

    fn extract(&self, structure: &Structure) -> Result<Fasta, ViewError> {
        let sequence = self
            .chain
            .chars()
            .next()
            .filter(|_| self.chain.chars().count() == 1)
            .and_then(|chain| structure.chain_sequence(chain))
            .ok_or_else(|| ViewError::ChainNotFound {
                structure_id: self.structure_id.clone(),
                chain: self.chain.clone(),
            })?;

        Ok(Fasta {
            header: format!("{}:{}", self.structure_id.to_ascii_uppercase(), self.chain),
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::parser::tests::pdb_line;

    fn pdb() -> String {
        [
            "SEQRES   1 A    4  MET LYS ASP XYZ                                          "
                .to_string(),
            pdb_line("ATOM", 1, "CA", "MET", 'A', 1, (0.0, 0.0, 0.0), "C"),
            pdb_line("ATOM", 2, "CA", "GLY", 'B', 1, (5.0, 0.0, 0.0), "C"),
            pdb_line("ATOM", 3, "CA", "TRP", 'B', 2, (9.0, 0.0, 0.0), "C"),
        ]
        .join("\n")
    }

    #[test]
    fn reads_seqres_with_unknowns_as_x() {
        let mut view = SequenceView::new("1abc", "a");
        assert!(view.apply(1, Ok(pdb())));
        match view.state() {
            LoadState::Ready(fasta) => {
                assert_eq!(fasta.header, "1ABC:A");
                assert_eq!(fasta.sequence, "MKDX");
            }
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_observed_residues() {
        let mut view = SequenceView::new("1ABC", "B");
        view.apply(1, Ok(pdb()));
        assert!(matches!(view.state(), LoadState::Ready(f) if f.sequence == "GW"));
    }

    #[test]
    fn missing_chain_is_an_inline_error() {
        let mut view = SequenceView::new("1ABC", "Q");
        view.apply(1, Ok(pdb()));
        match view.state() {
            LoadState::Failed(message) => assert!(message.contains("Chain Q")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn stale_result_is_dropped() {
        let mut view = SequenceView::new("1ABC", "A");
        view.restart();
        assert!(!view.apply(1, Ok(pdb())));
        assert!(view.state().is_loading());
    }

    #[test]
    fn fasta_wraps_long_sequences() {
        let fasta = Fasta {
            header: "X:A".to_string(),
            sequence: "A".repeat(130),
        };
        let text = fasta.to_fasta();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">X:A");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[3].len(), 10);
    }
}
