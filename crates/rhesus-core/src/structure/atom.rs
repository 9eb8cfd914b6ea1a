//! Atoms, residues and residue chemistry used by the interaction heuristics

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single atom record from a structure file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Atom serial number
    pub serial: u32,

    /// Atom name (e.g., "CA", "NZ", "OD1")
    pub name: String,

    /// Residue name (e.g., "LYS")
    pub residue_name: String,

    /// Chain identifier
    pub chain_id: char,

    /// Residue sequence number
    pub residue_seq: i32,

    /// Insertion code (PDB column 27)
    pub insertion_code: Option<char>,

    /// Coordinates in Angstroms
    pub coord: [f64; 3],

    /// Element symbol, upper-cased
    pub element: String,

    /// Whether this came from a HETATM record
    pub is_hetatm: bool,
}

impl Atom {
    pub fn is_hydrogen(&self) -> bool {
        self.element == "H" || self.element == "D"
    }

    pub fn is_heavy(&self) -> bool {
        !self.is_hydrogen()
    }

    /// Nitrogen, oxygen or sulfur: the atoms that take part in
    /// hydrogen bonds and salt bridges
    pub fn is_polar_atom(&self) -> bool {
        matches!(self.element.as_str(), "N" | "O" | "S")
    }

    pub fn residue_id(&self) -> ResidueId {
        ResidueId {
            chain: self.chain_id,
            seq_number: self.residue_seq,
            insertion_code: self.insertion_code,
        }
    }
}

/// Identity of a residue within one model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResidueId {
    pub chain: char,
    pub seq_number: i32,
    pub insertion_code: Option<char>,
}

impl fmt::Display for ResidueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.seq_number)?;
        if let Some(code) = self.insertion_code {
            write!(f, "{}", code)?;
        }
        Ok(())
    }
}

/// A residue and the indices of its atoms in [`super::Structure::atoms`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Residue {
    pub name: String,
    pub id: ResidueId,
    pub is_hetatm: bool,
    pub atom_indices: Vec<usize>,
}

impl Residue {
    pub fn new(name: &str, id: ResidueId, is_hetatm: bool) -> Self {
        Self {
            name: name.trim().to_ascii_uppercase(),
            id,
            is_hetatm,
            atom_indices: Vec::new(),
        }
    }

    pub fn is_water(&self) -> bool {
        is_water(&self.name)
    }

    /// Short label such as `ARG248`
    pub fn label(&self) -> String {
        match self.id.insertion_code {
            Some(code) => format!("{}{}{}", self.name, self.id.seq_number, code),
            None => format!("{}{}", self.name, self.id.seq_number),
        }
    }
}

/// Formal side-chain charge at neutral pH
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    Positive,
    Negative,
}

pub fn residue_charge(residue_name: &str) -> Option<Charge> {
    match residue_name {
        "ARG" | "LYS" | "HIS" => Some(Charge::Positive),
        "ASP" | "GLU" => Some(Charge::Negative),
        _ => None,
    }
}

/// Polar side chains, including the charged ones
pub fn is_polar_residue(residue_name: &str) -> bool {
    residue_charge(residue_name).is_some()
        || matches!(
            residue_name,
            "SER" | "THR" | "ASN" | "GLN" | "TYR" | "CYS" | "HIS" | "TRP"
        )
}

pub fn is_water(residue_name: &str) -> bool {
    matches!(residue_name, "HOH" | "WAT" | "DOD" | "H2O")
}

/// One-letter code for a residue name; `X` when unknown
pub fn one_letter_code(residue_name: &str) -> char {
    match residue_name {
        "ALA" => 'A',
        "ARG" => 'R',
        "ASN" => 'N',
        "ASP" => 'D',
        "CYS" => 'C',
        "GLN" => 'Q',
        "GLU" => 'E',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" => 'K',
        "MET" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        "SEC" => 'U',
        "PYL" => 'O',
        "MSE" => 'M',
        // Nucleotides
        "DA" | "A" => 'A',
        "DC" | "C" => 'C',
        "DG" | "G" => 'G',
        "DT" => 'T',
        "U" => 'U',
        _ => 'X',
    }
}

/// Compute distance between two 3D points
pub fn distance(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
    distance_squared(p1, p2).sqrt()
}

/// Compute distance squared (avoids sqrt for threshold checks)
pub fn distance_squared(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
    (p1[0] - p2[0]).powi(2) + (p1[1] - p2[1]).powi(2) + (p1[2] - p2[2]).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charged_residues_are_polar() {
        for name in ["ARG", "LYS", "HIS", "ASP", "GLU"] {
            assert!(is_polar_residue(name), "{name}");
        }
        assert!(!is_polar_residue("LEU"));
        assert!(!is_polar_residue("GLY"));
    }

    #[test]
    fn charge_signs() {
        assert_eq!(residue_charge("LYS"), Some(Charge::Positive));
        assert_eq!(residue_charge("GLU"), Some(Charge::Negative));
        assert_eq!(residue_charge("SER"), None);
    }

    #[test]
    fn distance_is_euclidean() {
        let d = distance(&[0.0, 0.0, 0.0], &[1.0, 2.0, 2.0]);
        assert!((d - 3.0).abs() < 1e-12);
    }

    #[test]
    fn residue_id_display_includes_insertion_code() {
        let id = ResidueId {
            chain: 'A',
            seq_number: 52,
            insertion_code: Some('B'),
        };
        assert_eq!(id.to_string(), "A:52B");
    }
}
