//! Distance-based interaction analysis between chains and around residues.
//!
//! All distances are Euclidean, in Angstroms, over heavy atoms. Waters never
//! take part.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::atom::{
    distance_squared, is_polar_residue, residue_charge, Atom, Residue, ResidueId,
};
use super::parser::Structure;

/// Atom-pair cutoff for inter-chain contacts
pub const CONTACT_CUTOFF: f64 = 4.5;
/// Radius around a queried residue
pub const NEIGHBOR_RADIUS: f64 = 5.0;
/// Charged heavy atoms of opposite sign closer than this form a salt bridge
pub const SALT_BRIDGE_CUTOFF: f64 = 5.0;
/// Polar N/O/S atom pairs between polar residues within this may hydrogen bond
pub const HBOND_CUTOFF: f64 = 3.5;

/// Heuristic interaction type, ordered from weakest to strongest evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Classification {
    VanDerWaals,
    PolarContact,
    HydrogenBond,
    SaltBridge,
}

impl Classification {
    pub fn description(&self) -> &'static str {
        match self {
            Classification::VanDerWaals => "van der Waals contact",
            Classification::PolarContact => "polar contact",
            Classification::HydrogenBond => "potential hydrogen bond",
            Classification::SaltBridge => "potential salt bridge",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A residue as it appears in analysis output
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResidueRef {
    pub id: ResidueId,
    pub name: String,
}

impl ResidueRef {
    fn of(residue: &Residue) -> Self {
        Self {
            id: residue.id,
            name: residue.name.clone(),
        }
    }
}

impl fmt::Display for ResidueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({})", self.name, self.id.seq_number, self.id.chain)?;
        if let Some(code) = self.id.insertion_code {
            write!(f, " ins {}", code)?;
        }
        Ok(())
    }
}

/// One residue-residue interaction, reported at its closest atom pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionFinding {
    pub residue_a: ResidueRef,
    pub residue_b: ResidueRef,
    pub distance: f64,
    pub classification: Classification,
}

impl fmt::Display for InteractionFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {:.2} Å, {}",
            self.residue_a, self.residue_b, self.distance, self.classification
        )
    }
}

/// Contacts between two chains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainInteraction {
    pub chain_a: char,
    pub chain_b: char,
    /// Sorted, de-duplicated interacting residues of chain A
    pub residues_a: Vec<ResidueRef>,
    /// Sorted, de-duplicated interacting residues of chain B
    pub residues_b: Vec<ResidueRef>,
    /// One finding per residue pair, sorted by residue A then residue B
    pub findings: Vec<InteractionFinding>,
}

impl ChainInteraction {
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Classify one atom pair from residue chemistry and distance
pub fn classify(
    residue_a: &str,
    atom_a: &Atom,
    residue_b: &str,
    atom_b: &Atom,
    distance: f64,
) -> Classification {
    // Both atoms are heavy here; only the hydrogen bond looks at the atoms
    if let (Some(charge_a), Some(charge_b)) = (residue_charge(residue_a), residue_charge(residue_b)) {
        if charge_a != charge_b && distance < SALT_BRIDGE_CUTOFF {
            return Classification::SaltBridge;
        }
    }

    if is_polar_residue(residue_a) && is_polar_residue(residue_b) {
        let polar_atoms = atom_a.is_polar_atom() && atom_b.is_polar_atom();
        if polar_atoms && distance <= HBOND_CUTOFF {
            return Classification::HydrogenBond;
        }
        return Classification::PolarContact;
    }

    Classification::VanDerWaals
}

/// Closest distance and strongest classification seen for a residue pair
#[derive(Default)]
struct PairAccumulator {
    pairs: HashMap<(usize, usize), (f64, Classification)>,
}

impl PairAccumulator {
    fn record(&mut self, key: (usize, usize), distance: f64, classification: Classification) {
        self.pairs
            .entry(key)
            .and_modify(|(best_distance, best_class)| {
                if distance < *best_distance {
                    *best_distance = distance;
                }
                if classification > *best_class {
                    *best_class = classification;
                }
            })
            .or_insert((distance, classification));
    }
}

fn residue_atoms<'a>(
    structure: &'a Structure,
    residue: &'a Residue,
) -> impl Iterator<Item = &'a Atom> + 'a {
    residue
        .atom_indices
        .iter()
        .filter_map(|&idx| structure.atoms.get(idx))
        .filter(|atom| atom.is_heavy())
}

/// Record every heavy-atom pair of two residues within `cutoff`
fn compare_residues(
    structure: &Structure,
    (index_a, residue_a): (usize, &Residue),
    (index_b, residue_b): (usize, &Residue),
    cutoff: f64,
    accumulator: &mut PairAccumulator,
) {
    let cutoff_sq = cutoff * cutoff;
    for atom_a in residue_atoms(structure, residue_a) {
        for atom_b in residue_atoms(structure, residue_b) {
            let d_sq = distance_squared(&atom_a.coord, &atom_b.coord);
            if d_sq <= cutoff_sq {
                let distance = d_sq.sqrt();
                let class = classify(&residue_a.name, atom_a, &residue_b.name, atom_b, distance);
                accumulator.record((index_a, index_b), distance, class);
            }
        }
    }
}

fn analysable(residue: &Residue) -> bool {
    !residue.is_water()
}

/// All residue contacts between `chain_a` and `chain_b` within `cutoff`.
///
/// A chain compared with itself yields no contacts.
pub fn chain_contacts(
    structure: &Structure,
    chain_a: char,
    chain_b: char,
    cutoff: f64,
) -> ChainInteraction {
    let mut accumulator = PairAccumulator::default();

    if chain_a != chain_b {
        let side_a: Vec<(usize, &Residue)> = structure
            .residues
            .iter()
            .enumerate()
            .filter(|(_, r)| r.id.chain == chain_a && analysable(r))
            .collect();
        let side_b: Vec<(usize, &Residue)> = structure
            .residues
            .iter()
            .enumerate()
            .filter(|(_, r)| r.id.chain == chain_b && analysable(r))
            .collect();

        for &a in &side_a {
            for &b in &side_b {
                compare_residues(structure, a, b, cutoff, &mut accumulator);
            }
        }
    }

    let mut residues_a = BTreeSet::new();
    let mut residues_b = BTreeSet::new();
    let mut findings: Vec<InteractionFinding> = accumulator
        .pairs
        .into_iter()
        .map(|((index_a, index_b), (distance, classification))| {
            let residue_a = ResidueRef::of(&structure.residues[index_a]);
            let residue_b = ResidueRef::of(&structure.residues[index_b]);
            residues_a.insert(residue_a.clone());
            residues_b.insert(residue_b.clone());
            InteractionFinding {
                residue_a,
                residue_b,
                distance,
                classification,
            }
        })
        .collect();

    findings.sort_by(|x, y| {
        x.residue_a
            .cmp(&y.residue_a)
            .then_with(|| x.residue_b.cmp(&y.residue_b))
    });

    ChainInteraction {
        chain_a,
        chain_b,
        residues_a: residues_a.into_iter().collect(),
        residues_b: residues_b.into_iter().collect(),
        findings,
    }
}

/// Residues with any heavy atom within `radius` of the target residue,
/// nearest first, one entry per residue.
///
/// Returns `None` when the target residue is not in the structure.
pub fn residue_neighbors(
    structure: &Structure,
    target: &ResidueId,
    radius: f64,
) -> Option<Vec<InteractionFinding>> {
    let target_index = structure.residues.iter().position(|r| r.id == *target)?;
    let target_residue = &structure.residues[target_index];
    let mut accumulator = PairAccumulator::default();

    for (index, residue) in structure.residues.iter().enumerate() {
        if index == target_index || !analysable(residue) {
            continue;
        }
        compare_residues(
            structure,
            (target_index, target_residue),
            (index, residue),
            radius,
            &mut accumulator,
        );
    }

    let anchor = ResidueRef::of(target_residue);
    let mut findings: Vec<InteractionFinding> = accumulator
        .pairs
        .into_iter()
        .map(|((_, index), (distance, classification))| InteractionFinding {
            residue_a: anchor.clone(),
            residue_b: ResidueRef::of(&structure.residues[index]),
            distance,
            classification,
        })
        .collect();

    findings.sort_by(|x, y| {
        x.distance
            .total_cmp(&y.distance)
            .then_with(|| x.residue_b.cmp(&y.residue_b))
    });

    Some(findings)
}
