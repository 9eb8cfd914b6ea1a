//! PDB parsing into an in-memory structure

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::atom::{one_letter_code, Atom, Residue, ResidueId};
use super::ParseError;

/// In-memory representation of a fetched structure (first model only)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Structure {
    /// Identifier from the HEADER record, if present
    pub id: Option<String>,
    /// Concatenated TITLE records
    pub title: String,
    /// All atoms, in file order
    pub atoms: Vec<Atom>,
    /// All residues, in file order
    pub residues: Vec<Residue>,
    /// SEQRES residue names per chain
    pub seqres: BTreeMap<char, Vec<String>>,
}

impl Structure {
    /// Parse PDB text
    pub fn from_pdb_str(contents: &str) -> Result<Self, ParseError> {
        let mut structure = Structure::default();
        let mut residue_lookup: HashMap<ResidueId, usize> = HashMap::new();
        let mut seen_model = false;

        for (line_index, line) in contents.lines().enumerate() {
            let record = line.get(0..6).unwrap_or(line).trim_end();

            match record {
                "HEADER" => {
                    if let Some(id) = line.get(62..66).and_then(extract_token) {
                        structure.id = Some(id.to_string());
                    }
                    continue;
                }
                "TITLE" => {
                    if let Some(fragment) = line.get(10..).map(str::trim) {
                        if !fragment.is_empty() {
                            if !structure.title.is_empty() {
                                structure.title.push(' ');
                            }
                            structure.title.push_str(fragment);
                        }
                    }
                    continue;
                }
                "SEQRES" => {
                    if let Some(chain) = line.get(11..12).and_then(extract_char) {
                        let names = line
                            .get(19..)
                            .unwrap_or("")
                            .split_whitespace()
                            .map(|name| name.to_ascii_uppercase());
                        structure.seqres.entry(chain).or_default().extend(names);
                    }
                    continue;
                }
                "MODEL" => {
                    // Only the first model is analysed
                    if seen_model {
                        break;
                    }
                    seen_model = true;
                    continue;
                }
                "ENDMDL" => break,
                "ATOM" | "HETATM" => {}
                _ => continue,
            }

            let alt_loc = line.get(16..17).and_then(extract_char);
            if !matches!(alt_loc, None | Some('A')) {
                continue;
            }

            let is_hetatm = record == "HETATM";
            let atom = parse_atom_line(line, is_hetatm).ok_or(ParseError::InvalidAtom {
                line: line_index + 1,
            })?;

            let residue_id = atom.residue_id();
            let residue_index = *residue_lookup.entry(residue_id).or_insert_with(|| {
                structure
                    .residues
                    .push(Residue::new(&atom.residue_name, residue_id, is_hetatm));
                structure.residues.len() - 1
            });

            let atom_index = structure.atoms.len();
            structure.atoms.push(atom);
            if let Some(residue) = structure.residues.get_mut(residue_index) {
                residue.atom_indices.push(atom_index);
            }
        }

        if structure.atoms.is_empty() {
            return Err(ParseError::NoAtoms);
        }

        Ok(structure)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    /// Chain identifiers in order of first appearance
    pub fn chain_ids(&self) -> Vec<char> {
        let mut chains = Vec::new();
        for residue in &self.residues {
            if !chains.contains(&residue.id.chain) {
                chains.push(residue.id.chain);
            }
        }
        chains
    }

    pub fn has_chain(&self, chain: char) -> bool {
        self.residues.iter().any(|r| r.id.chain == chain)
    }

    /// First residue in `chain` with the given sequence number
    pub fn find_residue(&self, chain: char, seq_number: i32) -> Option<&Residue> {
        self.residues
            .iter()
            .find(|r| r.id.chain == chain && r.id.seq_number == seq_number)
    }

    pub fn residue(&self, id: &ResidueId) -> Option<&Residue> {
        self.residues.iter().find(|r| r.id == *id)
    }

    pub fn chain_residues(&self, chain: char) -> impl Iterator<Item = &Residue> {
        self.residues.iter().filter(move |r| r.id.chain == chain)
    }

    /// One-letter sequence of a chain: SEQRES when present, otherwise the
    /// observed non-water residues
    pub fn chain_sequence(&self, chain: char) -> Option<String> {
        if let Some(names) = self.seqres.get(&chain) {
            if !names.is_empty() {
                return Some(names.iter().map(|n| one_letter_code(n)).collect());
            }
        }

        let sequence: String = self
            .chain_residues(chain)
            .filter(|r| !r.is_water() && !r.is_hetatm)
            .map(|r| one_letter_code(&r.name))
            .collect();

        if sequence.is_empty() {
            None
        } else {
            Some(sequence)
        }
    }
}

fn parse_atom_line(line: &str, is_hetatm: bool) -> Option<Atom> {
    let serial = parse_field::<u32>(line, 6..11).unwrap_or(0);
    let name = line.get(12..16)?.trim().to_string();
    let residue_name = line.get(17..20).unwrap_or("UNK").trim().to_ascii_uppercase();
    let chain_id = line.get(21..22).and_then(extract_char).unwrap_or('A');
    let residue_seq = parse_field::<i32>(line, 22..26)?;
    let insertion_code = line.get(26..27).and_then(extract_char);

    let x = parse_field::<f64>(line, 30..38)?;
    let y = parse_field::<f64>(line, 38..46)?;
    let z = parse_field::<f64>(line, 46..54)?;

    let element_field = line.get(76..78).map(str::trim).unwrap_or("");
    let element = resolve_element(element_field, &name);

    Some(Atom {
        serial,
        name,
        residue_name,
        chain_id,
        residue_seq,
        insertion_code,
        coord: [x, y, z],
        element,
        is_hetatm,
    })
}

fn parse_field<T: std::str::FromStr>(line: &str, range: std::ops::Range<usize>) -> Option<T> {
    line.get(range)?.trim().parse::<T>().ok()
}

fn extract_char(slice: &str) -> Option<char> {
    slice.trim().chars().next()
}

fn extract_token(slice: &str) -> Option<&str> {
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn resolve_element(element_field: &str, atom_name: &str) -> String {
    if !element_field.is_empty() {
        return element_field.to_ascii_uppercase();
    }

    // Fall back to the first letter of the atom name ("CA" is carbon alpha,
    // not calcium, in a polymer record)
    atom_name
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Format one fixed-column ATOM/HETATM record
    pub(crate) fn pdb_line(
        record: &str,
        serial: u32,
        name: &str,
        res_name: &str,
        chain_id: char,
        res_seq: i32,
        coords: (f64, f64, f64),
        element: &str,
    ) -> String {
        format!(
            "{:<6}{:>5} {:<4}{:1}{:<3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
            record,
            serial,
            name,
            ' ',
            res_name,
            chain_id,
            res_seq,
            ' ',
            coords.0,
            coords.1,
            coords.2,
            1.0,
            20.0,
            element
        )
    }

    fn test_pdb_string() -> String {
        let mut lines = vec![
            "HEADER    DNA BINDING PROTEIN                     11-JUL-95   1TUP              "
                .to_string(),
            "TITLE     TUMOR SUPPRESSOR P53 COMPLEXED WITH DNA".to_string(),
            "SEQRES   1 A    3  SER LYS GLY                                              "
                .to_string(),
        ];
        lines.push(pdb_line("ATOM", 1, "N", "SER", 'A', 94, (1.0, 0.0, 0.0), "N"));
        lines.push(pdb_line("ATOM", 2, "CA", "SER", 'A', 94, (2.0, 0.0, 0.0), "C"));
        lines.push(pdb_line("ATOM", 3, "NZ", "LYS", 'A', 95, (3.0, 0.0, 0.0), "N"));
        lines.push(pdb_line("ATOM", 4, "OD1", "ASP", 'B', 10, (6.0, 0.0, 0.0), "O"));
        lines.push(pdb_line("HETATM", 5, "O", "HOH", 'B', 301, (9.0, 0.0, 0.0), "O"));
        lines.push("END".to_string());
        lines.join("\n")
    }

    #[test]
    fn parses_metadata_atoms_and_residues() {
        let structure = Structure::from_pdb_str(&test_pdb_string()).expect("parse failed");
        assert_eq!(structure.id.as_deref(), Some("1TUP"));
        assert_eq!(structure.title, "TUMOR SUPPRESSOR P53 COMPLEXED WITH DNA");
        assert_eq!(structure.atom_count(), 5);
        assert_eq!(structure.residue_count(), 4);
        assert_eq!(structure.chain_ids(), vec!['A', 'B']);

        let lys = structure.find_residue('A', 95).expect("LYS 95");
        assert_eq!(lys.name, "LYS");
        assert_eq!(lys.atom_indices, vec![2]);
        assert_eq!(structure.atoms[2].coord, [3.0, 0.0, 0.0]);
        assert_eq!(structure.atoms[2].element, "N");
        assert!(structure.residues[3].is_water());
    }

    #[test]
    fn sequence_prefers_seqres() {
        let structure = Structure::from_pdb_str(&test_pdb_string()).expect("parse failed");
        assert_eq!(structure.chain_sequence('A').as_deref(), Some("SKG"));
        // Chain B has no SEQRES; water is skipped
        assert_eq!(structure.chain_sequence('B').as_deref(), Some("D"));
        assert_eq!(structure.chain_sequence('Z'), None);
    }

    #[test]
    fn only_first_model_is_read() {
        let text = [
            "MODEL        1".to_string(),
            pdb_line("ATOM", 1, "CA", "GLY", 'A', 1, (0.0, 0.0, 0.0), "C"),
            "ENDMDL".to_string(),
            "MODEL        2".to_string(),
            pdb_line("ATOM", 1, "CA", "GLY", 'A', 1, (5.0, 0.0, 0.0), "C"),
            "ENDMDL".to_string(),
        ]
        .join("\n");
        let structure = Structure::from_pdb_str(&text).expect("parse failed");
        assert_eq!(structure.atom_count(), 1);
        assert_eq!(structure.atoms[0].coord[0], 0.0);
    }

    #[test]
    fn empty_or_html_input_is_an_error() {
        assert!(matches!(Structure::from_pdb_str(""), Err(ParseError::NoAtoms)));
        assert!(matches!(
            Structure::from_pdb_str("<html>404 Not Found</html>"),
            Err(ParseError::NoAtoms)
        ));
    }

    #[test]
    fn malformed_coordinates_report_the_line() {
        let text = "HEADER\nATOM      1  CA  GLY A   1      abc     0.000   0.000";
        assert!(matches!(
            Structure::from_pdb_str(text),
            Err(ParseError::InvalidAtom { line: 2 })
        ));
    }

    #[test]
    fn element_falls_back_to_atom_name() {
        assert_eq!(resolve_element("", "CA"), "C");
        assert_eq!(resolve_element("", "1HB"), "H");
        assert_eq!(resolve_element("fe", "FE"), "FE");
    }
}
