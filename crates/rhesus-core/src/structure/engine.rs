//! The rendering-engine seam.
//!
//! The viewer never draws anything itself. It describes the scene through
//! [`RenderEngine`] calls, so the analysis can be exercised without a real
//! renderer. [`SceneRecorder`] is the engine the terminal front end uses: it
//! keeps a summary of the scene that can be printed as text.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::atom::ResidueId;
use super::parser::Structure;

/// Atom selection understood by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    All,
    Chain(char),
    Residues(Vec<ResidueId>),
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Chain(chain) => write!(f, "chain {}", chain),
            Selection::Residues(ids) => {
                let labels: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "residues {}", labels.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Coloring {
    /// N-to-C rainbow along each chain
    Spectrum,
    /// One color per chain
    ByChain,
    /// Surface colored by local charge
    Electrostatic,
    /// Surface colored by residue hydrophobicity
    Hydrophobicity,
    /// A fixed CSS-style color
    Fixed(String),
}

impl fmt::Display for Coloring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coloring::Spectrum => f.write_str("spectrum"),
            Coloring::ByChain => f.write_str("by chain"),
            Coloring::Electrostatic => f.write_str("electrostatic"),
            Coloring::Hydrophobicity => f.write_str("hydrophobicity"),
            Coloring::Fixed(color) => f.write_str(color),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    Cartoon,
    Stick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub representation: Representation,
    pub coloring: Coloring,
    pub opacity: f32,
}

impl Style {
    pub fn cartoon(coloring: Coloring) -> Self {
        Self {
            representation: Representation::Cartoon,
            coloring,
            opacity: 1.0,
        }
    }

    pub fn stick(coloring: Coloring) -> Self {
        Self {
            representation: Representation::Stick,
            coloring,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub coloring: Coloring,
    pub opacity: f32,
}

/// Operations a structure renderer must provide
pub trait RenderEngine {
    /// Drop every model, style, surface and label
    fn clear(&mut self);
    fn add_model(&mut self, structure: &Structure);
    fn set_style(&mut self, selection: Selection, style: Style);
    fn add_surface(&mut self, selection: Selection, surface: Surface);
    fn add_labels(&mut self, residues: Vec<ResidueId>);
    fn zoom_to(&mut self, selection: Selection);
    fn render(&mut self);
}

/// A render engine that records the scene instead of drawing it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneRecorder {
    pub model: Option<ModelSummary>,
    pub styles: Vec<(Selection, Style)>,
    pub surfaces: Vec<(Selection, Surface)>,
    pub labels: Vec<ResidueId>,
    pub focus: Option<Selection>,
    pub rendered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub title: String,
    pub chains: Vec<char>,
    pub atoms: usize,
    pub residues: usize,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none()
    }

    /// Human-readable lines describing the scene
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let Some(model) = &self.model else {
            return lines;
        };

        if !model.title.is_empty() {
            lines.push(model.title.clone());
        }
        let chains: Vec<String> = model.chains.iter().map(|c| c.to_string()).collect();
        lines.push(format!(
            "{} atoms, {} residues, chains {}",
            model.atoms,
            model.residues,
            chains.join(", ")
        ));

        for (selection, style) in &self.styles {
            let representation = match style.representation {
                Representation::Cartoon => "cartoon",
                Representation::Stick => "sticks",
            };
            if style.opacity < 1.0 {
                lines.push(format!(
                    "{}: {} ({}, {:.0}% opacity)",
                    selection,
                    representation,
                    style.coloring,
                    style.opacity * 100.0
                ));
            } else {
                lines.push(format!("{}: {} ({})", selection, representation, style.coloring));
            }
        }

        for (selection, surface) in &self.surfaces {
            lines.push(format!(
                "{}: surface ({}, {:.0}% opacity)",
                selection,
                surface.coloring,
                surface.opacity * 100.0
            ));
        }

        if !self.labels.is_empty() {
            lines.push(format!("{} residue labels", self.labels.len()));
        }

        if let Some(focus) = &self.focus {
            lines.push(format!("zoomed to {}", focus));
        }

        lines
    }
}

impl RenderEngine for SceneRecorder {
    fn clear(&mut self) {
        *self = SceneRecorder::default();
    }

    fn add_model(&mut self, structure: &Structure) {
        self.model = Some(ModelSummary {
            title: structure.title.clone(),
            chains: structure.chain_ids(),
            atoms: structure.atom_count(),
            residues: structure.residue_count(),
        });
    }

    fn set_style(&mut self, selection: Selection, style: Style) {
        // A style on everything replaces all earlier styles
        if selection == Selection::All {
            self.styles.clear();
        }
        self.styles.push((selection, style));
    }

    fn add_surface(&mut self, selection: Selection, surface: Surface) {
        self.surfaces.push((selection, surface));
    }

    fn add_labels(&mut self, residues: Vec<ResidueId>) {
        self.labels.extend(residues);
    }

    fn zoom_to(&mut self, selection: Selection) {
        self.focus = Some(selection);
    }

    fn render(&mut self) {
        self.rendered = true;
    }
}
