//! Structure Viewer Adapter: one fetch-and-render cycle per request.
//!
//! Each change of inputs bumps a generation counter and re-enters
//! `Loading`; a fetch result carrying an older generation is ignored.

use serde::{Deserialize, Serialize};

use super::atom::ResidueId;
use super::engine::{Coloring, RenderEngine, Selection, Style, Surface};
use super::fetch::StructureSource;
use super::interaction::{
    chain_contacts, residue_neighbors, ChainInteraction, InteractionFinding, ResidueRef,
    CONTACT_CUTOFF, NEIGHBOR_RADIUS,
};
use super::parser::Structure;
use super::request::{PresentationMode, ResidueLocus, StructureRequest};
use super::{FetchError, ViewError};

const CHAIN_A_COLOR: &str = "#67e8f9";
const CHAIN_B_COLOR: &str = "#f472b6";
const CONTEXT_COLOR: &str = "lightgray";
const TARGET_COLOR: &str = "#facc15";

pub const SURFACE_CAPTION: &str =
    "Molecular surface colored by electrostatic potential (red negative, blue positive).";
pub const POCKET_CAPTION: &str = "Solid molecular surface with a hydrophobicity overlay. \
Hydrophobic patches (orange) in concave regions mark candidate binding pockets.";

/// Lifecycle of an asynchronously loaded widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// What a finished render reports next to the scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewReport {
    /// Explanatory note shown under the viewer
    pub caption: Option<String>,
    /// Inter-chain contacts (interaction mode)
    pub interaction: Option<ChainInteraction>,
    /// Queried residue (residue-query mode)
    pub target: Option<ResidueRef>,
    /// Neighbors of the queried residue, nearest first
    pub neighbors: Vec<InteractionFinding>,
}

pub type ViewerState = LoadState<ViewReport>;

#[derive(Debug, Clone)]
pub struct StructureViewer {
    request: StructureRequest,
    generation: u64,
    state: ViewerState,
}

impl StructureViewer {
    /// A viewer starts in `Loading` for generation 1
    pub fn new(request: StructureRequest) -> Self {
        Self {
            request,
            generation: 1,
            state: LoadState::Loading,
        }
    }

    pub fn request(&self) -> &StructureRequest {
        &self.request
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Replace the request. When the inputs differ, the previous render is
    /// torn down and the new generation to fetch is returned.
    pub fn set_request(
        &mut self,
        request: StructureRequest,
        engine: &mut dyn RenderEngine,
    ) -> Option<u64> {
        if request == self.request {
            return None;
        }
        self.request = request;
        Some(self.restart(engine))
    }

    /// Re-enter `Loading` for the current request
    pub fn restart(&mut self, engine: &mut dyn RenderEngine) -> u64 {
        self.generation += 1;
        self.state = LoadState::Loading;
        engine.clear();
        self.generation
    }

    /// Apply a fetch outcome. Returns `false` when the outcome belongs to a
    /// superseded request and was ignored.
    pub fn apply(
        &mut self,
        generation: u64,
        fetched: Result<String, FetchError>,
        engine: &mut dyn RenderEngine,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "ignoring stale structure result for {} (generation {} < {})",
                self.request.structure_id,
                generation,
                self.generation
            );
            return false;
        }

        engine.clear();
        let outcome = fetched
            .map_err(ViewError::from)
            .and_then(|text| Structure::from_pdb_str(&text).map_err(ViewError::from))
            .and_then(|structure| present(&structure, &self.request, engine));

        self.state = match outcome {
            Ok(report) => LoadState::Ready(report),
            Err(error) => {
                tracing::warn!("structure view {} failed: {}", self.request, error);
                engine.clear();
                LoadState::Failed(error.user_message(&self.request.structure_id))
            }
        };
        true
    }

    /// Fetch the current request from `source` and apply it
    pub async fn load<S: StructureSource>(
        &mut self,
        source: &S,
        engine: &mut dyn RenderEngine,
    ) -> bool {
        let generation = self.generation;
        let fetched = source.fetch(&self.request.structure_id).await;
        self.apply(generation, fetched, engine)
    }
}

/// Configure `engine` for the request's presentation mode and run the
/// geometric analysis it needs
pub fn present(
    structure: &Structure,
    request: &StructureRequest,
    engine: &mut dyn RenderEngine,
) -> Result<ViewReport, ViewError> {
    match &request.mode {
        PresentationMode::Cartoon => {
            engine.add_model(structure);
            engine.set_style(Selection::All, Style::cartoon(Coloring::Spectrum));
            engine.zoom_to(Selection::All);
            engine.render();
            Ok(ViewReport::default())
        }
        PresentationMode::Surface => {
            engine.add_model(structure);
            engine.set_style(Selection::All, Style::cartoon(Coloring::ByChain));
            engine.add_surface(
                Selection::All,
                Surface {
                    coloring: Coloring::Electrostatic,
                    opacity: 0.9,
                },
            );
            engine.zoom_to(Selection::All);
            engine.render();
            Ok(ViewReport {
                caption: Some(SURFACE_CAPTION.to_string()),
                ..ViewReport::default()
            })
        }
        PresentationMode::Pocket => {
            engine.add_model(structure);
            engine.set_style(
                Selection::All,
                Style::cartoon(Coloring::Fixed(CONTEXT_COLOR.to_string())).with_opacity(0.6),
            );
            engine.add_surface(
                Selection::All,
                Surface {
                    coloring: Coloring::Fixed("white".to_string()),
                    opacity: 0.35,
                },
            );
            engine.add_surface(
                Selection::All,
                Surface {
                    coloring: Coloring::Hydrophobicity,
                    opacity: 0.8,
                },
            );
            engine.zoom_to(Selection::All);
            engine.render();
            Ok(ViewReport {
                caption: Some(POCKET_CAPTION.to_string()),
                ..ViewReport::default()
            })
        }
        PresentationMode::Interaction { chain_a, chain_b } => {
            Ok(present_interaction(structure, chain_a, chain_b, engine))
        }
        PresentationMode::ResidueQuery(locus) => {
            present_residue_query(structure, &request.structure_id, locus, engine)
        }
    }
}

fn chain_char(chain: &str) -> Option<char> {
    let mut chars = chain.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

fn present_interaction(
    structure: &Structure,
    chain_a: &str,
    chain_b: &str,
    engine: &mut dyn RenderEngine,
) -> ViewReport {
    let chains = chain_char(chain_a)
        .zip(chain_char(chain_b))
        .filter(|(a, b)| structure.has_chain(*a) && structure.has_chain(*b));

    let interaction = chains.map(|(a, b)| chain_contacts(structure, a, b, CONTACT_CUTOFF));

    engine.add_model(structure);
    engine.set_style(
        Selection::All,
        Style::cartoon(Coloring::Fixed(CONTEXT_COLOR.to_string())).with_opacity(0.4),
    );

    let Some(interaction) = interaction.filter(|i| !i.is_empty()) else {
        // Never leave an empty, unexplained viewport
        let note = match chains {
            None => format!(
                "Chains {} and {} are not both present in this structure; showing all chains.",
                chain_a, chain_b
            ),
            Some(_) => format!(
                "No atoms of chains {} and {} come within {} Å of each other; showing both chains in full.",
                chain_a, chain_b, CONTACT_CUTOFF
            ),
        };
        if let Some((a, b)) = chains {
            engine.set_style(
                Selection::Chain(a),
                Style::cartoon(Coloring::Fixed(CHAIN_A_COLOR.to_string())),
            );
            engine.set_style(
                Selection::Chain(b),
                Style::cartoon(Coloring::Fixed(CHAIN_B_COLOR.to_string())),
            );
        } else {
            engine.set_style(Selection::All, Style::cartoon(Coloring::ByChain));
        }
        engine.zoom_to(Selection::All);
        engine.render();
        return ViewReport {
            caption: Some(note),
            ..ViewReport::default()
        };
    };

    let ids_a: Vec<ResidueId> = interaction.residues_a.iter().map(|r| r.id).collect();
    let ids_b: Vec<ResidueId> = interaction.residues_b.iter().map(|r| r.id).collect();

    engine.set_style(
        Selection::Residues(ids_a.clone()),
        Style::stick(Coloring::Fixed(CHAIN_A_COLOR.to_string())),
    );
    engine.set_style(
        Selection::Residues(ids_b.clone()),
        Style::stick(Coloring::Fixed(CHAIN_B_COLOR.to_string())),
    );

    let mut interface: Vec<ResidueId> = ids_a;
    interface.extend(ids_b);
    engine.add_labels(interface.clone());
    engine.zoom_to(Selection::Residues(interface));
    engine.render();

    let caption = format!(
        "{} residue contacts between chains {} and {} within {} Å",
        interaction.findings.len(),
        interaction.chain_a,
        interaction.chain_b,
        CONTACT_CUTOFF
    );

    ViewReport {
        caption: Some(caption),
        interaction: Some(interaction),
        ..ViewReport::default()
    }
}

fn present_residue_query(
    structure: &Structure,
    structure_id: &str,
    locus: &ResidueLocus,
    engine: &mut dyn RenderEngine,
) -> Result<ViewReport, ViewError> {
    // Resolve the residue before touching the engine: no partial render
    let target = chain_char(&locus.chain)
        .and_then(|chain| structure.find_residue(chain, locus.seq_number))
        .ok_or_else(|| ViewError::ResidueNotFound {
            structure_id: structure_id.to_string(),
            locus: locus.clone(),
        })?;

    let neighbors = residue_neighbors(structure, &target.id, NEIGHBOR_RADIUS).unwrap_or_default();
    let target_ref = ResidueRef {
        id: target.id,
        name: target.name.clone(),
    };

    engine.add_model(structure);
    engine.set_style(
        Selection::All,
        Style::cartoon(Coloring::Fixed(CONTEXT_COLOR.to_string())).with_opacity(0.6),
    );
    engine.set_style(
        Selection::Residues(vec![target.id]),
        Style::stick(Coloring::Fixed(TARGET_COLOR.to_string())),
    );

    let neighbor_ids: Vec<ResidueId> = neighbors.iter().map(|n| n.residue_b.id).collect();
    if !neighbor_ids.is_empty() {
        engine.set_style(
            Selection::Residues(neighbor_ids.clone()),
            Style::stick(Coloring::Fixed(CHAIN_A_COLOR.to_string())),
        );
    }

    let mut focus = vec![target.id];
    focus.extend(neighbor_ids);
    engine.add_labels(focus.clone());
    engine.zoom_to(Selection::Residues(focus));
    engine.render();

    let caption = format!(
        "{} residues within {} Å of {}",
        neighbors.len(),
        NEIGHBOR_RADIUS,
        target_ref
    );

    Ok(ViewReport {
        caption: Some(caption),
        target: Some(target_ref),
        neighbors,
        ..ViewReport::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::engine::SceneRecorder;
    use crate::structure::interaction::Classification;
    use crate::structure::parser::tests::pdb_line;

    fn two_chain_pdb() -> String {
        [
            "HEADER    TEST                                            01-JAN-00   1TUP"
                .to_string(),
            pdb_line("ATOM", 1, "NZ", "LYS", 'A', 120, (0.0, 0.0, 0.0), "N"),
            pdb_line("ATOM", 2, "CB", "LEU", 'A', 121, (0.0, 20.0, 0.0), "C"),
            pdb_line("ATOM", 3, "OE1", "GLU", 'B', 40, (3.0, 0.0, 0.0), "O"),
            pdb_line("ATOM", 4, "CB", "ALA", 'B', 41, (10.0, 0.0, 0.0), "C"),
        ]
        .join("\n")
    }

    fn far_apart_pdb() -> String {
        [
            pdb_line("ATOM", 1, "CB", "LEU", 'A', 1, (0.0, 0.0, 0.0), "C"),
            pdb_line("ATOM", 2, "CB", "VAL", 'B', 1, (30.0, 0.0, 0.0), "C"),
        ]
        .join("\n")
    }

    #[test]
    fn interaction_lists_both_contact_residues() {
        let mut viewer = StructureViewer::new(StructureRequest::interaction("1TUP", "a", "b"));
        let mut scene = SceneRecorder::new();

        assert!(viewer.apply(1, Ok(two_chain_pdb()), &mut scene));

        let LoadState::Ready(report) = viewer.state() else {
            panic!("expected ready, got {:?}", viewer.state());
        };
        let interaction = report.interaction.as_ref().expect("contacts");
        assert_eq!(interaction.residues_a.len(), 1);
        assert_eq!(interaction.residues_a[0].name, "LYS");
        assert_eq!(interaction.residues_b.len(), 1);
        assert_eq!(interaction.residues_b[0].name, "GLU");
        assert_eq!(interaction.findings[0].classification, Classification::SaltBridge);

        assert!(scene.rendered);
        assert_eq!(scene.labels.len(), 2);
        assert!(matches!(scene.focus, Some(Selection::Residues(ref ids)) if ids.len() == 2));
    }

    #[test]
    fn interaction_without_contacts_falls_back_to_both_chains() {
        let mut viewer = StructureViewer::new(StructureRequest::interaction("XXXX", "A", "B"));
        let mut scene = SceneRecorder::new();
        viewer.apply(1, Ok(far_apart_pdb()), &mut scene);

        let LoadState::Ready(report) = viewer.state() else {
            panic!("expected ready");
        };
        assert!(report.interaction.is_none());
        assert!(report.caption.as_deref().unwrap_or("").contains("showing both chains"));
        assert!(scene
            .styles
            .iter()
            .any(|(selection, _)| *selection == Selection::Chain('A')));
        assert!(scene
            .styles
            .iter()
            .any(|(selection, _)| *selection == Selection::Chain('B')));
        assert!(scene.rendered);
    }

    #[test]
    fn interaction_with_missing_chain_explains_itself() {
        let mut viewer = StructureViewer::new(StructureRequest::interaction("XXXX", "A", "Q"));
        let mut scene = SceneRecorder::new();
        viewer.apply(1, Ok(far_apart_pdb()), &mut scene);

        let LoadState::Ready(report) = viewer.state() else {
            panic!("expected ready");
        };
        assert!(report.caption.as_deref().unwrap_or("").contains("not both present"));
        assert!(scene.rendered);
    }

    #[test]
    fn missing_residue_fails_without_rendering() {
        let mut viewer = StructureViewer::new(StructureRequest::residue_query("1TUP", "A", 999));
        let mut scene = SceneRecorder::new();
        viewer.apply(1, Ok(two_chain_pdb()), &mut scene);

        match viewer.state() {
            LoadState::Failed(message) => assert!(message.contains("A:999"), "{message}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(scene.is_empty());
        assert!(!scene.rendered);
    }

    #[test]
    fn residue_query_lists_neighbors() {
        let mut viewer = StructureViewer::new(StructureRequest::residue_query("1TUP", "a", 120));
        let mut scene = SceneRecorder::new();
        viewer.apply(1, Ok(two_chain_pdb()), &mut scene);

        let LoadState::Ready(report) = viewer.state() else {
            panic!("expected ready, got {:?}", viewer.state());
        };
        assert_eq!(report.target.as_ref().map(|t| t.name.as_str()), Some("LYS"));
        assert_eq!(report.neighbors.len(), 1);
        assert_eq!(report.neighbors[0].residue_b.name, "GLU");
    }

    #[test]
    fn fetch_failure_becomes_inline_error() {
        let mut viewer = StructureViewer::new(StructureRequest::cartoon("ZZZZ"));
        let mut scene = SceneRecorder::new();
        viewer.apply(
            1,
            Err(FetchError::Status {
                id: "ZZZZ".to_string(),
                status: 404,
            }),
            &mut scene,
        );
        match viewer.state() {
            LoadState::Failed(message) => assert!(message.contains("ZZZZ")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn stale_results_are_ignored() {
        let mut viewer = StructureViewer::new(StructureRequest::cartoon("1TUP"));
        let mut scene = SceneRecorder::new();

        let next = viewer
            .set_request(StructureRequest::surface("1TUP"), &mut scene)
            .expect("inputs changed");
        assert_eq!(next, 2);

        assert!(!viewer.apply(1, Ok(two_chain_pdb()), &mut scene));
        assert!(viewer.state().is_loading());
        assert!(scene.is_empty());

        assert!(viewer.apply(2, Ok(two_chain_pdb()), &mut scene));
        let LoadState::Ready(report) = viewer.state() else {
            panic!("expected ready");
        };
        assert_eq!(report.caption.as_deref(), Some(SURFACE_CAPTION));
        assert_eq!(scene.surfaces.len(), 1);
    }

    #[test]
    fn unchanged_request_keeps_generation() {
        let mut viewer = StructureViewer::new(StructureRequest::cartoon("1TUP"));
        let mut scene = SceneRecorder::new();
        assert_eq!(viewer.set_request(StructureRequest::cartoon("1TUP"), &mut scene), None);
        assert_eq!(viewer.generation(), 1);
    }

    #[test]
    fn pocket_adds_two_surfaces_and_caption() {
        let mut viewer = StructureViewer::new(StructureRequest::pocket("1TUP"));
        let mut scene = SceneRecorder::new();
        viewer.apply(1, Ok(two_chain_pdb()), &mut scene);
        assert_eq!(scene.surfaces.len(), 2);
        assert!(matches!(
            viewer.state(),
            LoadState::Ready(ViewReport { caption: Some(c), .. }) if c == POCKET_CAPTION
        ));
    }

    struct FixedSource(Result<String, FetchError>);

    impl StructureSource for FixedSource {
        async fn fetch(&self, _structure_id: &str) -> Result<String, FetchError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn load_fetches_and_applies() {
        let source = FixedSource(Ok(two_chain_pdb()));
        let mut viewer = StructureViewer::new(StructureRequest::cartoon("1TUP"));
        let mut scene = SceneRecorder::new();

        assert!(viewer.load(&source, &mut scene).await);
        assert!(matches!(viewer.state(), LoadState::Ready(_)));
        assert_eq!(scene.model.as_ref().map(|m| m.atoms), Some(4));
    }
}
