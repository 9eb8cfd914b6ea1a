//! Turns scanned tokens into typed directives and a render tree.
//!
//! Malformed payloads are dropped silently: the token renders as nothing and
//! the rest of the reply is unaffected.

use serde::{Deserialize, Serialize};

use super::lexer::{tokenize, Segment, TokenKind};
use crate::structure::StructureRequest;

/// A validated directive with its typed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    StructureView { structure_id: String },
    InteractionView { structure_id: String, chain_a: String, chain_b: String },
    SurfaceView { structure_id: String },
    MutationDownload { filename: String, structure_id: String },
    SequenceFetch { structure_id: String, chain: String },
    BlastResult { text: String },
    LiteratureSummary { text: String },
}

impl Directive {
    pub fn kind(&self) -> TokenKind {
        match self {
            Directive::StructureView { .. } => TokenKind::PdbView,
            Directive::InteractionView { .. } => TokenKind::InteractionView,
            Directive::SurfaceView { .. } => TokenKind::SurfaceView,
            Directive::MutationDownload { .. } => TokenKind::MutationDownload,
            Directive::SequenceFetch { .. } => TokenKind::FetchSequence,
            Directive::BlastResult { .. } => TokenKind::BlastResult,
            Directive::LiteratureSummary { .. } => TokenKind::PubmedSummary,
        }
    }

    /// Format the directive back into its `[KIND:payload]` token
    pub fn to_token(&self) -> String {
        let payload = match self {
            Directive::StructureView { structure_id } | Directive::SurfaceView { structure_id } => {
                structure_id.clone()
            }
            Directive::InteractionView {
                structure_id,
                chain_a,
                chain_b,
            } => format!("{}:{}:{}", structure_id, chain_a, chain_b),
            Directive::MutationDownload { filename, .. } => filename.clone(),
            Directive::SequenceFetch {
                structure_id,
                chain,
            } => format!("{}:{}", structure_id, chain),
            Directive::BlastResult { text } | Directive::LiteratureSummary { text } => text.clone(),
        };
        format!("[{}:{}]", self.kind().as_str(), payload)
    }

    /// The render descriptor for this directive
    pub fn to_node(&self) -> RenderNode {
        match self {
            Directive::StructureView { structure_id } => {
                RenderNode::Structure(StructureRequest::cartoon(structure_id))
            }
            Directive::SurfaceView { structure_id } => {
                RenderNode::Structure(StructureRequest::surface(structure_id))
            }
            Directive::InteractionView {
                structure_id,
                chain_a,
                chain_b,
            } => RenderNode::Structure(StructureRequest::interaction(structure_id, chain_a, chain_b)),
            Directive::MutationDownload {
                filename,
                structure_id,
            } => RenderNode::Download {
                filename: filename.clone(),
                structure_id: structure_id.clone(),
            },
            Directive::SequenceFetch {
                structure_id,
                chain,
            } => RenderNode::Sequence {
                structure_id: structure_id.clone(),
                chain: crate::structure::normalize_chain(chain),
            },
            Directive::BlastResult { text } => RenderNode::Preformatted {
                title: "BLAST Search Results".to_string(),
                text: text.clone(),
            },
            Directive::LiteratureSummary { text } => RenderNode::Preformatted {
                title: "Literature Summary".to_string(),
                text: text.clone(),
            },
        }
    }
}

/// One element of a rendered assistant reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderNode {
    Text(String),
    Structure(StructureRequest),
    Download { filename: String, structure_id: String },
    Sequence { structure_id: String, chain: String },
    /// Opaque text shown verbatim in a fixed-width block
    Preformatted { title: String, text: String },
}

impl RenderNode {
    pub fn is_widget(&self) -> bool {
        !matches!(self, RenderNode::Text(_))
    }
}

/// Validate a token payload into a directive. Returns `None` for payloads
/// that are missing required fields.
pub fn dispatch(kind: TokenKind, payload: &str) -> Option<Directive> {
    let payload = payload.trim();
    match kind {
        TokenKind::PdbView => non_empty(payload).map(|id| Directive::StructureView {
            structure_id: id.to_string(),
        }),
        TokenKind::SurfaceView => non_empty(payload).map(|id| Directive::SurfaceView {
            structure_id: id.to_string(),
        }),
        TokenKind::InteractionView => {
            let mut fields = payload.split(':').map(str::trim);
            let structure_id = fields.next().and_then(non_empty)?;
            let chain_a = fields.next().and_then(non_empty)?;
            let chain_b = fields.next().and_then(non_empty)?;
            Some(Directive::InteractionView {
                structure_id: structure_id.to_string(),
                chain_a: chain_a.to_string(),
                chain_b: chain_b.to_string(),
            })
        }
        TokenKind::FetchSequence => {
            let mut fields = payload.split(':').map(str::trim);
            let structure_id = fields.next().and_then(non_empty)?;
            let chain = fields.next().and_then(non_empty)?;
            Some(Directive::SequenceFetch {
                structure_id: structure_id.to_string(),
                chain: chain.to_string(),
            })
        }
        TokenKind::MutationDownload => non_empty(payload).map(|filename| {
            Directive::MutationDownload {
                filename: filename.to_string(),
                structure_id: structure_id_from_filename(filename).to_string(),
            }
        }),
        TokenKind::BlastResult => Some(Directive::BlastResult {
            text: payload.to_string(),
        }),
        TokenKind::PubmedSummary => Some(Directive::LiteratureSummary {
            text: payload.to_string(),
        }),
    }
}

/// Structure id of a mutation file: everything before the first underscore,
/// or the whole name when there is none.
pub fn structure_id_from_filename(filename: &str) -> &str {
    filename.split('_').next().unwrap_or(filename)
}

/// Scan a reply and build its render tree.
///
/// Dropped tokens leave no trace, and text runs on either side of them are
/// merged into one text node.
pub fn render(text: &str) -> Vec<RenderNode> {
    let mut nodes: Vec<RenderNode> = Vec::new();

    for segment in tokenize(text) {
        let node = match segment {
            Segment::Text(literal) => RenderNode::Text(literal.to_string()),
            Segment::Token { kind, payload } => match dispatch(kind, payload) {
                Some(directive) => directive.to_node(),
                None => {
                    tracing::debug!("dropping malformed {} token", kind.as_str());
                    continue;
                }
            },
        };

        match (nodes.last_mut(), node) {
            (Some(RenderNode::Text(previous)), RenderNode::Text(next)) => previous.push_str(&next),
            (_, node) => nodes.push(node),
        }
    }

    nodes
}

/// Directives found in a reply, in order, skipping malformed tokens
pub fn directives(text: &str) -> Vec<Directive> {
    tokenize(text)
        .filter_map(|segment| match segment {
            Segment::Token { kind, payload } => dispatch(kind, payload),
            Segment::Text(_) => None,
        })
        .collect()
}

fn non_empty(field: &str) -> Option<&str> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::PresentationMode;

    #[test]
    fn well_formed_directives_round_trip_through_tokens() {
        let samples = vec![
            Directive::StructureView {
                structure_id: "6M0J".to_string(),
            },
            Directive::InteractionView {
                structure_id: "1TUP".to_string(),
                chain_a: "A".to_string(),
                chain_b: "B".to_string(),
            },
            Directive::SurfaceView {
                structure_id: "1LZ1".to_string(),
            },
            Directive::MutationDownload {
                filename: "1TUP_A_142_GLY.pdb".to_string(),
                structure_id: "1TUP".to_string(),
            },
            Directive::SequenceFetch {
                structure_id: "1TUP".to_string(),
                chain: "A".to_string(),
            },
            Directive::BlastResult {
                text: "Sequences producing significant alignments: P53_HUMAN 1e-80".to_string(),
            },
            Directive::LiteratureSummary {
                text: "Several studies highlight disulfide engineering.".to_string(),
            },
        ];

        for directive in samples {
            let token = directive.to_token();
            assert_eq!(directives(&token), vec![directive.clone()], "token {token}");
        }
    }

    #[test]
    fn interaction_view_with_missing_chain_is_dropped() {
        let nodes = render("Look at [INTERACTION_VIEW:1TUP:A] this.");
        assert_eq!(nodes, vec![RenderNode::Text("Look at  this.".to_string())]);
    }

    #[test]
    fn interaction_view_with_blank_field_is_dropped() {
        assert_eq!(dispatch(TokenKind::InteractionView, "1TUP: :B"), None);
        assert_eq!(dispatch(TokenKind::InteractionView, ":A:B"), None);
    }

    #[test]
    fn blank_structure_id_is_dropped() {
        assert_eq!(dispatch(TokenKind::PdbView, "   "), None);
        assert_eq!(render("x[PDB_VIEW:  ]y"), vec![RenderNode::Text("xy".to_string())]);
    }

    #[test]
    fn sequence_fetch_requires_both_fields() {
        assert_eq!(dispatch(TokenKind::FetchSequence, "1TUP"), None);
        assert_eq!(
            dispatch(TokenKind::FetchSequence, "1TUP:b"),
            Some(Directive::SequenceFetch {
                structure_id: "1TUP".to_string(),
                chain: "b".to_string()
            })
        );
    }

    #[test]
    fn mutation_download_derives_structure_id() {
        assert_eq!(structure_id_from_filename("1TUP_A_142_GLY.pdb"), "1TUP");
        assert_eq!(structure_id_from_filename("NOUNDERSCORE.pdb"), "NOUNDERSCORE.pdb");

        let nodes = render("[MUTATION_DOWNLOAD: 1TUP_A_142_GLY.pdb ]");
        assert_eq!(
            nodes,
            vec![RenderNode::Download {
                filename: "1TUP_A_142_GLY.pdb".to_string(),
                structure_id: "1TUP".to_string()
            }]
        );
    }

    #[test]
    fn interaction_chains_are_normalized_in_the_request() {
        let nodes = render("[INTERACTION_VIEW:1tup:a:b]");
        let RenderNode::Structure(request) = &nodes[0] else {
            panic!("expected a structure widget, got {nodes:?}");
        };
        assert_eq!(request.structure_id, "1tup");
        assert_eq!(
            request.mode,
            PresentationMode::Interaction {
                chain_a: "A".to_string(),
                chain_b: "B".to_string()
            }
        );
    }

    #[test]
    fn mixed_reply_renders_in_order() {
        let reply = "I have performed the mutation. [PDB_VIEW:1TUP] [MUTATION_DOWNLOAD:1TUP_A_142_GLY.pdb] [FOO:bar]";
        let nodes = render(reply);
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0], RenderNode::Text("I have performed the mutation. ".to_string()));
        assert_eq!(nodes[1], RenderNode::Structure(StructureRequest::cartoon("1TUP")));
        assert_eq!(nodes[2], RenderNode::Text(" ".to_string()));
        assert!(matches!(nodes[3], RenderNode::Download { .. }));
        assert_eq!(nodes[4], RenderNode::Text(" [FOO:bar]".to_string()));
    }

    #[test]
    fn blast_payload_is_kept_verbatim_after_trim() {
        let nodes = render("[BLAST_RESULT:  hit 1: 98%\thit 2: 71%  ]");
        assert_eq!(
            nodes,
            vec![RenderNode::Preformatted {
                title: "BLAST Search Results".to_string(),
                text: "hit 1: 98%\thit 2: 71%".to_string()
            }]
        );
    }

    #[test]
    fn plain_reply_is_one_text_node() {
        let reply = "The best PDB ID for human lysozyme is 1LZ1.";
        assert_eq!(render(reply), vec![RenderNode::Text(reply.to_string())]);
    }
}
