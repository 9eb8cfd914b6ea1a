//! Scanner for bracketed directive tokens embedded in assistant replies.
//!
//! A reply such as `"Here it is. [PDB_VIEW:6M0J]"` is split into a literal
//! text segment followed by a `PdbView` token. Only the fixed set of kinds in
//! [`TokenKind`] is recognized; any other bracketed text (`[FOO:bar]`, `[1]`)
//! stays literal.

use regex::Regex;
use std::sync::OnceLock;

static DIRECTIVE_REGEX: OnceLock<Regex> = OnceLock::new();

fn directive_regex() -> &'static Regex {
    DIRECTIVE_REGEX.get_or_init(|| {
        // The kind alternation is the whitelist: unknown kinds never match and
        // fall through as literal text.
        Regex::new(
            r"\[(PDB_VIEW|INTERACTION_VIEW|SURFACE_VIEW|MUTATION_DOWNLOAD|FETCH_SEQUENCE|BLAST_RESULT|PUBMED_SUMMARY):([^\]]+)\]",
        )
        .expect("Failed to compile directive regex")
    })
}

/// Directive kinds understood by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    PdbView,
    InteractionView,
    SurfaceView,
    MutationDownload,
    FetchSequence,
    BlastResult,
    PubmedSummary,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::PdbView => "PDB_VIEW",
            TokenKind::InteractionView => "INTERACTION_VIEW",
            TokenKind::SurfaceView => "SURFACE_VIEW",
            TokenKind::MutationDownload => "MUTATION_DOWNLOAD",
            TokenKind::FetchSequence => "FETCH_SEQUENCE",
            TokenKind::BlastResult => "BLAST_RESULT",
            TokenKind::PubmedSummary => "PUBMED_SUMMARY",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PDB_VIEW" => Some(TokenKind::PdbView),
            "INTERACTION_VIEW" => Some(TokenKind::InteractionView),
            "SURFACE_VIEW" => Some(TokenKind::SurfaceView),
            "MUTATION_DOWNLOAD" => Some(TokenKind::MutationDownload),
            "FETCH_SEQUENCE" => Some(TokenKind::FetchSequence),
            "BLAST_RESULT" => Some(TokenKind::BlastResult),
            "PUBMED_SUMMARY" => Some(TokenKind::PubmedSummary),
            _ => None,
        }
    }

    pub fn all() -> [TokenKind; 7] {
        [
            TokenKind::PdbView,
            TokenKind::InteractionView,
            TokenKind::SurfaceView,
            TokenKind::MutationDownload,
            TokenKind::FetchSequence,
            TokenKind::BlastResult,
            TokenKind::PubmedSummary,
        ]
    }
}

/// One piece of a scanned reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, preserved byte-for-byte
    Text(&'a str),
    /// A recognized `[KIND:payload]` token with its untrimmed payload
    Token { kind: TokenKind, payload: &'a str },
}

/// Lazy left-to-right scanner over a reply.
///
/// A clone continues from the same position. Call [`tokenize`] again on the
/// same text to scan from the beginning.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    pending: Option<Segment<'a>>,
    emitted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            pending: None,
            emitted: false,
        }
    }
}

/// Scan `text` into literal and token segments
pub fn tokenize(text: &str) -> Lexer<'_> {
    Lexer::new(text)
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }

        // Empty input still yields one (empty) literal segment
        if self.text.is_empty() {
            if self.emitted {
                return None;
            }
            self.emitted = true;
            return Some(Segment::Text(self.text));
        }

        if self.pos >= self.text.len() {
            return None;
        }
        self.emitted = true;

        let start = self.pos;
        let Some(caps) = directive_regex().captures_at(self.text, start) else {
            self.pos = self.text.len();
            return Some(Segment::Text(&self.text[start..]));
        };

        let (Some(whole), Some(tag), Some(payload)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            self.pos = self.text.len();
            return Some(Segment::Text(&self.text[start..]));
        };

        self.pos = whole.end();
        let token = match TokenKind::from_tag(tag.as_str()) {
            Some(kind) => Segment::Token {
                kind,
                payload: payload.as_str(),
            },
            None => Segment::Text(whole.as_str()),
        };

        if whole.start() > start {
            self.pending = Some(token);
            Some(Segment::Text(&self.text[start..whole.start()]))
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_single_segment() {
        let text = "No tokens here, just [brackets] and colons: a:b.";
        let segments: Vec<_> = tokenize(text).collect();
        assert_eq!(segments, vec![Segment::Text(text)]);
    }

    #[test]
    fn empty_text_is_a_single_empty_segment() {
        let segments: Vec<_> = tokenize("").collect();
        assert_eq!(segments, vec![Segment::Text("")]);
    }

    #[test]
    fn splits_text_around_tokens() {
        let text = "Displaying now. [PDB_VIEW:6M0J] Enjoy.";
        let segments: Vec<_> = tokenize(text).collect();
        assert_eq!(
            segments,
            vec![
                Segment::Text("Displaying now. "),
                Segment::Token {
                    kind: TokenKind::PdbView,
                    payload: "6M0J"
                },
                Segment::Text(" Enjoy."),
            ]
        );
    }

    #[test]
    fn adjacent_tokens_have_no_empty_text_between() {
        let segments: Vec<_> =
            tokenize("[PDB_VIEW:1TUP][MUTATION_DOWNLOAD:1TUP_A_142_GLY.pdb]").collect();
        assert_eq!(segments.len(), 2);
        assert!(matches!(
            segments[1],
            Segment::Token {
                kind: TokenKind::MutationDownload,
                payload: "1TUP_A_142_GLY.pdb"
            }
        ));
    }

    #[test]
    fn unknown_kinds_stay_literal() {
        let text = "before [FOO:bar] after";
        let segments: Vec<_> = tokenize(text).collect();
        assert_eq!(segments, vec![Segment::Text(text)]);
    }

    #[test]
    fn unknown_kind_does_not_hide_a_later_token() {
        let segments: Vec<_> = tokenize("[FOO:x] [SURFACE_VIEW:1LZ1]").collect();
        assert_eq!(
            segments,
            vec![
                Segment::Text("[FOO:x] "),
                Segment::Token {
                    kind: TokenKind::SurfaceView,
                    payload: "1LZ1"
                },
            ]
        );
    }

    #[test]
    fn payload_keeps_colons_and_whitespace() {
        let segments: Vec<_> = tokenize("[INTERACTION_VIEW: 1TUP:a:B ]").collect();
        assert_eq!(
            segments,
            vec![Segment::Token {
                kind: TokenKind::InteractionView,
                payload: " 1TUP:a:B "
            }]
        );
    }

    #[test]
    fn unterminated_and_empty_tokens_are_literal() {
        let text = "[PDB_VIEW:] and [PDB_VIEW:1ABC";
        let segments: Vec<_> = tokenize(text).collect();
        assert_eq!(segments, vec![Segment::Text(text)]);
    }

    #[test]
    fn lowercase_kind_is_not_a_token() {
        let text = "[pdb_view:1ABC]";
        assert_eq!(tokenize(text).collect::<Vec<_>>(), vec![Segment::Text(text)]);
    }

    #[test]
    fn concatenated_segments_reproduce_input() {
        let text = "a [PDB_VIEW:1] b [BLAST_RESULT:x: y] c [FOO:z] [PUBMED_SUMMARY:p]";
        let rebuilt: String = tokenize(text)
            .map(|segment| match segment {
                Segment::Text(t) => t.to_string(),
                Segment::Token { kind, payload } => format!("[{}:{}]", kind.as_str(), payload),
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn scanning_again_restarts_from_the_beginning() {
        let text = "x [PDB_VIEW:1ABC] y";
        let first: Vec<_> = tokenize(text).collect();
        let second: Vec<_> = tokenize(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in TokenKind::all() {
            assert_eq!(TokenKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(TokenKind::from_tag("FOO"), None);
    }
}
