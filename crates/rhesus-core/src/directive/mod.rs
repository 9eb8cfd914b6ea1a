//! Directive tokens: the wire contract between model output and the client

pub mod dispatch;
pub mod lexer;

pub use dispatch::{directives, dispatch, render, structure_id_from_filename, Directive, RenderNode};
pub use lexer::{tokenize, Lexer, Segment, TokenKind};
