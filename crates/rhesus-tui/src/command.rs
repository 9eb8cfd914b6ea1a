//! Slash commands typed into the input box

use rhesus_core::directive::RenderNode;
use rhesus_core::structure::{normalize_chain, StructureRequest};

pub const HELP: &str = "Commands: /view ID, /surface ID, /pocket ID, /interaction ID CHAIN_A CHAIN_B, \
/residue ID CHAIN NUMBER, /sequence ID CHAIN, /help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a widget directly, with a short caption
    Open { caption: String, node: RenderNode },
    Help,
}

/// Parse input starting with `/`. Returns `None` for ordinary chat text and
/// `Some(Err(usage))` for a malformed command.
pub fn parse(input: &str) -> Option<Result<Command, String>> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or("").to_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match (name.as_str(), args.as_slice()) {
        ("help", _) => Ok(Command::Help),
        ("view", [id]) => Ok(open(
            format!("Cartoon view of {}", id),
            RenderNode::Structure(StructureRequest::cartoon(id)),
        )),
        ("surface", [id]) => Ok(open(
            format!("Electrostatic surface of {}", id),
            RenderNode::Structure(StructureRequest::surface(id)),
        )),
        ("pocket", [id]) => Ok(open(
            format!("Pocket view of {}", id),
            RenderNode::Structure(StructureRequest::pocket(id)),
        )),
        ("interaction", [id, a, b]) => Ok(open(
            format!("Interface of {} chains {} and {}", id, normalize_chain(a), normalize_chain(b)),
            RenderNode::Structure(StructureRequest::interaction(id, a, b)),
        )),
        ("residue", [id, chain, number]) => match number.parse::<i32>() {
            Ok(number) => Ok(open(
                format!("Neighborhood of {}:{} in {}", normalize_chain(chain), number, id),
                RenderNode::Structure(StructureRequest::residue_query(id, chain, number)),
            )),
            Err(_) => Err(format!("Residue number must be an integer: {}", number)),
        },
        ("sequence", [id, chain]) => Ok(open(
            format!("Sequence of {} chain {}", id, normalize_chain(chain)),
            RenderNode::Sequence {
                structure_id: id.to_string(),
                chain: normalize_chain(chain),
            },
        )),
        ("view" | "surface" | "pocket" | "interaction" | "residue" | "sequence", _) => {
            Err(format!("Wrong arguments for /{}. {}", name, HELP))
        }
        _ => Err(format!("Unknown command /{}. {}", name, HELP)),
    };

    Some(command)
}

fn open(caption: String, node: RenderNode) -> Command {
    Command::Open { caption, node }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhesus_core::structure::PresentationMode;

    #[test]
    fn plain_text_is_not_a_command() {
        assert!(parse("show me 1TUP").is_none());
    }

    #[test]
    fn view_opens_cartoon() {
        let Some(Ok(Command::Open { node, .. })) = parse("/view 1TUP") else {
            panic!("expected a command");
        };
        assert_eq!(node, RenderNode::Structure(StructureRequest::cartoon("1TUP")));
    }

    #[test]
    fn interaction_normalizes_chains() {
        let Some(Ok(Command::Open { node, caption })) = parse("/interaction 6M0J a e") else {
            panic!("expected a command");
        };
        assert!(caption.contains("chains A and E"));
        match node {
            RenderNode::Structure(request) => assert_eq!(
                request.mode,
                PresentationMode::Interaction {
                    chain_a: "A".into(),
                    chain_b: "E".into()
                }
            ),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn residue_needs_a_number() {
        assert!(matches!(parse("/residue 1TUP A x"), Some(Err(_))));
        assert!(matches!(parse("/residue 1TUP A 248"), Some(Ok(Command::Open { .. }))));
    }

    #[test]
    fn wrong_arity_and_unknown_commands_explain_usage() {
        assert!(matches!(parse("/interaction 1TUP A"), Some(Err(msg)) if msg.contains("/interaction")));
        assert!(matches!(parse("/clear"), Some(Err(msg)) if msg.contains("Unknown command")));
        assert_eq!(parse("/help"), Some(Ok(Command::Help)));
    }
}
