//! Payload inspection without a type registry, used by `pickle-inspect`.

use json_pickle_wire::{NodeKind, Payload};
use tracing::debug;

use crate::error::PickleError;

const KINDS: [NodeKind; 5] = [
    NodeKind::Tuple,
    NodeKind::Bytes,
    NodeKind::List,
    NodeKind::Dict,
    NodeKind::Object,
];

/// Parses and validates a payload, then renders a per-kind summary.
pub fn summarize(bytes: &[u8]) -> Result<String, PickleError> {
    let payload = load_checked(bytes)?;
    let stats = payload.stats();
    let mut out = format!(
        "root: {}\nnodes: {}\n",
        payload.root.to_json()?,
        stats.total_nodes()
    );
    for kind in KINDS {
        let count = stats.count(kind);
        if count > 0 {
            out.push_str(&format!("  {}: {count}\n", kind.as_str()));
        }
    }
    out.push_str(&format!(
        "backreferences: {}\ntype references: {}\ninline scalars: {}\n",
        stats.backrefs, stats.types, stats.scalars
    ));
    Ok(out)
}

/// Parses and validates a payload, then renders one line per slot.
pub fn render_table(bytes: &[u8]) -> Result<String, PickleError> {
    let payload = load_checked(bytes)?;
    let mut out = format!("root {}\n", payload.root.to_json()?);
    for (index, node) in payload.table.iter().enumerate() {
        out.push_str(&format!("#{index} {}\n", node.to_json()?));
    }
    Ok(out)
}

fn load_checked(bytes: &[u8]) -> Result<Payload, PickleError> {
    let payload = Payload::from_slice(bytes)?;
    payload.validate()?;
    debug!(slots = payload.table.len(), "payload is well-formed");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHARED: &[u8] = br#"[[0], [["tuple", [[1], [1]]], ["dict", [["a", 1]]]]]"#;

    #[test]
    fn summary_counts_kinds() {
        let text = summarize(SHARED).unwrap();
        assert_eq!(
            text,
            "root: [0]\nnodes: 2\n  tuple: 1\n  dict: 1\nbackreferences: 3\n\
             type references: 0\ninline scalars: 2\n"
        );
    }

    #[test]
    fn table_lists_every_slot() {
        let text = render_table(SHARED).unwrap();
        assert_eq!(
            text,
            "root [0]\n#0 [\"tuple\",[[1],[1]]]\n#1 [\"dict\",[[\"a\",1]]]\n"
        );
    }

    #[test]
    fn invalid_payloads_are_reported() {
        assert!(matches!(summarize(b"[[4], []]"), Err(PickleError::Integrity(_))));
        assert!(matches!(summarize(b"[[0], [[\"list\"]]]"), Err(PickleError::Protocol(_))));
        assert!(matches!(render_table(b"nope"), Err(PickleError::Json(_))));
    }
}
