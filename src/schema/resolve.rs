//! Cross-declaration reference resolution.
//!
//! A node may carry a relative, file-path-like reference in its description
//! field, marked by a leading `&` sigil. Resolution rewrites the marker into
//! an indexed-access type expression rooted at the declaration's name, so a
//! declaration can alias into a subtree of a sibling declaration without
//! duplicating structure.
//!
//! Resolution is non-fatal by design: a path that escapes the schema root
//! or lands back on the node's own position passes through unresolved for
//! the external emitter to handle.

use tracing::debug;

use super::node::SchemaNode;

/// Rewrite every reference marker in `root` into a type expression based on
/// `decl_name`. Markers are rewritten in place; the sigil description is
/// cleared on success.
pub fn resolve_references(root: &mut SchemaNode, decl_name: &str) {
    let mut position = Vec::new();
    walk(root, decl_name, &mut position);
}

fn walk(node: &mut SchemaNode, decl_name: &str, position: &mut Vec<String>) {
    let marker = node
        .description
        .as_deref()
        .and_then(|d| d.strip_prefix('&'))
        .map(str::to_string);
    if let Some(relative) = marker {
        match resolve_path(position, &relative) {
            Some(absolute) if absolute != *position => {
                node.type_name = Some(render_access_chain(decl_name, &absolute));
                node.description = None;
            }
            Some(_) => {
                debug!(path = %relative, "self-referential marker left unresolved");
            }
            None => {
                debug!(path = %relative, "reference escapes schema root, left unresolved");
            }
        }
    }

    for (name, child) in &mut node.properties {
        position.push(name.clone());
        walk(child, decl_name, position);
        position.pop();
    }
    if let Some(items) = &mut node.items {
        position.push("0".to_string());
        walk(items, decl_name, position);
        position.pop();
    }
    for branch in node
        .one_of
        .iter_mut()
        .chain(node.any_of.iter_mut())
        .chain(node.all_of.iter_mut())
    {
        walk(branch, decl_name, position);
    }
}

/// Resolve a relative path against the node's own property/index chain.
/// Returns `None` when the path climbs past the schema root.
fn resolve_path(position: &[String], relative: &str) -> Option<Vec<String>> {
    let mut absolute = position.to_vec();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                absolute.pop()?;
            }
            other => absolute.push(other.trim().to_string()),
        }
    }
    Some(absolute)
}

/// Wrap the declaration name once per path segment in a non-null
/// indexed-access operator.
fn render_access_chain(decl_name: &str, segments: &[String]) -> String {
    let mut expr = decl_name.to_string();
    for segment in segments {
        let key = if segment.chars().all(|c| c.is_ascii_digit()) && !segment.is_empty() {
            segment.clone()
        } else {
            format!("\"{segment}\"")
        };
        expr = format!("NonNullable<{expr}[{key}]>");
    }
    expr
}
