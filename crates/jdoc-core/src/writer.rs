use std::fmt::{self, Write as _};

use crate::doc::{Document, Kind, NodeId};
use crate::escape;

/// Renders a subtree as compact text: no whitespace beyond what string
/// content carries.
pub fn dump(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_compact(doc, node, &mut out).ok();
    out
}

/// Renders a subtree with one child per line, indented by one tab per
/// nesting depth. Empty containers stay on one line.
pub fn dump_pretty(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_pretty(doc, node, 0, &mut out).ok();
    out
}

fn write_scalar(doc: &Document, id: NodeId, out: &mut String) -> fmt::Result {
    match doc.kind(id) {
        Kind::Null => out.push_str("null"),
        Kind::Bool => out.push_str(if doc.as_bool(id).unwrap_or_default() {
            "true"
        } else {
            "false"
        }),
        Kind::Int => write!(out, "{}", doc.as_int(id).unwrap_or_default())?,
        Kind::Float => {
            // Keep whole values re-readable as decimals.
            let f = doc.as_float(id).unwrap_or_default();
            if f.fract() == 0.0 && f.is_finite() {
                write!(out, "{f:.1}")?;
            } else {
                write!(out, "{f}")?;
            }
        }
        _ => {
            out.push('"');
            out.push_str(&escape::escape(doc.as_str(id).unwrap_or_default()));
            out.push('"');
        }
    }
    Ok(())
}

fn write_compact(doc: &Document, id: NodeId, out: &mut String) -> fmt::Result {
    match doc.kind(id) {
        Kind::Array => {
            out.push('[');
            for (i, c) in doc.children(id).enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_compact(doc, c, out)?;
            }
            out.push(']');
        }
        Kind::Object => {
            out.push('{');
            for (i, (name, c)) in doc.entries(id).enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write!(out, "\"{}\":", escape::escape(name))?;
                write_compact(doc, c, out)?;
            }
            out.push('}');
        }
        _ => write_scalar(doc, id, out)?,
    }
    Ok(())
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_pretty(doc: &Document, id: NodeId, depth: usize, out: &mut String) -> fmt::Result {
    match doc.kind(id) {
        Kind::Array => {
            if doc.is_empty(id) {
                out.push_str("[]");
                return Ok(());
            }
            out.push_str("[\n");
            for (i, c) in doc.children(id).enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                indent(depth + 1, out);
                write_pretty(doc, c, depth + 1, out)?;
            }
            out.push('\n');
            indent(depth, out);
            out.push(']');
        }
        Kind::Object => {
            if doc.is_empty(id) {
                out.push_str("{}");
                return Ok(());
            }
            out.push_str("{\n");
            for (i, (name, c)) in doc.entries(id).enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                indent(depth + 1, out);
                write!(out, "\"{}\": ", escape::escape(name))?;
                write_pretty(doc, c, depth + 1, out)?;
            }
            out.push('\n');
            indent(depth, out);
            out.push('}');
        }
        _ => write_scalar(doc, id, out)?,
    }
    Ok(())
}
