//! Graphviz DOT output.

use std::fmt::Write;

/// Escapes a string for use inside a quoted DOT label.
///
/// Statements contain `<init>`-style method names and quoted constants, so quotes,
/// backslashes, newlines and angle brackets are escaped.
///
/// ```rust
/// use taintpath::utils::escape_dot;
///
/// assert_eq!(escape_dot("La;-><init>()V(0)"), "La;-\\>\\<init\\>()V(0)");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

/// Incremental writer for a directed graph with numbered boxes.
#[derive(Debug)]
pub struct DotWriter {
    out: String,
}

impl DotWriter {
    /// Starts a digraph named `title`.
    #[must_use]
    pub fn new(title: &str) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", escape_dot(title));
        out.push_str("    node [shape=box, fontname=\"monospace\"];\n");
        DotWriter { out }
    }

    /// Adds node `n<id>`.
    pub fn node(&mut self, id: usize, label: &str) {
        let _ = writeln!(self.out, "    n{} [label=\"{}\"];", id, escape_dot(label));
    }

    /// Adds edge `n<from> -> n<to>`.
    pub fn edge(&mut self, from: usize, to: usize) {
        let _ = writeln!(self.out, "    n{from} -> n{to};");
    }

    /// Closes the graph and returns the text.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_statements() {
        assert_eq!(escape_dot("plain"), "plain");
        assert_eq!(escape_dot("const-string v0, \"x\""), "const-string v0, \\\"x\\\"");
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
        assert_eq!(escape_dot("l1\r\nl2"), "l1\\nl2");
        assert_eq!(
            escape_dot("Lcom/a/B;-><init>()V(0)id(3)"),
            "Lcom/a/B;-\\>\\<init\\>()V(0)id(3)"
        );
    }

    #[test]
    fn writes_digraph() {
        let mut dot = DotWriter::new("graph \"5\"");
        dot.node(0, "a");
        dot.node(1, "b");
        dot.edge(0, 1);
        let text = dot.finish();

        assert!(text.starts_with("digraph \"graph \\\"5\\\"\" {\n"));
        assert!(text.contains("    n0 [label=\"a\"];\n"));
        assert!(text.contains("    n0 -> n1;\n"));
        assert!(text.ends_with("}\n"));
    }
}
