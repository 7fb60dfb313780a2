//! Syntax stage: parse a candidate as a standalone Java compilation unit.
//!
//! A candidate passes iff the tree-sitter Java grammar produces a tree
//! without ERROR or MISSING nodes.

use tree_sitter::{Node, Parser as TsParser, Tree};

use crate::types::{ForgeError, Result};

/// Upper bound on reported syntax problems per candidate
const MAX_SYNTAX_DIAGNOSTICS: usize = 20;

/// Parse `code` and collect one diagnostic line per ERROR/MISSING node.
///
/// An empty list means the unit is syntactically valid.
pub fn check_syntax(code: &str) -> Result<Vec<String>> {
    if code.trim().is_empty() {
        return Ok(vec!["empty compilation unit".to_string()]);
    }

    let tree = parse_java(code)?;
    let root = tree.root_node();
    let mut diagnostics = Vec::new();
    if root.has_error() {
        collect_problems(root, code, &mut diagnostics);
        if diagnostics.is_empty() {
            diagnostics.push("unparseable compilation unit".to_string());
        }
    }
    Ok(diagnostics)
}

/// Parse `code` with the tree-sitter Java grammar.
///
/// Error recovery means a tree comes back even for broken input.
pub fn parse_java(code: &str) -> Result<Tree> {
    let mut parser = TsParser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ForgeError::Parse {
            message: format!("Failed to set Java language: {}", e),
            path: String::new(),
        })?;

    parser.parse(code, None).ok_or_else(|| ForgeError::Parse {
        message: "Failed to parse Java source".to_string(),
        path: String::new(),
    })
}

fn collect_problems(node: Node, code: &str, out: &mut Vec<String>) {
    if out.len() >= MAX_SYNTAX_DIAGNOSTICS {
        return;
    }

    let pos = node.start_position();
    if node.is_missing() {
        out.push(format!(
            "{}:{}: missing {}",
            pos.row + 1,
            pos.column + 1,
            node.kind()
        ));
        return;
    }
    if node.is_error() {
        let snippet: String = node
            .utf8_text(code.as_bytes())
            .unwrap_or("")
            .chars()
            .take(40)
            .collect();
        out.push(format!(
            "{}:{}: unexpected `{}`",
            pos.row + 1,
            pos.column + 1,
            snippet.trim()
        ));
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            collect_problems(child, code, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_unit() {
        let code = r#"
package com.x;

import org.junit.jupiter.api.Test;
import static org.junit.jupiter.api.Assertions.*;

public class Calc_add_Test {
    @Test
    void addsTwoNumbers() {
        assertEquals(3, new Calc().add(1, 2));
    }
}
"#;
        assert!(check_syntax(code).unwrap().is_empty());
    }

    #[test]
    fn test_missing_brace_is_reported() {
        let code = "public class A {\n    void m() {\n        int x = 1;\n    }\n";
        let diagnostics = check_syntax(code).unwrap();
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_garbage_is_reported() {
        let code = "public class A { void m() { int = ; } }";
        let diagnostics = check_syntax(code).unwrap();
        assert!(!diagnostics.is_empty());
        assert!(diagnostics[0].starts_with("1:"));
    }

    #[test]
    fn test_empty_is_invalid() {
        assert_eq!(check_syntax("  \n").unwrap().len(), 1);
    }
}
