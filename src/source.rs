use crate::resolver::ResolveError;
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

/// A top-level function and where its `func` keyword starts (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

pub trait SourceParser: Sync {
    fn functions(&self, path: &Path) -> Result<Vec<FunctionDecl>, ResolveError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GoSourceParser;

impl SourceParser for GoSourceParser {
    fn functions(&self, path: &Path) -> Result<Vec<FunctionDecl>, ResolveError> {
        let content = std::fs::read_to_string(path).map_err(|source| ResolveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_functions(&content).ok_or_else(|| ResolveError::Parse { path: path.to_path_buf() })
    }
}

fn go_language() -> Language {
    tree_sitter_go::LANGUAGE.into()
}

/// `None` when the source does not parse cleanly.
pub fn parse_functions(content: &str) -> Option<Vec<FunctionDecl>> {
    let mut parser = Parser::new();
    parser.set_language(&go_language()).ok()?;
    let tree = parser.parse(content, None)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        if node.kind() != "function_declaration" {
            continue;
        }
        if let Some(name) = node.child_by_field_name("name") {
            out.push(FunctionDecl {
                name: node_text(&name, content).to_string(),
                line: node.start_position().row + 1,
                column: node.start_position().column + 1,
            });
        }
    }
    Some(out)
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "package sample\n\nimport \"testing\"\n\nfunc TestAlpha(t *testing.T) {\n\tt.Log(\"a\")\n}\n\ntype fixture struct{}\n\nfunc (f fixture) TestMethod(t *testing.T) {}\n\n  func TestIndented(t *testing.T) {}\n";

    #[test]
    fn finds_top_level_functions_with_positions() {
        let funcs = parse_functions(SAMPLE).expect("sample parses");
        assert_eq!(funcs.len(), 2);
        assert_eq!(funcs[0], FunctionDecl { name: "TestAlpha".into(), line: 5, column: 1 });
        assert_eq!(funcs[1], FunctionDecl { name: "TestIndented".into(), line: 13, column: 3 });
    }

    #[test]
    fn methods_are_not_reported() {
        let funcs = parse_functions(SAMPLE).unwrap();
        assert!(funcs.iter().all(|f| f.name != "TestMethod"));
    }

    #[test]
    fn syntax_errors_fail_the_parse() {
        assert!(parse_functions("package broken\n\nfunc TestX(t *testing.T {\n").is_none());
    }
}
