// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recursive-descent parser for the tree schema language.
//!
//! Grammar, informally:
//!
//! ```text
//! schema      := directive* node-block*
//! directive   := doc? "source" | doc? "python"
//!              | "namespace" IDENT STRING?
//!              | "support" PATH
//!              | "initialize_function" PATH
//!              | "serdes_functions" PATH PATH
//!              | "location" PATH
//!              | "include" STRING | "python_include" STRING
//! node-block  := doc? SNAKE_IDENT "{" node-item* "}"
//! node-item   := field | "error" ";"
//!              | "reorder" "(" IDENT ("," IDENT)* ")" ";"
//!              | node-block
//! field       := doc? IDENT ":" field-type ";"
//! field-type  := EDGE_KIND "<" type-ref ">" | type-ref
//! type-ref    := "ext"? PATH
//! ```
//!
//! A nested node block derives from the enclosing block. Documentation
//! comments (`#`) attach to the next directive, node, or field.
//! Resolution of type references happens in [`crate::analyze`].

use crate::error::SchemaError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::spec::EdgeKind;

/// An unresolved field declaration.
#[derive(Debug, Clone)]
pub struct ParsedField {
    /// Field name.
    pub name: String,
    /// Attached documentation.
    pub doc: String,
    /// Edge kind; `None` for a bare type reference.
    pub kind: Option<EdgeKind>,
    /// The referenced type path, as written.
    pub type_path: String,
    /// Whether the reference was forced external with `ext`.
    pub is_ext: bool,
    /// Source line of the declaration.
    pub line: u32,
}

/// An unresolved node block.
#[derive(Debug, Clone)]
pub struct ParsedNode {
    /// Node name, snake_case.
    pub snake_name: String,
    /// Attached documentation.
    pub doc: String,
    /// Index of the enclosing node, if nested.
    pub parent: Option<usize>,
    /// Fields in declaration order.
    pub fields: Vec<ParsedField>,
    /// `reorder` override, empty when absent.
    pub order: Vec<String>,
    /// Whether the node carries `error`.
    pub is_error_marker: bool,
    /// Source line of the block.
    pub line: u32,
}

/// Parser output: directives plus node blocks in declaration order,
/// with nesting flattened into parent indices (parents always precede
/// their derived nodes).
#[derive(Debug, Clone, Default)]
pub struct ParsedSchema {
    /// Schema file name, for diagnostics.
    pub file: String,
    /// Main-output file documentation.
    pub source_doc: String,
    /// Secondary-output file documentation.
    pub python_doc: String,
    /// Emitted module name.
    pub module_name: String,
    /// Emitted module documentation.
    pub module_doc: String,
    /// Support library path, when declared.
    pub support_path: Option<String>,
    /// Initialize function path, when declared.
    pub initialize_fn: Option<String>,
    /// Primitive serialize function path, when declared.
    pub serialize_fn: Option<String>,
    /// Primitive deserialize function path, when declared.
    pub deserialize_fn: Option<String>,
    /// Source-location annotation type, when declared.
    pub source_location: Option<String>,
    /// Verbatim lines for the main output.
    pub includes: Vec<String>,
    /// Verbatim lines for the secondary output.
    pub python_includes: Vec<String>,
    /// Node blocks, parents before derived.
    pub nodes: Vec<ParsedNode>,
}

/// Parses schema text into its unresolved form.
///
/// # Errors
///
/// Fails with [`SchemaError`] on lexical or syntactic violations,
/// duplicate directives, or malformed names.
pub fn parse(source: &str, file: &str) -> Result<ParsedSchema, SchemaError> {
    let tokens = tokenize(source, file)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        file: file.to_owned(),
        schema: ParsedSchema {
            file: file.to_owned(),
            ..ParsedSchema::default()
        },
    };
    parser.schema()?;
    Ok(parser.schema)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
    schema: ParsedSchema,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof, which is never consumed.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn fail(&self, line: u32, message: String) -> SchemaError {
        SchemaError::Parse {
            file: self.file.clone(),
            line,
            message,
        }
    }

    fn unexpected(&self, expected: &str) -> SchemaError {
        let token = self.peek();
        self.fail(
            token.line,
            format!("expected {expected}, found {}", token.kind.describe()),
        )
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, u32), SchemaError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                let line = self.peek().line;
                self.advance();
                Ok((name, line))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_string(&mut self, expected: &str) -> Result<String, SchemaError> {
        match self.peek().kind.clone() {
            TokenKind::Str(text) => {
                self.advance();
                Ok(text)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_punct(&mut self, kind: &TokenKind, expected: &str) -> Result<u32, SchemaError> {
        if &self.peek().kind == kind {
            let line = self.peek().line;
            self.advance();
            Ok(line)
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Collects consecutive documentation lines into one block.
    fn take_docs(&mut self) -> String {
        let mut lines: Vec<String> = Vec::new();
        while let TokenKind::Doc(text) = &self.peek().kind {
            lines.push(text.clone());
            self.advance();
        }
        lines.join("\n").trim().to_owned()
    }

    fn schema(&mut self) -> Result<(), SchemaError> {
        loop {
            let doc = self.take_docs();
            match self.peek().kind.clone() {
                TokenKind::Eof => {
                    return Ok(());
                }
                TokenKind::Ident(name) => {
                    if self.is_directive(&name) {
                        self.directive(&name, doc)?;
                    } else {
                        self.node_block(doc, None)?;
                    }
                }
                _ => return Err(self.unexpected("a directive or node block")),
            }
        }
    }

    fn is_directive(&self, name: &str) -> bool {
        matches!(
            name,
            "source"
                | "python"
                | "namespace"
                | "support"
                | "initialize_function"
                | "serdes_functions"
                | "location"
                | "include"
                | "python_include"
        )
    }

    fn set_once(
        file: &str,
        slot: &mut Option<String>,
        value: String,
        directive: &'static str,
        line: u32,
    ) -> Result<(), SchemaError> {
        if slot.is_some() {
            return Err(SchemaError::DuplicateDirective {
                file: file.to_owned(),
                line,
                directive,
            });
        }
        *slot = Some(value);
        Ok(())
    }

    fn directive(&mut self, name: &str, doc: String) -> Result<(), SchemaError> {
        let (_, line) = self.expect_ident("a directive")?;
        match name {
            "source" => {
                if !self.schema.source_doc.is_empty() {
                    return Err(SchemaError::DuplicateDirective {
                        file: self.file.clone(),
                        line,
                        directive: "source",
                    });
                }
                self.schema.source_doc = doc;
            }
            "python" => {
                if !self.schema.python_doc.is_empty() {
                    return Err(SchemaError::DuplicateDirective {
                        file: self.file.clone(),
                        line,
                        directive: "python",
                    });
                }
                self.schema.python_doc = doc;
            }
            "namespace" => {
                let (module, _) = self.expect_ident("a module name")?;
                if !self.schema.module_name.is_empty() {
                    return Err(SchemaError::DuplicateDirective {
                        file: self.file.clone(),
                        line,
                        directive: "namespace",
                    });
                }
                self.schema.module_name = module;
                if let TokenKind::Str(_) = self.peek().kind {
                    self.schema.module_doc = self.expect_string("a namespace doc string")?;
                }
            }
            "support" => {
                let (path, _) = self.expect_ident("a support library path")?;
                Self::set_once(&self.file, &mut self.schema.support_path, path, "support", line)?;
            }
            "initialize_function" => {
                let (path, _) = self.expect_ident("an initialize function path")?;
                Self::set_once(
                    &self.file,
                    &mut self.schema.initialize_fn,
                    path,
                    "initialization function",
                    line,
                )?;
            }
            "serdes_functions" => {
                let (ser, _) = self.expect_ident("a serialize function path")?;
                let (des, _) = self.expect_ident("a deserialize function path")?;
                Self::set_once(
                    &self.file,
                    &mut self.schema.serialize_fn,
                    ser,
                    "serialize/deserialize function",
                    line,
                )?;
                self.schema.deserialize_fn = Some(des);
            }
            "location" => {
                let (path, _) = self.expect_ident("a source location type")?;
                Self::set_once(
                    &self.file,
                    &mut self.schema.source_location,
                    path,
                    "source location object",
                    line,
                )?;
            }
            "include" => {
                let text = self.expect_string("an include string")?;
                self.schema.includes.push(text);
            }
            "python_include" => {
                let text = self.expect_string("an include string")?;
                self.schema.python_includes.push(text);
            }
            _ => {
                return Err(self.fail(line, format!("unknown directive `{name}`")));
            }
        }
        Ok(())
    }

    fn node_block(&mut self, doc: String, parent: Option<usize>) -> Result<(), SchemaError> {
        let (name, line) = self.expect_ident("a node name")?;
        if name.contains("::")
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(self.fail(line, format!("node name `{name}` must be snake_case")));
        }
        self.expect_punct(&TokenKind::LBrace, "`{`")?;

        let index = self.schema.nodes.len();
        self.schema.nodes.push(ParsedNode {
            snake_name: name,
            doc,
            parent,
            fields: Vec::new(),
            order: Vec::new(),
            is_error_marker: false,
            line,
        });

        loop {
            let item_doc = self.take_docs();
            match self.peek().kind.clone() {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Ident(word) => match word.as_str() {
                    "error" => {
                        self.advance();
                        self.expect_punct(&TokenKind::Semi, "`;`")?;
                        self.schema.nodes[index].is_error_marker = true;
                    }
                    "reorder" => {
                        self.advance();
                        self.expect_punct(&TokenKind::LParen, "`(`")?;
                        loop {
                            let (field, _) = self.expect_ident("a field name")?;
                            self.schema.nodes[index].order.push(field);
                            if self.peek().kind == TokenKind::Comma {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                        self.expect_punct(&TokenKind::RParen, "`)`")?;
                        self.expect_punct(&TokenKind::Semi, "`;`")?;
                    }
                    _ => {
                        // Field or nested node: decided by the token
                        // after the name.
                        let after = self
                            .tokens
                            .get(self.pos + 1)
                            .map(|t| t.kind.clone());
                        if after == Some(TokenKind::LBrace) {
                            self.node_block(item_doc, Some(index))?;
                        } else {
                            let field = self.field(item_doc)?;
                            self.schema.nodes[index].fields.push(field);
                        }
                    }
                },
                TokenKind::Eof => {
                    return Err(self.fail(line, "unterminated node block".to_owned()));
                }
                _ => return Err(self.unexpected("a field, nested node, or `}`")),
            }
        }
    }

    fn field(&mut self, doc: String) -> Result<ParsedField, SchemaError> {
        let (name, line) = self.expect_ident("a field name")?;
        self.expect_punct(&TokenKind::Colon, "`:`")?;

        let (first, _) = self.expect_ident("a type")?;
        let (kind, type_path, is_ext) = if let Some(kind) = EdgeKind::from_keyword(&first) {
            self.expect_punct(&TokenKind::Lt, "`<`")?;
            let (mut path, _) = self.expect_ident("a node or primitive type")?;
            let mut is_ext = false;
            if path == "ext" {
                is_ext = true;
                let (inner, _) = self.expect_ident("a primitive type")?;
                path = inner;
            }
            self.expect_punct(&TokenKind::Gt, "`>`")?;
            (Some(kind), path, is_ext)
        } else if first == "ext" {
            let (path, _) = self.expect_ident("a primitive type")?;
            (None, path, true)
        } else {
            (None, first, false)
        };

        self.expect_punct(&TokenKind::Semi, "`;`")?;
        Ok(ParsedField {
            name,
            doc,
            kind,
            type_path,
            is_ext,
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
# Generated structures.
source

namespace demo "A demo module."
initialize_function primitives::initialize

# The root.
root {
    # Required child.
    child: Exactly<leaf>;
    # A number.
    count: primitives::Int;

    # A nested node.
    leaf {
        error;
        reorder(count, child);
    }
}
"#;

    #[test]
    fn parses_directives_and_nesting() {
        let schema = parse(SCHEMA, "demo.tree").unwrap();
        assert_eq!(schema.source_doc, "Generated structures.");
        assert_eq!(schema.module_name, "demo");
        assert_eq!(schema.module_doc, "A demo module.");
        assert_eq!(schema.initialize_fn.as_deref(), Some("primitives::initialize"));

        assert_eq!(schema.nodes.len(), 2);
        let root = &schema.nodes[0];
        assert_eq!(root.snake_name, "root");
        assert_eq!(root.doc, "The root.");
        assert_eq!(root.parent, None);
        assert_eq!(root.fields.len(), 2);
        assert_eq!(root.fields[0].kind, Some(EdgeKind::Exactly));
        assert_eq!(root.fields[0].type_path, "leaf");
        assert_eq!(root.fields[1].kind, None);
        assert_eq!(root.fields[1].type_path, "primitives::Int");

        let leaf = &schema.nodes[1];
        assert_eq!(leaf.parent, Some(0));
        assert!(leaf.is_error_marker);
        assert_eq!(leaf.order, vec!["count".to_owned(), "child".to_owned()]);
    }

    #[test]
    fn rejects_unknown_directives() {
        let err = parse("frobnicate foo\nroot {}", "demo.tree").unwrap_err();
        // An unknown top-level identifier is parsed as a node block and
        // trips on the missing `{`.
        assert!(matches!(err, SchemaError::Parse { .. }));
    }

    #[test]
    fn rejects_duplicate_directives() {
        let err = parse(
            "initialize_function a\ninitialize_function b\n",
            "demo.tree",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateDirective { .. }));
    }

    #[test]
    fn rejects_uppercase_node_names() {
        let err = parse("Root {}", "demo.tree").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
    }

    #[test]
    fn parses_ext_markers() {
        let schema = parse(
            "initialize_function f\nnode_a { x: Maybe<ext width>; y: ext height; }",
            "demo.tree",
        )
        .unwrap();
        let fields = &schema.nodes[0].fields;
        assert_eq!(fields[0].kind, Some(EdgeKind::Maybe));
        assert!(fields[0].is_ext);
        assert_eq!(fields[0].type_path, "width");
        assert_eq!(fields[1].kind, None);
        assert!(fields[1].is_ext);
        assert_eq!(fields[1].type_path, "height");
    }
}
