// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lexer for the tree schema language.
//!
//! The token stream is small: possibly `::`-qualified identifiers,
//! string literals, `#` documentation comments (kept verbatim, one
//! token per line), and single-character punctuation. Keywords are not
//! distinguished here; the parser matches identifier text.

use crate::error::SchemaError;

/// A lexical token with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token's kind and payload.
    pub kind: TokenKind,
    /// 1-based source line of the token's first character.
    pub line: u32,
}

/// Token kinds of the schema language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or `::`-qualified path.
    Ident(String),
    /// String literal, unescaped.
    Str(String),
    /// One line of `#` documentation, trimmed.
    Doc(String),
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `:`
    Colon,
    /// `;`
    Semi,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Short description used in parse diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Str(_) => "string literal".to_owned(),
            TokenKind::Doc(_) => "documentation comment".to_owned(),
            TokenKind::LBrace => "`{`".to_owned(),
            TokenKind::RBrace => "`}`".to_owned(),
            TokenKind::Lt => "`<`".to_owned(),
            TokenKind::Gt => "`>`".to_owned(),
            TokenKind::Colon => "`:`".to_owned(),
            TokenKind::Semi => "`;`".to_owned(),
            TokenKind::LParen => "`(`".to_owned(),
            TokenKind::RParen => "`)`".to_owned(),
            TokenKind::Comma => "`,`".to_owned(),
            TokenKind::Eof => "end of input".to_owned(),
        }
    }
}

/// Tokenizes `source`, reporting errors against `file`.
///
/// # Errors
///
/// Fails with [`SchemaError::Parse`] on stray characters, unterminated
/// strings, or malformed `::` paths.
pub fn tokenize(source: &str, file: &str) -> Result<Vec<Token>, SchemaError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line: u32 = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                let start = line;
                chars.next();
                let mut text = String::new();
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                        break;
                    }
                    text.push(next);
                }
                tokens.push(Token {
                    kind: TokenKind::Doc(text.trim().to_owned()),
                    line: start,
                });
            }
            '"' => {
                let start = line;
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some(next) = chars.next() {
                    match next {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let escaped = chars.next().ok_or_else(|| SchemaError::Parse {
                                file: file.to_owned(),
                                line,
                                message: "unterminated string escape".to_owned(),
                            })?;
                            match escaped {
                                'n' => text.push('\n'),
                                't' => text.push('\t'),
                                '"' => text.push('"'),
                                '\\' => text.push('\\'),
                                other => {
                                    return Err(SchemaError::Parse {
                                        file: file.to_owned(),
                                        line,
                                        message: format!("unknown string escape `\\{other}`"),
                                    })
                                }
                            }
                        }
                        '\n' => {
                            line += 1;
                            text.push('\n');
                        }
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(SchemaError::Parse {
                        file: file.to_owned(),
                        line: start,
                        message: "unterminated string literal".to_owned(),
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    line: start,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = line;
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else if next == ':' {
                        // Only a full `::` extends a path; a single `:`
                        // is the field separator.
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if lookahead.peek() == Some(&':') {
                            chars.next();
                            chars.next();
                            name.push_str("::");
                            if !chars
                                .peek()
                                .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_')
                            {
                                return Err(SchemaError::Parse {
                                    file: file.to_owned(),
                                    line,
                                    message: format!("dangling `::` after `{name}`"),
                                });
                            }
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(name),
                    line: start,
                });
            }
            '{' | '}' | '<' | '>' | ':' | ';' | '(' | ')' | ',' => {
                chars.next();
                let kind = match c {
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '<' => TokenKind::Lt,
                    '>' => TokenKind::Gt,
                    ':' => TokenKind::Colon,
                    ';' => TokenKind::Semi,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    _ => TokenKind::Comma,
                };
                tokens.push(Token { kind, line });
            }
            other => {
                return Err(SchemaError::Parse {
                    file: file.to_owned(),
                    line,
                    message: format!("unexpected character `{other}`"),
                })
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, "test.tree")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_fields_and_paths() {
        let tokens = kinds("letter: primitives::Letter;");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("letter".into()),
                TokenKind::Colon,
                TokenKind::Ident("primitives::Letter".into()),
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_doc_comments_per_line() {
        let tokens = kinds("# first\n# second\nsystem {}");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Doc("first".into()),
                TokenKind::Doc("second".into()),
                TokenKind::Ident("system".into()),
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_strings_with_escapes() {
        let tokens = kinds(r#"include "use crate::primitives;\n""#);
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("include".into()),
                TokenKind::Str("use crate::primitives;\n".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_numbers() {
        let tokens = tokenize("a\n\nb", "test.tree").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn rejects_stray_characters() {
        let err = tokenize("system @ {}", "test.tree").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { line: 1, .. }));
    }

    #[test]
    fn rejects_dangling_path_separator() {
        let err = tokenize("a: foo::;", "test.tree").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
    }
}
