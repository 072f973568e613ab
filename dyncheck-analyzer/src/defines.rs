// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object-like macro definitions visible at a given point of a translation unit.

use crate::error::{AnalyzerError, Result};
use crate::lexer::{self, Directive, Token, TokenKind};
use std::collections::HashMap;
use tracing::trace;

/// Definitions that are always available, as if the usual headers had been included.
const PRELUDE: &str = "\
#define true 1
#define false 0
#define bool _Bool
#define __bool_true_false_are_defined 1
#define NULL ((void *)0)
";

#[derive(Debug, Clone, PartialEq)]
enum Macro {
    Object(Vec<Token>),
    /// Function-like macros are never expanded, so their uses stay opaque.
    Function,
}

#[derive(Debug, Clone, Default)]
pub struct Defines {
    macros: HashMap<String, Macro>,
}

impl Defines {
    /// Definitions from the prelude (`true`, `false`, `bool` and `NULL`).
    pub fn with_prelude() -> Result<Self> {
        let mut defines = Defines::default();
        for directive in lexer::tokenize("<prelude>", PRELUDE)?.directives {
            defines.apply(&directive);
        }
        Ok(defines)
    }

    /// Add a definition given as `NAME` or `NAME=VALUE`, like the `-D` compiler option.
    /// `NAME` alone is defined as `1`.
    pub fn define(&mut self, definition: &str) -> Result<()> {
        let (name, value) = definition.split_once('=').unwrap_or((definition, "1"));
        let invalid = |reason: &str| AnalyzerError::Define {
            definition: definition.to_string(),
            reason: reason.to_string(),
        };
        let is_ident = name.chars().next().is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
            && name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric());
        if !is_ident {
            return Err(invalid("macro name must be an identifier"));
        }
        let lexed = lexer::tokenize("<command line>", value)
            .map_err(|err| invalid(&err.to_string()))?;
        if !lexed.directives.is_empty() {
            return Err(invalid("macro value cannot contain a directive"));
        }
        self.macros.insert(name.to_string(), Macro::Object(lexed.tokens));
        Ok(())
    }

    /// Replay a `#define` or `#undef` directive. Other directives are ignored.
    pub fn apply(&mut self, directive: &Directive) {
        let (Some(keyword), Some(name)) = (
            directive.tokens.first().and_then(Token::ident),
            directive.tokens.get(1).and_then(Token::ident),
        ) else {
            return;
        };
        match keyword {
            "define" => {
                let body = &directive.tokens[2..];
                // A function-like macro has its parenthesis right after the name.
                let function_like = body.first().is_some_and(|token| {
                    token.is_punct(lexer::Punct::LParen)
                        && token.span.start == directive.tokens[1].span.end
                });
                let definition =
                    if function_like { Macro::Function } else { Macro::Object(body.to_vec()) };
                trace!(name, line = directive.line, function_like, "define");
                self.macros.insert(name.to_string(), definition);
            }
            "undef" => {
                trace!(name, line = directive.line, "undef");
                self.macros.remove(name);
            }
            _ => {}
        }
    }

    #[cfg(test)]
    fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Replace object-like macros in `tokens`, recursively. A macro is not expanded inside its
    /// own expansion. Expanded tokens take the position of the macro use.
    pub fn expand(&self, tokens: &[Token]) -> Vec<Token> {
        let mut expanded = Vec::with_capacity(tokens.len());
        self.expand_into(tokens, &mut Vec::new(), &mut expanded);
        expanded
    }

    fn expand_into(&self, tokens: &[Token], active: &mut Vec<String>, out: &mut Vec<Token>) {
        for token in tokens {
            let body = match &token.kind {
                TokenKind::Ident(name) if !active.contains(name) => match self.macros.get(name) {
                    Some(Macro::Object(body)) => Some((name, body)),
                    _ => None,
                },
                _ => None,
            };
            let Some((name, body)) = body else {
                out.push(token.clone());
                continue;
            };
            let relocated: Vec<Token> = body
                .iter()
                .map(|body_token| Token {
                    kind: body_token.kind.clone(),
                    line: token.line,
                    column: token.column,
                    span: token.span.clone(),
                })
                .collect();
            active.push(name.clone());
            self.expand_into(&relocated, active, out);
            active.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{IntLiteral, Punct};

    fn expand_src(defines: &Defines, src: &str) -> Vec<TokenKind> {
        let tokens = lexer::tokenize("t.c", src).unwrap().tokens;
        defines.expand(&tokens).into_iter().map(|t| t.kind).collect()
    }

    fn int(value: u128) -> TokenKind {
        TokenKind::Int(IntLiteral { value, unsigned: false, longs: 0, decimal: true })
    }

    fn replay(src: &str) -> Defines {
        let mut defines = Defines::with_prelude().unwrap();
        for directive in lexer::tokenize("t.c", src).unwrap().directives {
            defines.apply(&directive);
        }
        defines
    }

    #[test]
    fn check_prelude() {
        let defines = Defines::with_prelude().unwrap();
        assert_eq!(expand_src(&defines, "false"), vec![int(0)]);
        assert_eq!(expand_src(&defines, "true"), vec![int(1)]);
        assert_eq!(expand_src(&defines, "NULL").len(), 7);
        assert_eq!(expand_src(&defines, "bool"), vec![TokenKind::Ident("_Bool".into())]);
    }

    #[test]
    fn check_recursive_expansion() {
        let defines = replay("#define A B + 1\n#define B 2\n#define SELF SELF\n");
        assert_eq!(expand_src(&defines, "A"), vec![int(2), TokenKind::Punct(Punct::Plus), int(1)]);
        assert_eq!(expand_src(&defines, "SELF"), vec![TokenKind::Ident("SELF".into())]);
    }

    #[test]
    fn check_function_like_macros() {
        let defines = replay("#define F(x) x\n#define G (x)\n");
        assert_eq!(expand_src(&defines, "F").len(), 1);
        assert_eq!(expand_src(&defines, "G").len(), 3);
        assert!(defines.is_defined("F"));
    }

    #[test]
    fn check_undef() {
        let defines = replay("#define LIMIT 4\n#undef LIMIT\n#undef false\n");
        assert!(!defines.is_defined("LIMIT"));
        assert_eq!(expand_src(&defines, "false"), vec![TokenKind::Ident("false".into())]);
    }

    #[test]
    fn check_command_line_definitions() {
        let mut defines = Defines::default();
        defines.define("DEBUG").unwrap();
        defines.define("LIMIT=0x10").unwrap();
        assert_eq!(expand_src(&defines, "DEBUG"), vec![int(1)]);
        assert_eq!(
            expand_src(&defines, "LIMIT"),
            vec![TokenKind::Int(IntLiteral {
                value: 16,
                unsigned: false,
                longs: 0,
                decimal: false,
            })]
        );
        assert!(defines.define("1X=2").is_err());
        assert!(defines.define("=2").is_err());
        assert!(defines.define("X='a").is_err());
    }
}
