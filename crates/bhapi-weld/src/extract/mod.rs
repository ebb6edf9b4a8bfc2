//! Signature extraction from provider C source
//!
//! Exported functions are the top-level `static` function definitions whose
//! name carries the export prefix, e.g.
//!
//! ```c
//! static bhc_dtype BhAPI_dtype(const void *ary) {
//! ```
//!
//! Anything else (prototypes, static variables, functions without the
//! prefix, definitions nested in blocks) is ignored. A definition that does
//! carry the prefix but cannot be parsed is an error rather than being
//! skipped.

pub mod lexer;

use crate::ir::FunctionSignature;
use lexer::{render, tokenize, Token, TokenKind};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during signature extraction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The source could not be tokenized
    #[error("line {line}: {message}")]
    Lex { line: usize, message: String },

    /// The exported name is just the prefix
    #[error("line {line}: exported function has an empty name after `{prefix}_`")]
    EmptyName { line: usize, prefix: String },

    /// No return type between `static` and the name
    #[error("line {line}: exported function {name} has no return type")]
    MissingReturnType { line: usize, name: String },

    /// Name is not followed by a parameter list
    #[error("line {line}: exported function {name} has no parameter list")]
    MissingParameterList { line: usize, name: String },

    /// Parentheses of the parameter list never close
    #[error("line {line}: unbalanced parameter list for exported function {name}")]
    UnbalancedParameters { line: usize, name: String },

    /// Tokens between the parameter list and the body
    #[error("line {line}: unexpected `{found}` after the parameter list of {name}")]
    UnexpectedTokens {
        line: usize,
        name: String,
        found: String,
    },

    /// Source ended inside an exported definition
    #[error("line {line}: exported function {name} is not terminated")]
    Unterminated { line: usize, name: String },
}

/// Extract exported function signatures in source order
///
/// Returns an empty list when nothing matches; whether that is acceptable is
/// up to the caller.
pub fn extract_signatures(
    source: &str,
    prefix: &str,
) -> Result<Vec<FunctionSignature>, ExtractError> {
    let tokens = tokenize(source)?;
    let export_prefix = format!("{}_", prefix);
    let mut signatures = Vec::new();

    // One entry per open brace; `true` marks an `extern "C" {` linkage block,
    // which does not nest its contents
    let mut scopes: Vec<bool> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        if tok.is_punct('{') {
            scopes.push(opens_linkage_block(&tokens, i));
        } else if tok.is_punct('}') {
            scopes.pop();
        } else if tok.is_ident("static") && scopes.iter().all(|&linkage| linkage) {
            let (end, terminator) = declaration_end(&tokens, i + 1);
            let decl = &tokens[i + 1..end];
            if let Some(sig) = parse_declaration(decl, terminator, &export_prefix, prefix)? {
                debug!(name = %sig.name, line = tok.line, "extracted exported function");
                signatures.push(sig);
            }
            // Resume at the terminator so braces are still counted
            i = end;
            continue;
        }
        i += 1;
    }

    Ok(signatures)
}

/// Whether the `{` at `open` follows `extern "<linkage>"`
fn opens_linkage_block(tokens: &[Token<'_>], open: usize) -> bool {
    open >= 2
        && tokens[open - 1].kind == TokenKind::Literal
        && tokens[open - 1].text.starts_with('"')
        && tokens[open - 2].is_ident("extern")
}

/// Find where a declaration ends: the first `{`, `;` or `=` outside parentheses
fn declaration_end<'a>(tokens: &[Token<'a>], start: usize) -> (usize, Option<Token<'a>>) {
    let mut parens = 0usize;
    for (offset, tok) in tokens[start..].iter().enumerate() {
        match tok.kind {
            TokenKind::Punct('(') => parens += 1,
            TokenKind::Punct(')') => parens = parens.saturating_sub(1),
            TokenKind::Punct('{') | TokenKind::Punct(';') | TokenKind::Punct('=')
                if parens == 0 =>
            {
                return (start + offset, Some(*tok));
            }
            _ => {}
        }
    }
    (tokens.len(), None)
}

/// Position of the declared name: the identifier right before the first
/// top-level `(`, or the last identifier when there is no parameter list
fn declarator_name(decl: &[Token<'_>]) -> Option<usize> {
    match decl.iter().position(|t| t.is_punct('(')) {
        Some(0) => None,
        Some(open) => Some(open - 1).filter(|&pos| decl[pos].kind == TokenKind::Ident),
        None => decl.iter().rposition(|t| t.kind == TokenKind::Ident),
    }
}

fn parse_declaration<'a>(
    decl: &[Token<'a>],
    terminator: Option<Token<'a>>,
    export_prefix: &str,
    prefix: &str,
) -> Result<Option<FunctionSignature>, ExtractError> {
    let Some(name_pos) = declarator_name(decl) else {
        return Ok(None);
    };
    let name_tok = decl[name_pos];
    let Some(name) = name_tok.text.strip_prefix(export_prefix) else {
        return Ok(None);
    };
    let name = name.to_string();
    let line = name_tok.line;
    let followed_by_paren = decl.get(name_pos + 1).is_some_and(|t| t.is_punct('('));

    match terminator {
        Some(t) if t.is_punct('{') => {}
        // Prototypes and variables are not definitions
        Some(_) => return Ok(None),
        None if followed_by_paren => return Err(ExtractError::Unterminated { line, name }),
        None => return Ok(None),
    }

    if name.is_empty() {
        return Err(ExtractError::EmptyName {
            line,
            prefix: prefix.to_string(),
        });
    }
    if name_pos == 0 {
        return Err(ExtractError::MissingReturnType { line, name });
    }
    if !followed_by_paren {
        return Err(ExtractError::MissingParameterList { line, name });
    }

    let params_start = name_pos + 1;
    let params_end =
        matching_paren(decl, params_start).ok_or_else(|| ExtractError::UnbalancedParameters {
            line,
            name: name.clone(),
        })?;

    if let Some(extra) = decl.get(params_end + 1) {
        return Err(ExtractError::UnexpectedTokens {
            line: extra.line,
            name,
            found: extra.text.to_string(),
        });
    }

    Ok(Some(FunctionSignature {
        return_type: render(&decl[..name_pos]),
        name,
        parameter_list: render(&decl[params_start..=params_end]),
    }))
}

fn matching_paren(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, tok) in tokens[open..].iter().enumerate() {
        if tok.is_punct('(') {
            depth += 1;
        } else if tok.is_punct(')') {
            depth -= 1;
            if depth == 0 {
                return Some(open + offset);
            }
        }
    }
    None
}
