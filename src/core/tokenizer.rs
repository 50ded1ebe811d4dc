//! Tokenizer for command lines.
//!
//! Splits on whitespace with support for quoted tokens. A single leading `/`
//! is accepted, so chat-style input (`/tp Alice`) and console input
//! (`tp Alice`) parse the same way.

use thiserror::Error;

use super::CommandArgs;

/// Tokenize error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("empty input")]
    EmptyInput,
    #[error("unterminated string at position {position}")]
    UnterminatedString { position: usize },
}

/// A parsed command line: the command label and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub label: String,
    pub args: CommandArgs,
}

/// Parse a full command line into label and arguments.
///
/// # Syntax
///
/// - Tokens are separated by whitespace
/// - Quoted strings (single or double) preserve whitespace
/// - Escape sequences inside quotes: `\"`, `\'`, `\\`
///
/// # Examples
///
/// ```ignore
/// let inv = parse_invocation(r#"/tp "Big Bob" Alice"#).unwrap();
/// assert_eq!(inv.label, "tp");
/// assert_eq!(inv.args[0].as_str(), "Big Bob");
/// assert_eq!(inv.args.len(), 2);
/// ```
pub fn parse_invocation(line: &str) -> Result<Invocation, TokenizeError> {
    let trimmed = line.trim();
    let body = trimmed.strip_prefix('/').unwrap_or(trimmed);

    let mut tokens = tokenize(body)?.into_iter();
    let label = tokens.next().ok_or(TokenizeError::EmptyInput)?;

    Ok(Invocation {
        label,
        args: CommandArgs::new(trimmed, tokens),
    })
}

/// Split `input` into unescaped tokens.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => continue,

            '"' | '\'' => {
                let quote = c;
                let mut token = String::new();
                let mut closed = false;

                while let Some((_, ch)) = chars.next() {
                    match ch {
                        ch if ch == quote => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped @ ('"' | '\'' | '\\'))) => token.push(escaped),
                            Some((_, other)) => {
                                token.push('\\');
                                token.push(other);
                            }
                            None => break,
                        },
                        _ => token.push(ch),
                    }
                }

                if !closed {
                    return Err(TokenizeError::UnterminatedString { position: start });
                }

                tokens.push(token);
            }

            _ => {
                let mut end = start + c.len_utf8();

                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_whitespace() || ch == '"' || ch == '\'' {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }

                tokens.push(input[start..end].to_string());
            }
        }
    }

    Ok(tokens)
}
