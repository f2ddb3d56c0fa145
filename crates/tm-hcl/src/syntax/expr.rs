//! Expression capture and literal classification.

use crate::ast::{Expression, LiteralValue, NumberText};
use crate::error::HclError;

use super::cursor::Cursor;

/// Captures the expression after `=` up to the end of the line (or the
/// closing `}` of a one-line block), honouring brackets, strings, and
/// heredocs that span lines.
pub(crate) fn scan(cursor: &mut Cursor<'_>, nested: bool) -> Result<Expression, HclError> {
    let start = cursor.offset();
    cursor.skip_inline_space();
    if cursor.starts_with("<<") {
        return heredoc(cursor, start);
    }
    let mut depth = 0_usize;
    loop {
        match cursor.peek() {
            None => break,
            Some('\n' | '#') if depth == 0 => break,
            Some('}') if depth == 0 && nested => break,
            Some('/') if depth == 0 && matches!(cursor.peek_second(), Some('/' | '*')) => break,
            Some('"') => skip_string(cursor)?,
            Some('(' | '[' | '{') => {
                depth += 1;
                cursor.bump();
            }
            Some(')' | ']' | '}') => {
                depth = depth.saturating_sub(1);
                cursor.bump();
            }
            Some(_) => {
                cursor.bump();
            }
        }
    }
    let source = cursor
        .slice_from(start)
        .trim_end_matches([' ', '\t', '\r']);
    if source.trim().is_empty() {
        return Err(cursor.error("expected an expression after '='"));
    }
    Ok(classify(source))
}

/// Classifies captured source text.
///
/// # Example
///
/// ```
/// use tm_hcl::LiteralValue;
/// use tm_hcl::syntax::expr::classify;
///
/// let expr = classify(" true");
/// assert_eq!(expr.literal_value(), Some(&LiteralValue::Bool(true)));
/// assert_eq!(classify(" \"a-${var.b}\"").constant_value(), None);
/// ```
#[must_use]
pub fn classify(source: &str) -> Expression {
    let text = source.trim();
    match text {
        "true" => Expression::literal(source, LiteralValue::Bool(true)),
        "false" => Expression::literal(source, LiteralValue::Bool(false)),
        "null" => Expression::literal(source, LiteralValue::Null),
        _ if is_number(text) => {
            Expression::literal(source, LiteralValue::Number(NumberText::new(text)))
        }
        _ if text.strip_prefix('-').is_some_and(is_number) => {
            Expression::constant(source, LiteralValue::Number(NumberText::new(text)))
        }
        _ => match string_body(text).and_then(unescape) {
            Some(value) => Expression::constant(source, LiteralValue::String(value)),
            None => Expression::dynamic(source),
        },
    }
}

fn is_number(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_ascii_digit()) && text.parse::<f64>().is_ok()
}

/// Inner text of `text` when the whole of it is one quoted string.
fn string_body(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('"')?;
    let mut escaped = false;
    for (index, c) in inner.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => {
                let end = index + c.len_utf8();
                return (end == inner.len()).then(|| inner.get(..index)).flatten();
            }
            _ => {}
        }
    }
    None
}

/// Resolves escapes; `None` when the template interpolates or uses
/// directives, since those need an evaluation context.
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(escape(&mut chars)?),
            '$' | '%' => {
                let mut ahead = chars.clone();
                match (ahead.next(), ahead.next()) {
                    (Some(next), Some('{')) if next == c => {
                        out.push(c);
                        out.push('{');
                        chars = ahead;
                    }
                    (Some('{'), _) => return None,
                    _ => out.push(c),
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn escape(chars: &mut std::str::Chars<'_>) -> Option<char> {
    match chars.next()? {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '"' => Some('"'),
        '\\' => Some('\\'),
        'u' => unicode(chars, 4),
        'U' => unicode(chars, 8),
        _ => None,
    }
}

fn unicode(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}

/// Reads a quoted label and returns its value.
pub(crate) fn quoted_literal(cursor: &mut Cursor<'_>) -> Result<String, HclError> {
    let start = cursor.offset();
    skip_string(cursor)?;
    let text = cursor.slice_from(start);
    string_body(text)
        .and_then(unescape)
        .ok_or_else(|| cursor.error("labels must be plain strings"))
}

fn skip_string(cursor: &mut Cursor<'_>) -> Result<(), HclError> {
    cursor.bump();
    loop {
        match cursor.peek() {
            None | Some('\n') => return Err(cursor.error("unterminated string")),
            Some('\\') => {
                cursor.bump();
                cursor.bump();
            }
            Some('"') => {
                cursor.bump();
                return Ok(());
            }
            Some('$' | '%') if cursor.peek_second() == Some('{') => {
                cursor.bump();
                cursor.bump();
                skip_interpolation(cursor)?;
            }
            Some(_) => {
                cursor.bump();
            }
        }
    }
}

fn skip_interpolation(cursor: &mut Cursor<'_>) -> Result<(), HclError> {
    let mut depth = 1_usize;
    while depth > 0 {
        match cursor.peek() {
            None => return Err(cursor.error("unterminated interpolation")),
            Some('"') => skip_string(cursor)?,
            Some('{') => {
                depth += 1;
                cursor.bump();
            }
            Some('}') => {
                depth -= 1;
                cursor.bump();
            }
            Some(_) => {
                cursor.bump();
            }
        }
    }
    Ok(())
}

fn heredoc(cursor: &mut Cursor<'_>, start: usize) -> Result<Expression, HclError> {
    cursor.bump_str("<<");
    let strip_indent = cursor.peek() == Some('-');
    if strip_indent {
        cursor.bump();
    }
    let marker = cursor.identifier();
    if marker.is_empty() {
        return Err(cursor.error("expected a heredoc marker"));
    }
    cursor.skip_inline_space();
    if cursor.bump() != Some('\n') {
        return Err(cursor.error("heredoc marker must end the line"));
    }

    let content_start = cursor.offset();
    let content_end = loop {
        if cursor.peek().is_none() {
            return Err(cursor.error(&format!("unterminated heredoc, expected '{marker}'")));
        }
        let line_start = cursor.offset();
        cursor.skip_line();
        let line = cursor.slice_from(line_start);
        if line.trim() == marker {
            cursor.bump();
            break line_start;
        }
        cursor.bump();
    };

    let source = cursor.slice_from(start);
    let content = cursor.slice(content_start, content_end);
    if content.contains("${") || content.contains("%{") {
        return Ok(Expression::dynamic(source));
    }
    let value = if strip_indent {
        strip_common_indent(content)
    } else {
        content.to_owned()
    };
    Ok(Expression::constant(source, LiteralValue::String(value)))
}

fn strip_common_indent(content: &str) -> String {
    let indent = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    content
        .split_inclusive('\n')
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start_matches([' ', '\t'])))
        .collect()
}
