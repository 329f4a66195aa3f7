//! Recursive-descent RQL parser.
//!
//! Grammar, informally:
//!
//! ```text
//! query      := segment ('&' segment)*
//! segment    := assignment | expr (',' expr)*
//! assignment := name '=' value          name=value query-parameter sugar
//! expr       := quoted | token | token '(' [expr (',' expr)*] ')'
//! ```
//!
//! `name=value` becomes `name(v1,v2,..)` when `name` is an RQL function and
//! `eq(name,value)` otherwise, so `sort=-date,name&status=open` and
//! `sort(-date,name),eq(status,open)` produce the same terms.

use tracing::debug;

use super::term::{TermArena, TermId};
use crate::error::{ApiError, Result};
use crate::query::clause::is_function;

/// Parse a raw RQL query string into one root term per top-level expression.
pub fn parse(arena: &mut TermArena, input: &str) -> Result<Vec<TermId>> {
    let chars: Vec<char> = input.chars().collect();
    let mut roots = Vec::new();

    if chars.iter().all(|c| c.is_whitespace()) {
        return Ok(roots);
    }

    for (start, end) in split_top_level(&chars, (0, chars.len()), '&') {
        parse_segment(arena, &chars, start, end, &mut roots)?;
    }

    debug!(terms = roots.len(), input, "parsed rql");
    Ok(roots)
}

/// Parse already-split query parameters (`key`, `value`) with the same sugar rules.
///
/// A parameter with an empty value is treated as a bare RQL expression, which is
/// how `?eq(status,open)` arrives from most HTTP stacks.
pub fn parse_params<K, V>(arena: &mut TermArena, params: &[(K, V)]) -> Result<Vec<TermId>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut roots = Vec::new();
    for (key, value) in params {
        let key = key.as_ref();
        let value = value.as_ref();
        let text = if value.is_empty() {
            key.to_string()
        } else {
            format!("{}={}", key, value)
        };
        let chars: Vec<char> = text.chars().collect();
        parse_segment(arena, &chars, 0, chars.len(), &mut roots)?;
    }
    debug!(terms = roots.len(), params = params.len(), "parsed rql parameters");
    Ok(roots)
}

fn parse_segment(
    arena: &mut TermArena,
    chars: &[char],
    start: usize,
    end: usize,
    roots: &mut Vec<TermId>,
) -> Result<()> {
    if chars[start..end].iter().all(|c| c.is_whitespace()) {
        return Err(ApiError::syntax("empty term", start));
    }

    if let Some(eq) = assignment_split(chars, start, end) {
        roots.push(parse_assignment(arena, chars, start, eq, end)?);
        return Ok(());
    }

    for (s, e) in split_top_level(chars, (start, end), ',') {
        let mut cursor = Cursor { chars, pos: s, end: e };
        cursor.skip_ws();
        if cursor.pos == e {
            return Err(ApiError::syntax("empty term", s));
        }
        let id = cursor.expr(arena)?;
        cursor.finish()?;
        roots.push(id);
    }
    Ok(())
}

fn parse_assignment(
    arena: &mut TermArena,
    chars: &[char],
    start: usize,
    eq: usize,
    end: usize,
) -> Result<TermId> {
    let name: String = chars[start..eq].iter().collect::<String>().trim().to_string();
    if name.is_empty() {
        return Err(ApiError::syntax("empty parameter name", start));
    }
    let value_start = eq + 1;

    let lowered = name.to_ascii_lowercase();
    if is_function(&lowered) {
        let mut args = Vec::new();
        for (s, e) in split_top_level(chars, (value_start, end), ',') {
            let mut cursor = Cursor { chars, pos: s, end: e };
            let id = cursor.expr(arena)?;
            cursor.finish()?;
            args.push(id);
        }
        return Ok(arena.function(lowered, args));
    }

    let raw: String = chars[value_start..end].iter().collect();
    let trimmed = raw.trim();
    let value = match unquote(trimmed) {
        Some(inner) => arena.leaf(inner, true),
        None => arena.leaf(trimmed, false),
    };
    let column = arena.leaf(name, false);
    Ok(arena.function("eq", vec![column, value]))
}

/// Strip matching outer quotes and resolve backslash escapes.
fn unquote(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Position of a depth-0 `=` that precedes any parenthesis, if present.
fn assignment_split(chars: &[char], start: usize, end: usize) -> Option<usize> {
    for (i, c) in chars.iter().enumerate().take(end).skip(start) {
        match c {
            '(' | ')' | '\'' | '"' | ',' => return None,
            '=' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split `[start, end)` on `separator` wherever it appears outside quotes and parentheses.
///
/// Never fails: unbalanced input simply isn't split, and the expression parser
/// reports the precise error afterwards.
fn split_top_level(chars: &[char], (start, end): (usize, usize), separator: char) -> Vec<(usize, usize)> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut at_token_start = true;
    let mut piece_start = start;

    for i in start..end {
        let c = chars[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' if at_token_start => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if c == separator && depth == 0 => {
                pieces.push((piece_start, i));
                piece_start = i + 1;
            }
            _ => {}
        }
        if !c.is_whitespace() {
            at_token_start = matches!(c, '(' | ',' | '=' | '&');
        }
    }
    pieces.push((piece_start, end));
    pieces
}

struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
    end: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        if self.pos < self.end {
            Some(self.chars[self.pos])
        } else {
            None
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Fail if anything but whitespace remains.
    fn finish(&mut self) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            None => Ok(()),
            Some(')') => Err(ApiError::syntax("unbalanced parenthesis: unexpected ')'", self.pos)),
            Some(c) => Err(ApiError::syntax(format!("unexpected '{}' after term", c), self.pos)),
        }
    }

    fn expr(&mut self, arena: &mut TermArena) -> Result<TermId> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            None | Some('(') | Some(',') | Some(')') => {
                return Err(ApiError::syntax("empty token", start));
            }
            Some(q @ ('\'' | '"')) => {
                let value = self.quoted(q)?;
                self.skip_ws();
                if self.peek() == Some('(') {
                    return Err(ApiError::syntax("a quoted value can't be used as a function name", self.pos));
                }
                return Ok(arena.leaf(value, true));
            }
            Some(_) => {}
        }

        while let Some(c) = self.peek() {
            if matches!(c, '(' | ',' | ')') {
                break;
            }
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect::<String>().trim_end().to_string();
        self.skip_ws();

        if self.peek() != Some('(') {
            return Ok(arena.leaf(token, false));
        }

        self.pos += 1;
        let mut children = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            return Err(ApiError::syntax(format!("'{}()' has no arguments", token), start));
        }
        loop {
            children.push(self.expr(arena)?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                None => {
                    return Err(ApiError::syntax(
                        format!("unbalanced parenthesis: '{}(' is never closed", token),
                        start,
                    ));
                }
                Some(c) => {
                    return Err(ApiError::syntax(format!("unexpected '{}'", c), self.pos));
                }
            }
        }
        Ok(arena.function(token.to_ascii_lowercase(), children))
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => match self.peek() {
                    Some(next) => {
                        value.push(next);
                        self.pos += 1;
                    }
                    None => break,
                },
                _ if c == quote => return Ok(value),
                _ => value.push(c),
            }
        }
        Err(ApiError::syntax("unterminated quoted value", start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn render_all(input: &str) -> Vec<String> {
        let mut arena = TermArena::new();
        let roots = parse(&mut arena, input).unwrap();
        roots.iter().map(|r| arena.render(*r)).collect()
    }

    fn syntax_position(input: &str) -> usize {
        let mut arena = TermArena::new();
        match parse(&mut arena, input) {
            Err(ApiError::Syntax { position, .. }) => position,
            other => panic!("expected syntax error for {input:?}, got {other:?}"),
        }
    }

    #[rstest]
    #[case("eq(status,open)", vec!["eq(status,open)"])]
    #[case("eq(status,open),sort(-date,name)", vec!["eq(status,open)", "sort(-date,name)"])]
    #[case("  EQ ( status , open )  ", vec!["eq(status,open)"])]
    #[case("and(eq(a,1),or(eq(b,2),eq(c,3)))", vec!["and(eq(a,1),or(eq(b,2),eq(c,3)))"])]
    #[case("eq(name,John Smith)", vec!["eq(name,John Smith)"])]
    fn test_parse_expressions(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(render_all(input), expected);
    }

    #[test]
    fn test_empty_input_has_no_terms() {
        assert!(render_all("   ").is_empty());
    }

    #[test]
    fn test_quoted_values_keep_commas_and_parens() {
        let mut arena = TermArena::new();
        let roots = parse(&mut arena, r#"eq(title,'a, (b)'),eq(x,"say \"hi\"")"#).unwrap();

        let value = arena.child(roots[0], 1).unwrap();
        assert_eq!(arena.token(value), "a, (b)");
        assert!(arena.get(value).is_quoted());

        let value = arena.child(roots[1], 1).unwrap();
        assert_eq!(arena.token(value), "say \"hi\"");
    }

    #[test]
    fn test_leaf_case_is_preserved() {
        let mut arena = TermArena::new();
        let roots = parse(&mut arena, "EQ(shipCountry,France)").unwrap();
        assert_eq!(arena.token(roots[0]), "eq");
        assert_eq!(arena.token(arena.children(roots[0])[0]), "shipCountry");
    }

    #[rstest]
    #[case("sort=-date,name&status=open", vec!["sort(-date,name)", "eq(status,open)"])]
    #[case("pageSize=10&page=2", vec!["pagesize(10)", "page(2)"])]
    #[case("eq(a,b)&city='Reims, FR'", vec!["eq(a,b)", "eq(city,'Reims, FR')"])]
    #[case("sort(-a),eq(b,c)&limit=5", vec!["sort(-a)", "eq(b,c)", "limit(5)"])]
    fn test_parameter_sugar(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(render_all(input), expected);
    }

    #[test]
    fn test_parse_params_matches_raw_string() {
        let mut arena = TermArena::new();
        let roots = parse_params(
            &mut arena,
            &[("sort", "-date,name"), ("eq(status,open)", ""), ("shipCity", "Reims")],
        )
        .unwrap();
        let rendered: Vec<String> = roots.iter().map(|r| arena.render(*r)).collect();
        assert_eq!(rendered, vec!["sort(-date,name)", "eq(status,open)", "eq(shipCity,Reims)"]);
    }

    #[rstest]
    #[case("eq(a,b", 0)]
    #[case("eq(a,b))", 7)]
    #[case("eq(a,,b)", 5)]
    #[case("eq(a,b),", 8)]
    #[case("(a)", 0)]
    #[case("eq(a,'open)", 5)]
    #[case("eq(a,b) x", 8)]
    #[case("=x", 0)]
    #[case("eq(a,b),count( )", 8)]
    fn test_syntax_errors(#[case] input: &str, #[case] position: usize) {
        assert_eq!(syntax_position(input), position);
    }

    #[test]
    fn test_syntax_errors_are_client_errors() {
        let mut arena = TermArena::new();
        let err = parse(&mut arena, "eq(a").unwrap_err();
        assert_eq!(err.status().code(), 400);
    }
}
