// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hand-written parser for the selector mini-language.
//!
//! ```text
//! selector := step (ws+ step)*
//! step     := type_name? ('[' (pair (',' pair)*)? ']')?
//! pair     := key '=' value
//! ```
//!
//! Whitespace inside brackets belongs to the pair, so `button[text=Try me]`
//! is one step. Values may be wrapped in `"` or `'`; the quotes are dropped.
use std::iter::Peekable;
use std::str::CharIndices;

use serde_json::Value;

use super::{MatchSpec, Selector, SelectorError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Comma,
    Close,
}

enum RawPair {
    Blank(usize),
    Pair(String, String),
}

pub(super) fn parse(src: &str) -> Result<Selector, SelectorError> {
    let mut parser = Parser {
        src,
        chars: src.char_indices().peekable(),
    };
    let mut steps = Vec::new();
    loop {
        parser.skip_whitespace();
        match parser.peek() {
            None => break,
            Some((offset, ']')) => return Err(SelectorError::UnexpectedCloseBracket(offset)),
            Some(_) => steps.push(parser.step()?),
        }
    }
    Ok(Selector::from_steps(steps))
}

/// Characters allowed in a type name.
fn is_type_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

struct Parser<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn offset(&mut self) -> usize {
        self.peek().map_or(self.src.len(), |(offset, _)| offset)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn step(&mut self) -> Result<MatchSpec, SelectorError> {
        let mut spec = MatchSpec::any();
        let mut name = String::new();
        while let Some((_, c)) = self.peek() {
            if !is_type_char(c) {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        if !name.is_empty() {
            spec.type_name = Some(name);
        }
        if let Some((open, '[')) = self.peek() {
            self.chars.next();
            self.brackets(open, &mut spec)?;
        }
        match self.peek() {
            None => Ok(spec),
            Some((_, c)) if c.is_whitespace() => Ok(spec),
            Some((offset, ']')) => Err(SelectorError::UnexpectedCloseBracket(offset)),
            Some((offset, ch)) => Err(SelectorError::UnexpectedChar { ch, offset }),
        }
    }

    fn brackets(&mut self, open: usize, spec: &mut MatchSpec) -> Result<(), SelectorError> {
        let mut seen_pair = false;
        loop {
            let (pair, terminator) = self.pair(open)?;
            match pair {
                RawPair::Blank(_) if terminator == Terminator::Close && !seen_pair => {
                    return Ok(());
                }
                RawPair::Blank(offset) => {
                    return Err(SelectorError::MissingEquals {
                        pair: String::new(),
                        offset,
                    });
                }
                RawPair::Pair(key, value) => spec.insert(key, Value::String(value)),
            }
            seen_pair = true;
            if terminator == Terminator::Close {
                return Ok(());
            }
        }
    }

    fn pair(&mut self, open: usize) -> Result<(RawPair, Terminator), SelectorError> {
        self.skip_whitespace();
        let start = self.offset();
        let mut key = String::new();
        loop {
            match self.chars.next() {
                None => return Err(SelectorError::UnclosedBracket(open)),
                Some((offset, '[')) => return Err(SelectorError::NestedBracket(offset)),
                Some((_, '=')) => break,
                Some((_, c @ (',' | ']'))) => {
                    let terminator = if c == ',' {
                        Terminator::Comma
                    } else {
                        Terminator::Close
                    };
                    let key = key.trim();
                    if key.is_empty() {
                        return Ok((RawPair::Blank(start), terminator));
                    }
                    return Err(SelectorError::MissingEquals {
                        pair: key.to_owned(),
                        offset: start,
                    });
                }
                Some((offset, ch @ ('"' | '\''))) => {
                    return Err(SelectorError::UnexpectedChar { ch, offset });
                }
                Some((_, c)) => key.push(c),
            }
        }
        let key = key.trim().to_owned();
        if key.is_empty() {
            return Err(SelectorError::EmptyKey(start));
        }

        self.skip_whitespace();
        let (value, terminator) = match self.peek() {
            Some((quote_at, quote @ ('"' | '\''))) => {
                self.chars.next();
                let value = self.quoted(quote, quote_at)?;
                self.skip_whitespace();
                (value, self.terminator(open)?)
            }
            _ => self.unquoted(open)?,
        };
        Ok((RawPair::Pair(key, value), terminator))
    }

    fn quoted(&mut self, quote: char, quote_at: usize) -> Result<String, SelectorError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(SelectorError::UnterminatedQuote(quote_at)),
                Some((_, c)) if c == quote => return Ok(value),
                Some((_, c)) => value.push(c),
            }
        }
    }

    fn unquoted(&mut self, open: usize) -> Result<(String, Terminator), SelectorError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(SelectorError::UnclosedBracket(open)),
                Some((offset, '[')) => return Err(SelectorError::NestedBracket(offset)),
                Some((_, ',')) => return Ok((value.trim_end().to_owned(), Terminator::Comma)),
                Some((_, ']')) => return Ok((value.trim_end().to_owned(), Terminator::Close)),
                Some((_, c)) => value.push(c),
            }
        }
    }

    fn terminator(&mut self, open: usize) -> Result<Terminator, SelectorError> {
        match self.chars.next() {
            None => Err(SelectorError::UnclosedBracket(open)),
            Some((_, ',')) => Ok(Terminator::Comma),
            Some((_, ']')) => Ok(Terminator::Close),
            Some((offset, '[')) => Err(SelectorError::NestedBracket(offset)),
            Some((offset, ch)) => Err(SelectorError::UnexpectedChar { ch, offset }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps(src: &str) -> Vec<MatchSpec> {
        parse(src).unwrap().into_steps()
    }

    #[test]
    fn bare_type_name() {
        assert_eq!(steps("textfield"), [MatchSpec::of_type("textfield")]);
    }

    #[test]
    fn descendant_chain_with_constraints() {
        let parsed = steps("  toolbar   button[text=Try me, icon=people] ");
        assert_eq!(
            parsed,
            [
                MatchSpec::of_type("toolbar"),
                MatchSpec::of_type("button")
                    .with("text", "Try me")
                    .with("icon", "people"),
            ]
        );
    }

    #[test]
    fn constraints_without_type_and_empty_brackets() {
        assert_eq!(steps("[name=email]"), [MatchSpec::any().with("name", "email")]);
        assert_eq!(steps("form[]"), [MatchSpec::of_type("form")]);
        assert_eq!(steps("[ ]"), [MatchSpec::any()]);
        assert!(steps("   ").is_empty());
    }

    #[test]
    fn quotes_are_stripped() {
        let parsed = steps(r#"button[text="a, b]", title='x "y"', empty=""]"#);
        assert_eq!(
            parsed,
            [MatchSpec::of_type("button")
                .with("text", "a, b]")
                .with("title", "x \"y\"")
                .with("empty", "")]
        );
    }

    #[test]
    fn values_stay_strings() {
        let parsed = steps("[count=1]");
        assert_eq!(parsed[0].constraints.get("count"), Some(&json!("1")));
    }

    #[test]
    fn ntype_pair_fills_missing_type_name() {
        assert_eq!(steps("[ntype=form]"), [MatchSpec::of_type("form")]);
        assert_eq!(
            steps("field[ntype=textfield]"),
            [MatchSpec::of_type("field").with("ntype", "textfield")]
        );
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        assert_eq!(parse("form[name=x"), Err(SelectorError::UnclosedBracket(4)));
        assert_eq!(parse("form]"), Err(SelectorError::UnexpectedCloseBracket(4)));
        assert_eq!(parse("a ]"), Err(SelectorError::UnexpectedCloseBracket(2)));
        assert_eq!(parse("a[b[c=d]]"), Err(SelectorError::NestedBracket(3)));
        assert_eq!(
            parse("a[name]"),
            Err(SelectorError::MissingEquals {
                pair: "name".into(),
                offset: 2
            })
        );
        assert!(matches!(
            parse("a[x=1,]"),
            Err(SelectorError::MissingEquals { .. })
        ));
        assert!(matches!(
            parse("a[x=1,,y=2]"),
            Err(SelectorError::MissingEquals { .. })
        ));
        assert_eq!(parse("a[=1]"), Err(SelectorError::EmptyKey(2)));
        assert_eq!(
            parse("a[x=1]b"),
            Err(SelectorError::UnexpectedChar { ch: 'b', offset: 6 })
        );
        assert_eq!(
            parse("a>b"),
            Err(SelectorError::UnexpectedChar { ch: '>', offset: 1 })
        );
        assert_eq!(
            parse("bütton"),
            Err(SelectorError::UnexpectedChar { ch: 'ü', offset: 1 })
        );
        assert_eq!(parse("a[x=\"1]"), Err(SelectorError::UnterminatedQuote(4)));
        assert_eq!(
            parse("a[x=\"1\"2]"),
            Err(SelectorError::UnexpectedChar { ch: '2', offset: 7 })
        );
    }
}
