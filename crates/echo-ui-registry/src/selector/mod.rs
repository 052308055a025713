// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Selector intermediate representation and normalization.
//!
//! Every accepted selector form (text, a single constraint object, a list of
//! constraint objects) normalizes to a [`Selector`]: an ordered chain of
//! [`MatchSpec`] steps, outermost ancestor first. Normalization is the only
//! place selector errors can arise, so a bad selector never starts a
//! traversal.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::component::NTYPE_KEY;

mod parse;

/// Error raised while normalizing a selector.
///
/// Offsets are byte offsets into the selector text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// A `[` was never closed.
    #[error("unclosed '[' at byte {0}")]
    UnclosedBracket(usize),
    /// A `]` appeared without a matching `[`.
    #[error("unexpected ']' at byte {0}")]
    UnexpectedCloseBracket(usize),
    /// A `[` appeared inside a bracket section.
    #[error("nested '[' at byte {0}")]
    NestedBracket(usize),
    /// A constraint pair had no `=`.
    #[error("missing '=' in constraint {pair:?} at byte {offset}")]
    MissingEquals {
        /// Offending pair text (trimmed).
        pair: String,
        /// Start of the pair.
        offset: usize,
    },
    /// A constraint pair had an empty property name.
    #[error("empty property name at byte {0}")]
    EmptyKey(usize),
    /// A quoted value was never closed.
    #[error("unterminated quote at byte {0}")]
    UnterminatedQuote(usize),
    /// A character that cannot appear at this position.
    #[error("unexpected {ch:?} at byte {offset}")]
    UnexpectedChar {
        /// The character.
        ch: char,
        /// Where it appeared.
        offset: usize,
    },
    /// A single-step selector was required but the text held several steps.
    #[error("expected a single selector step, found {0}")]
    MultipleSteps(usize),
    /// A selector list contained something other than an object.
    #[error("selector list element {0} is not an object")]
    NonObjectStep(usize),
    /// A JSON value that is not a string, object, list or null.
    #[error("unsupported selector form: {0}")]
    UnsupportedForm(&'static str),
}

/// One step of a selector: an optional type name plus property equalities.
///
/// The empty spec matches every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSpec {
    /// Type that must appear somewhere in the component's lineage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Properties that must resolve to exactly these values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, Value>,
}

impl MatchSpec {
    /// Spec that matches every component.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Spec that matches any component whose lineage contains `name`.
    pub fn of_type(name: impl Into<String>) -> Self {
        Self {
            type_name: Some(name.into()),
            constraints: BTreeMap::new(),
        }
    }

    /// Adds a property constraint.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Builds a spec from a constraint object.
    ///
    /// A string-valued `ntype` key becomes the type name; every other key is
    /// a property constraint.
    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut spec = Self::any();
        for (key, value) in object {
            spec.insert(key.clone(), value.clone());
        }
        spec
    }

    /// Adds a constraint, routing a string `ntype` into the type name when
    /// none is set yet.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match value {
            Value::String(name) if key == NTYPE_KEY && self.type_name.is_none() => {
                self.type_name = Some(name);
            }
            value => {
                self.constraints.insert(key, value);
            }
        }
    }

    /// Returns `true` if this spec matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_name.is_none() && self.constraints.is_empty()
    }
}

/// Renders selector text.
///
/// The text parses back to an equal spec only when every constraint value
/// is a string without both quote kinds; other values render as bare JSON
/// and parse back as strings.
impl fmt::Display for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.type_name {
            f.write_str(name)?;
        }
        if self.constraints.is_empty() {
            return if self.type_name.is_none() {
                f.write_str("[]")
            } else {
                Ok(())
            };
        }
        f.write_str("[")?;
        for (i, (key, value)) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match value {
                Value::String(s) if s.contains('"') => write!(f, "{key}='{s}'")?,
                Value::String(s) => write!(f, "{key}=\"{s}\"")?,
                other => write!(f, "{key}={other}")?,
            }
        }
        f.write_str("]")
    }
}

/// Ordered descendant chain of match specs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(Vec<MatchSpec>);

impl Selector {
    /// Parses selector text.
    pub fn parse(src: &str) -> Result<Self, SelectorError> {
        parse::parse(src)
    }

    /// Wraps already-normalized steps.
    #[must_use]
    pub fn from_steps(steps: Vec<MatchSpec>) -> Self {
        Self(steps)
    }

    /// Normalizes a JSON selector: text, a constraint object, a list of
    /// constraint objects, or `null` (no steps).
    pub fn from_value(value: &Value) -> Result<Self, SelectorError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(src) => Self::parse(src),
            Value::Object(object) => Ok(Self(vec![MatchSpec::from_object(object)])),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(object) => Ok(MatchSpec::from_object(object)),
                    _ => Err(SelectorError::NonObjectStep(i)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            Value::Bool(_) => Err(SelectorError::UnsupportedForm("bool")),
            Value::Number(_) => Err(SelectorError::UnsupportedForm("number")),
        }
    }

    /// Steps, outermost first.
    #[must_use]
    pub fn steps(&self) -> &[MatchSpec] {
        &self.0
    }

    /// Consumes the selector, returning its steps.
    #[must_use]
    pub fn into_steps(self) -> Vec<MatchSpec> {
        self.0
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for a selector without steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Collapses to a single spec: no steps yields the empty spec, more than
    /// one is an error.
    pub fn into_single(self) -> Result<MatchSpec, SelectorError> {
        let len = self.0.len();
        let mut steps = self.0.into_iter();
        match (steps.next(), len) {
            (None, _) => Ok(MatchSpec::any()),
            (Some(spec), 1) => Ok(spec),
            (Some(_), n) => Err(SelectorError::MultipleSteps(n)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Anything the registry accepts as a selector.
pub trait IntoSelector {
    /// Normalizes `self` into a selector chain.
    fn into_selector(self) -> Result<Selector, SelectorError>;
}

impl IntoSelector for Selector {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(self)
    }
}

impl IntoSelector for &Selector {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(self.clone())
    }
}

impl IntoSelector for MatchSpec {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(Selector(vec![self]))
    }
}

impl IntoSelector for &MatchSpec {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(Selector(vec![self.clone()]))
    }
}

impl IntoSelector for Vec<MatchSpec> {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(Selector(self))
    }
}

impl IntoSelector for &str {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Selector::parse(self)
    }
}

impl IntoSelector for &String {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Selector::parse(self)
    }
}

impl IntoSelector for &Value {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Selector::from_value(self)
    }
}

impl IntoSelector for Value {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Selector::from_value(&self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_form_routes_ntype_into_type_name() {
        let sel = Selector::from_value(&json!({"ntype": "button", "text": "ok"})).unwrap();
        assert_eq!(sel.steps(), [MatchSpec::of_type("button").with("text", "ok")]);
    }

    #[test]
    fn object_form_keeps_typed_values() {
        let sel = Selector::from_value(&json!({"hidden": false, "flex": 1})).unwrap();
        let spec = &sel.steps()[0];
        assert_eq!(spec.type_name, None);
        assert_eq!(spec.constraints.get("hidden"), Some(&json!(false)));
        assert_eq!(spec.constraints.get("flex"), Some(&json!(1)));
    }

    #[test]
    fn list_form_is_a_chain_and_rejects_strings() {
        let sel = Selector::from_value(&json!([{"ntype": "toolbar"}, {"ntype": "button"}])).unwrap();
        assert_eq!(sel.len(), 2);
        assert_eq!(
            Selector::from_value(&json!([{"ntype": "toolbar"}, "button"])),
            Err(SelectorError::NonObjectStep(1))
        );
        assert_eq!(
            Selector::from_value(&json!(3)),
            Err(SelectorError::UnsupportedForm("number"))
        );
        assert!(Selector::from_value(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn into_single_normalization() {
        assert_eq!(
            "".into_selector().unwrap().into_single(),
            Ok(MatchSpec::any())
        );
        assert_eq!(
            "form".into_selector().unwrap().into_single(),
            Ok(MatchSpec::of_type("form"))
        );
        assert_eq!(
            "form field".into_selector().unwrap().into_single(),
            Err(SelectorError::MultipleSteps(2))
        );
    }

    #[test]
    fn display_is_lossy_for_typed_and_mixed_quote_values() {
        let typed = MatchSpec::of_type("b").with("n", 1);
        assert_eq!(typed.to_string(), "b[n=1]");
        assert_eq!(
            Selector::parse(&typed.to_string()).unwrap().into_single(),
            Ok(MatchSpec::of_type("b").with("n", "1"))
        );

        let mixed = MatchSpec::of_type("b").with("t", "a'b\"c");
        assert!(Selector::parse(&mixed.to_string()).is_err());
    }

    #[test]
    fn display_renders_parseable_text() {
        let sel = Selector::from_steps(vec![
            MatchSpec::of_type("toolbar"),
            MatchSpec::any().with("text", "Try me, now"),
            MatchSpec::any(),
        ]);
        let text = sel.to_string();
        assert_eq!(text, r#"toolbar [text="Try me, now"] []"#);
        assert_eq!(Selector::parse(&text).unwrap(), sel);
    }
}
