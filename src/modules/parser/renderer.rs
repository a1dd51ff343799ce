//! Recursive rendering of raw configuration structures

use serde_json::Value;
use strata_core::{Result, StrataError};
use strata_types::{KeySegment, Keypath};

use crate::context::RenderContext;
use crate::template::render_template;

/// Keypath patterns whose subtrees are kept verbatim
///
/// Patterns are `.`-separated segments. `*` matches exactly one segment and
/// `**` matches any number of segments, including none. Sequence positions
/// count as segments and are matched by their index or by a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderExemptions {
    patterns: Vec<Vec<String>>,
}

impl RenderExemptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().split('.').map(str::to_string).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true if the value at `keypath` must not be rendered
    pub fn matches(&self, keypath: &Keypath) -> bool {
        let segments: Vec<String> = keypath
            .segments()
            .iter()
            .map(|segment| match segment {
                KeySegment::Key(key) => key.clone(),
                KeySegment::Index(index) => index.to_string(),
            })
            .collect();
        self.patterns
            .iter()
            .any(|pattern| pattern_matches(pattern, &segments))
    }
}

fn pattern_matches(pattern: &[String], segments: &[String]) -> bool {
    match pattern.split_first() {
        None => segments.is_empty(),
        Some((head, rest)) if head == "**" => {
            (0..=segments.len()).any(|skip| pattern_matches(rest, &segments[skip..]))
        }
        Some((head, rest)) => match segments.split_first() {
            Some((segment, remaining)) => {
                (head == "*" || head == segment) && pattern_matches(rest, remaining)
            }
            None => false,
        },
    }
}

/// Render every string leaf of `raw` against `context`
///
/// Mapping keys are left as written. Values under exempt keypaths are
/// returned untouched.
pub fn render(context: &RenderContext, raw: &Value, exemptions: &RenderExemptions) -> Result<Value> {
    render_at(context, raw, exemptions, &Keypath::root())
}

/// Like [`render`], but reports keypaths relative to `prefix`
pub fn render_under(
    context: &RenderContext,
    raw: &Value,
    exemptions: &RenderExemptions,
    prefix: &Keypath,
) -> Result<Value> {
    render_at(context, raw, exemptions, prefix)
}

fn render_at(
    context: &RenderContext,
    raw: &Value,
    exemptions: &RenderExemptions,
    keypath: &Keypath,
) -> Result<Value> {
    if !keypath.is_root() && exemptions.matches(keypath) {
        return Ok(raw.clone());
    }

    match raw {
        Value::String(source) => render_template(source, context)
            .map_err(|message| StrataError::render(keypath.clone(), message)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| render_at(context, item, exemptions, &keypath.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                let value = render_at(context, value, exemptions, &keypath.key(key))?;
                rendered.insert(key.clone(), value);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// A rendering context bound for reuse across several structures
#[derive(Debug, Clone)]
pub struct ConfigRenderer {
    context: RenderContext,
}

impl ConfigRenderer {
    pub fn new(context: RenderContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Render a whole structure with no exemptions
    pub fn render_value(&self, raw: &Value) -> Result<Value> {
        render(&self.context, raw, &RenderExemptions::none())
    }

    /// Render a structure that lives at `prefix` in a larger document
    pub fn render_at(&self, raw: &Value, prefix: &Keypath, exemptions: &RenderExemptions) -> Result<Value> {
        render_under(&self.context, raw, exemptions, prefix)
    }
}
