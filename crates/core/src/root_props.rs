//! Translation of editor root props into structured page fields.
//!
//! The visual editor keeps page-level settings as a flat, free-form map on
//! the root node of its content tree. A mapping table decides which of those
//! keys land where in the structured page record. The default table can be
//! overridden per deployment: a custom mapping with the same `from` key
//! replaces the default one, other custom mappings are appended.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::field_path::set_nested_value;

/// Failure raised by a mapping transform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransformError(pub String);

/// A value conversion applied before a root prop is written to its target.
pub type TransformFn = Arc<dyn Fn(&Value) -> Result<Value, TransformError> + Send + Sync>;

/// Maps one root prop key onto a dot path in the structured page record.
#[derive(Clone)]
pub struct FieldMapping {
    pub from: String,
    pub to: String,
    pub transform: Option<TransformFn>,
}

impl FieldMapping {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: TransformFn) -> Self {
        self.transform = Some(transform);
        self
    }

    fn apply(&self, value: &Value) -> Result<Value, CoreError> {
        match &self.transform {
            Some(transform) => transform(value).map_err(|err| CoreError::Transform {
                from: self.from.clone(),
                message: err.0,
            }),
            None => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Built-in transforms used by the default table.
pub mod transforms {
    use std::sync::Arc;

    use serde_json::Value;

    use super::{TransformError, TransformFn};

    /// Accepts booleans and the strings `"true"` / `"false"`.
    pub fn boolean() -> TransformFn {
        Arc::new(|value| match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            other => Err(TransformError(format!("expected a boolean, got {other}"))),
        })
    }

    /// Accepts numbers and numeric strings.
    pub fn number() -> TransformFn {
        Arc::new(|value| match value {
            Value::Number(n) => Ok(Value::Number(n.clone())),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| TransformError(format!("'{s}' is not a number"))),
            other => Err(TransformError(format!("expected a number, got {other}"))),
        })
    }

    /// Trims string values; other values pass through.
    pub fn trimmed() -> TransformFn {
        Arc::new(|value| match value {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            other => Ok(other.clone()),
        })
    }
}

/// The mapping table applied when no custom mappings are configured.
pub fn default_mappings() -> Vec<FieldMapping> {
    vec![
        FieldMapping::new("title", "title").with_transform(transforms::trimmed()),
        FieldMapping::new("slug", "slug").with_transform(transforms::trimmed()),
        FieldMapping::new("pageLayout", "pageLayout"),
        FieldMapping::new("isHomepage", "isHomepage").with_transform(transforms::boolean()),
        FieldMapping::new("metaTitle", "meta.title"),
        FieldMapping::new("metaDescription", "meta.description"),
        FieldMapping::new("canonicalUrl", "meta.canonicalUrl"),
        FieldMapping::new("ogImage", "meta.ogImage"),
        FieldMapping::new("noIndex", "meta.noIndex").with_transform(transforms::boolean()),
        FieldMapping::new("noFollow", "meta.noFollow").with_transform(transforms::boolean()),
        FieldMapping::new("excludeFromSitemap", "meta.excludeFromSitemap")
            .with_transform(transforms::boolean()),
        FieldMapping::new("isConversionPage", "conversionTracking.isConversionPage")
            .with_transform(transforms::boolean()),
        FieldMapping::new("conversionType", "conversionTracking.conversionType"),
        FieldMapping::new("conversionValue", "conversionTracking.conversionValue")
            .with_transform(transforms::number()),
    ]
}

/// Build the effective mapping set.
///
/// Defaults are inserted first; a custom mapping sharing a `from` key
/// replaces the default in place, custom-only keys follow in custom order.
pub fn merge_mappings(custom: Option<&[FieldMapping]>) -> Vec<FieldMapping> {
    let mut effective: IndexMap<String, FieldMapping> = default_mappings()
        .into_iter()
        .map(|mapping| (mapping.from.clone(), mapping))
        .collect();

    for mapping in custom.unwrap_or_default() {
        effective.insert(mapping.from.clone(), mapping.clone());
    }

    effective.into_values().collect()
}

/// Translate `root_props` into a sparse structured-field patch using the
/// default table overlaid with `custom`.
pub fn translate(
    root_props: &Map<String, Value>,
    custom: Option<&[FieldMapping]>,
) -> Result<Map<String, Value>, CoreError> {
    apply_mappings(root_props, &merge_mappings(custom))
}

/// Translate `root_props` with an already-merged mapping set.
///
/// Props absent from the input are skipped so the patch never clears a
/// stored value the edit did not mention. An explicit `null` prop is
/// present and is written through.
pub fn apply_mappings(
    root_props: &Map<String, Value>,
    mappings: &[FieldMapping],
) -> Result<Map<String, Value>, CoreError> {
    let mut patch = Map::new();
    for mapping in mappings {
        let Some(value) = root_props.get(&mapping.from) else {
            continue;
        };
        let value = mapping.apply(value)?;
        set_nested_value(&mut patch, &mapping.to, value);
    }
    Ok(patch)
}

/// Holds the effective mapping set for a collection.
#[derive(Debug, Clone)]
pub struct RootPropsTranslator {
    mappings: Vec<FieldMapping>,
}

impl Default for RootPropsTranslator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RootPropsTranslator {
    pub fn new(custom: Option<&[FieldMapping]>) -> Self {
        Self {
            mappings: merge_mappings(custom),
        }
    }

    pub fn translate(
        &self,
        root_props: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        apply_mappings(root_props, &self.mappings)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
