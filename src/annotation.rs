use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category assumed when an annotation arrives in the legacy flat shape
/// (`{phrase, type, suggestion}` with no hierarchy object).
pub const GENERAL_CATEGORY: &str = "General Bias";

/// Default label for hierarchy levels the detector left blank.
pub const GENERAL_LABEL: &str = "General";

/// One detected bias instance as produced by the upstream detector.
///
/// The detector is an external collaborator; its output is tolerated rather
/// than validated. A missing hierarchy is not an error, and a bare `type`
/// field (the legacy shape) is folded under [`GENERAL_CATEGORY`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BiasAnnotation {
    pub phrase: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<BiasHierarchy>,
    #[serde(
        default,
        rename = "type",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BiasHierarchy {
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(
        default,
        rename = "type",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
}

/// A hierarchy with every level filled in, ready for keying and graph
/// insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHierarchy {
    pub category: String,
    pub subcategory: String,
    pub kind: String,
}

impl BiasAnnotation {
    /// Resolves the annotation's classification, defaulting blank levels and
    /// folding the legacy flat shape. Returns `None` when the annotation
    /// carries no usable category at all; callers treat that as malformed
    /// but non-fatal.
    pub fn resolved_hierarchy(&self) -> Option<ResolvedHierarchy> {
        if let Some(hierarchy) = &self.hierarchy {
            let category = hierarchy.category.trim();
            if !category.is_empty() {
                let subcategory = hierarchy
                    .subcategory
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(GENERAL_LABEL)
                    .to_string();
                let kind = match hierarchy.kind.as_deref() {
                    Some(label) => clean_bias_label(label)
                        .unwrap_or_else(|| GENERAL_CATEGORY.to_string()),
                    None => GENERAL_LABEL.to_string(),
                };
                return Some(ResolvedHierarchy {
                    category: category.to_string(),
                    subcategory,
                    kind,
                });
            }
        }

        let legacy = self.legacy_type.as_deref()?;
        Some(ResolvedHierarchy {
            category: GENERAL_CATEGORY.to_string(),
            subcategory: GENERAL_LABEL.to_string(),
            kind: clean_bias_label(legacy).unwrap_or_else(|| GENERAL_CATEGORY.to_string()),
        })
    }

    /// Deterministic slug correlating this annotation's text span with its
    /// leaf node in the hierarchy graph. Empty when the annotation has no
    /// usable hierarchy.
    pub fn hierarchy_key(&self) -> String {
        self.resolved_hierarchy()
            .map(|hierarchy| hierarchy.key())
            .unwrap_or_default()
    }
}

impl ResolvedHierarchy {
    pub fn category_id(&self) -> String {
        slug(&self.category)
    }

    pub fn subcategory_id(&self) -> String {
        slug(&format!("{}-{}", self.category, self.subcategory))
    }

    pub fn kind_id(&self) -> String {
        slug(&format!(
            "{}-{}-{}",
            self.category, self.subcategory, self.kind
        ))
    }

    /// The hierarchy key is the leaf node id: category, subcategory and type
    /// joined with hyphens, lower-cased, whitespace collapsed to single
    /// hyphens. Hyphens already inside labels are not escaped, so two
    /// different multi-word labels can in principle collide; that ambiguity
    /// is inherited from the upstream format and deliberately left alone.
    pub fn key(&self) -> String {
        self.kind_id()
    }
}

/// Lower-cases a label and collapses whitespace runs into single hyphens.
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_hyphen = false;
    for ch in label.trim().chars() {
        if ch.is_whitespace() {
            pending_hyphen = !out.is_empty();
            continue;
        }
        if pending_hyphen {
            out.push('-');
            pending_hyphen = false;
        }
        for lowered in ch.to_lowercase() {
            out.push(lowered);
        }
    }
    out
}

fn duplicate_bias_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"(?i)\s*Bias\s*Bias\s*$").expect("trailing bias pattern"),
            Regex::new(r"(?i)^\s*Bias\s*Bias\b\s*").expect("leading bias pattern"),
        )
    })
}

/// Normalizes a bias type label from the detector: strips a duplicated
/// leading or trailing "Bias" token, collapses whitespace, and rejects
/// empty or "not applicable" labels by returning `None`.
pub fn clean_bias_label(label: &str) -> Option<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("not applicable") {
        return None;
    }

    let (trailing, leading) = duplicate_bias_patterns();
    let cleaned = trailing.replace(trimmed, " Bias");
    let cleaned = leading.replace(&cleaned, "Bias ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(category: &str, subcategory: Option<&str>, kind: Option<&str>) -> BiasAnnotation {
        BiasAnnotation {
            phrase: "a phrase".to_string(),
            suggestion: "a suggestion".to_string(),
            hierarchy: Some(BiasHierarchy {
                category: category.to_string(),
                subcategory: subcategory.map(str::to_string),
                kind: kind.map(str::to_string),
            }),
            legacy_type: None,
        }
    }

    #[test]
    fn key_slugs_full_hierarchy() {
        let annotation = annotation("Human Bias", Some("Cognitive"), Some("Implicit bias"));
        assert_eq!(
            annotation.hierarchy_key(),
            "human-bias-cognitive-implicit-bias"
        );
    }

    #[test]
    fn blank_levels_default_to_general() {
        let annotation = annotation("Human Bias", None, None);
        let hierarchy = annotation.resolved_hierarchy().unwrap();
        assert_eq!(hierarchy.subcategory, "General");
        assert_eq!(hierarchy.kind, "General");
        assert_eq!(annotation.hierarchy_key(), "human-bias-general-general");
    }

    #[test]
    fn unusable_type_label_falls_back_to_general_bias() {
        let ann = annotation("Human Bias", Some("Cognitive"), Some("Not Applicable"));
        let hierarchy = ann.resolved_hierarchy().unwrap();
        assert_eq!(hierarchy.kind, "General Bias");
        assert_eq!(
            ann.hierarchy_key(),
            "human-bias-cognitive-general-bias"
        );

        let blank = annotation("Human Bias", None, Some("   "));
        assert_eq!(blank.resolved_hierarchy().unwrap().kind, "General Bias");
    }

    #[test]
    fn legacy_flat_shape_is_folded_under_general_bias() {
        let parsed: BiasAnnotation = serde_json::from_str(
            r#"{"phrase": "old phrasing", "type": "Gender Bias", "suggestion": "new phrasing"}"#,
        )
        .unwrap();
        let hierarchy = parsed.resolved_hierarchy().unwrap();
        assert_eq!(hierarchy.category, "General Bias");
        assert_eq!(hierarchy.subcategory, "General");
        assert_eq!(hierarchy.kind, "Gender Bias");
    }

    #[test]
    fn missing_category_resolves_to_none() {
        let bare = BiasAnnotation {
            phrase: "something".to_string(),
            suggestion: String::new(),
            hierarchy: None,
            legacy_type: None,
        };
        assert!(bare.resolved_hierarchy().is_none());
        assert_eq!(bare.hierarchy_key(), "");
    }

    #[test]
    fn clean_label_strips_duplicate_bias_tokens() {
        assert_eq!(
            clean_bias_label("Confirmation Bias Bias").as_deref(),
            Some("Confirmation Bias")
        );
        assert_eq!(
            clean_bias_label("Confirmation BiasBias").as_deref(),
            Some("Confirmation Bias")
        );
        assert_eq!(
            clean_bias_label("BiasBias Framing").as_deref(),
            Some("Bias Framing")
        );
        assert_eq!(
            clean_bias_label("Bias Bias Framing").as_deref(),
            Some("Bias Framing")
        );
        assert_eq!(
            clean_bias_label("  spaced   out  ").as_deref(),
            Some("spaced out")
        );
        assert_eq!(clean_bias_label("Not Applicable"), None);
        assert_eq!(clean_bias_label("   "), None);
    }
}
