use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::BiasAnnotation;

/// A located character range in the source text matching one annotation's
/// phrase. Offsets are half-open byte indices into the text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocatedSpan {
    pub start: usize,
    pub end: usize,
    pub phrase: String,
    pub suggestion: String,
    pub hierarchy_key: String,
}

impl LocatedSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Maps each annotation's phrase onto a span of `text`.
///
/// Annotations are ordered by the position of their first occurrence; each
/// match then searches strictly forward from the previous span's end, so the
/// result is sorted, non-overlapping, and consumes duplicate phrases left to
/// right. Phrases the detector hallucinated (no occurrence in the remaining
/// tail) are dropped silently.
pub fn locate(text: &str, annotations: &[BiasAnnotation]) -> Vec<LocatedSpan> {
    let mut ordered: Vec<(usize, &BiasAnnotation)> = annotations
        .iter()
        .filter(|annotation| !annotation.phrase.is_empty())
        .filter_map(|annotation| {
            match text.find(&annotation.phrase) {
                Some(at) => Some((at, annotation)),
                None => {
                    debug!(phrase = %annotation.phrase, "phrase not present in text; dropping");
                    None
                }
            }
        })
        .collect();
    ordered.sort_by_key(|(at, _)| *at);

    let mut spans = Vec::with_capacity(ordered.len());
    let mut cursor = 0usize;

    for (_, annotation) in ordered {
        let Some(offset) = text[cursor..].find(&annotation.phrase) else {
            debug!(
                phrase = %annotation.phrase,
                cursor,
                "no remaining occurrence past previous span; dropping"
            );
            continue;
        };
        let start = cursor + offset;
        let end = start + annotation.phrase.len();
        spans.push(LocatedSpan {
            start,
            end,
            phrase: annotation.phrase.clone(),
            suggestion: annotation.suggestion.clone(),
            hierarchy_key: annotation.hierarchy_key(),
        });
        cursor = end;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(phrase: &str) -> BiasAnnotation {
        BiasAnnotation {
            phrase: phrase.to_string(),
            suggestion: String::new(),
            hierarchy: None,
            legacy_type: None,
        }
    }

    #[test]
    fn spans_are_sorted_and_non_overlapping() {
        let text = "alpha beta gamma delta";
        let spans = locate(text, &[plain("delta"), plain("alpha"), plain("gamma")]);
        assert_eq!(spans.len(), 3);
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(&text[spans[0].start..spans[0].end], "alpha");
        assert_eq!(&text[spans[2].start..spans[2].end], "delta");
    }

    #[test]
    fn duplicate_phrases_consume_occurrences_left_to_right() {
        let text = "cats are lazy and cats are slow";
        let spans = locate(text, &[plain("cats"), plain("cats")]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[1].start, 18);
    }

    #[test]
    fn surplus_duplicates_are_dropped() {
        let text = "one cat here";
        let spans = locate(text, &[plain("cat"), plain("cat")]);
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn unmatched_and_empty_phrases_are_excluded() {
        let text = "nothing interesting";
        let spans = locate(text, &[plain("unicorns"), plain(""), plain("nothing")]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].phrase, "nothing");
    }
}
