// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Identity-term subgroup tagging
//!
//! A row belongs to the subgroup of a term when the term occurs as a whole
//! word in its text (case-insensitive, Unicode word boundaries). Tags are kept
//! apart from the datasets, keyed by row id.

use crate::error::{EvalError, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// Membership of every row in one identity-term subgroup
#[derive(Debug, Clone)]
pub struct SubgroupTag {
    pub term: String,
    members: HashMap<String, bool>,
}

impl SubgroupTag {
    /// Whether the row with `id` belongs to the subgroup; unknown ids do not
    pub fn contains(&self, id: &str) -> bool {
        self.members.get(id).copied().unwrap_or(false)
    }

    /// Number of tagged rows
    pub fn size(&self) -> usize {
        self.members.values().filter(|&&tagged| tagged).count()
    }
}

/// Tags for all identity terms, in term-list order
#[derive(Debug, Clone, Default)]
pub struct SubgroupTags {
    tags: Vec<SubgroupTag>,
}

impl SubgroupTags {
    pub fn iter(&self) -> impl Iterator<Item = &SubgroupTag> {
        self.tags.iter()
    }

    pub fn get(&self, term: &str) -> Option<&SubgroupTag> {
        self.tags.iter().find(|t| t.term == term)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Compiled whole-word matchers for a list of identity terms
#[derive(Debug, Clone)]
pub struct SubgroupAnnotator {
    matchers: Vec<(String, Regex)>,
}

impl SubgroupAnnotator {
    /// Compile one `\b<term>\b` pattern per term.
    ///
    /// Unless `escape_terms` is set the term is inserted as-is, so regex
    /// metacharacters inside a term keep their meaning.
    pub fn new(terms: &[String], escape_terms: bool) -> Result<Self> {
        let matchers = terms
            .iter()
            .map(|term| {
                let body = if escape_terms {
                    regex::escape(term)
                } else {
                    term.clone()
                };
                RegexBuilder::new(&format!(r"\b{}\b", body))
                    .case_insensitive(true)
                    .unicode(true)
                    .build()
                    .map(|re| (term.clone(), re))
                    .map_err(|e| EvalError::InvalidTermPattern {
                        term: term.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { matchers })
    }

    pub fn matches(&self, term_index: usize, text: &str) -> bool {
        self.matchers
            .get(term_index)
            .is_some_and(|(_, re)| re.is_match(text))
    }

    /// Tag every `(id, text)` row for each term
    pub fn annotate<'a, I>(&self, rows: I) -> SubgroupTags
    where
        I: IntoIterator<Item = (&'a str, &'a str)> + Clone,
    {
        let tags = self
            .matchers
            .iter()
            .map(|(term, re)| {
                let members = rows
                    .clone()
                    .into_iter()
                    .map(|(id, text)| (id.to_string(), re.is_match(text)))
                    .collect();
                SubgroupTag {
                    term: term.clone(),
                    members,
                }
            })
            .collect();

        SubgroupTags { tags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_whole_word_match() {
        let annotator = SubgroupAnnotator::new(&terms(&["ugly"]), false).unwrap();

        assert!(annotator.matches(0, "You are ugly!!"));
        assert!(!annotator.matches(0, "uglyness"));
    }

    #[test]
    fn test_case_insensitive_unicode() {
        let annotator = SubgroupAnnotator::new(&terms(&["donna", "città"]), false).unwrap();

        assert!(annotator.matches(0, "Quella DONNA è qui"));
        assert!(annotator.matches(1, "la CITTÀ dorme"));
        assert!(!annotator.matches(1, "cittàdella"));
    }

    #[test]
    fn test_annotate_keys_by_row_id() {
        let annotator = SubgroupAnnotator::new(&terms(&["women", "girl"]), false).unwrap();
        let rows = vec![("1", "women are smart"), ("2", "the girl left"), ("3", "nothing here")];
        let tags = annotator.annotate(rows.iter().copied());

        assert_eq!(tags.len(), 2);
        let women = tags.get("women").unwrap();
        assert!(women.contains("1"));
        assert!(!women.contains("2"));
        assert!(!women.contains("unknown"));
        assert_eq!(tags.get("girl").unwrap().size(), 1);
    }

    #[test]
    fn test_metacharacters_keep_regex_meaning() {
        let annotator = SubgroupAnnotator::new(&terms(&["wom(a|e)n"]), false).unwrap();
        assert!(annotator.matches(0, "a woman"));
        assert!(annotator.matches(0, "the women"));
    }

    #[test]
    fn test_escaped_terms_match_literally() {
        let annotator = SubgroupAnnotator::new(&terms(&["wom(a|e)n"]), true).unwrap();
        assert!(!annotator.matches(0, "a woman"));
    }

    #[test]
    fn test_invalid_term_pattern() {
        let err = SubgroupAnnotator::new(&terms(&["bad(term"]), false).unwrap_err();
        assert!(matches!(err, EvalError::InvalidTermPattern { ref term, .. } if term == "bad(term"));
    }
}
