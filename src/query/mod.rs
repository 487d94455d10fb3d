//! Boolean query synthesis
//!
//! Turns an ordered list of keyword groups (each a base term plus optional
//! synonym alternatives) into the boolean expression understood by mirror
//! advanced search. Group order follows keyword extraction order so the
//! same claim always produces the same query.

mod keywords;

pub use keywords::{expand_with_synonyms, KeywordExtractor, SynonymProvider};

/// One query concept: a base term plus optional synonym alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordGroup {
    pub term: String,
    pub alternatives: Vec<String>,
}

impl KeywordGroup {
    pub fn bare(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_alternatives(term: impl Into<String>, alternatives: Vec<String>) -> Self {
        Self {
            term: term.into(),
            alternatives,
        }
    }

    /// Parenthesized OR-atom: `(term)` or `(term OR alt1 OR alt2)`.
    fn as_atom(&self) -> String {
        if self.alternatives.is_empty() {
            format!("({})", self.term)
        } else {
            format!("({} OR {})", self.term, self.alternatives.join(" OR "))
        }
    }

    /// Rendering inside an AND-block: single terms stay bare, groups with
    /// alternatives keep their parens so the OR binds tighter than the AND.
    fn as_clause_member(&self) -> String {
        if self.alternatives.is_empty() {
            self.term.clone()
        } else {
            self.as_atom()
        }
    }
}

/// Builds boolean search expressions from keyword groups.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build a query string.
    ///
    /// `drop_count = 0` produces the conjunctive form: every group's OR-atom
    /// joined with AND. `drop_count = d > 0` tolerates keyword drops: with
    /// `m = max(1, groups - d)`, every m-sized subset of groups becomes an
    /// AND-block and the blocks are joined with OR, in lexicographic subset
    /// order. Empty input yields an empty string.
    pub fn build(groups: &[KeywordGroup], drop_count: usize) -> String {
        if groups.is_empty() {
            return String::new();
        }
        if drop_count == 0 {
            return groups
                .iter()
                .map(KeywordGroup::as_atom)
                .collect::<Vec<_>>()
                .join(" AND ");
        }

        let m = groups.len().saturating_sub(drop_count).max(1);
        let clauses: Vec<String> = subsets(groups.len(), m)
            .into_iter()
            .map(|combo| {
                let block = combo
                    .into_iter()
                    .map(|i| groups[i].as_clause_member())
                    .collect::<Vec<_>>()
                    .join(" AND ");
                format!("({})", block)
            })
            .collect();
        clauses.join(" OR ")
    }
}

/// All k-sized subsets of 0..n in lexicographic order.
fn subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut combo: Vec<usize> = (0..k).collect();
    loop {
        out.push(combo.clone());
        // advance the rightmost index that still has room
        let mut i = k;
        while i > 0 {
            i -= 1;
            if combo[i] != i + n - k {
                combo[i] += 1;
                for j in i + 1..k {
                    combo[j] = combo[j - 1] + 1;
                }
                break;
            }
            if i == 0 {
                return out;
            }
        }
    }
}
