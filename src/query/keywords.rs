//! Collaborator seams for keyword extraction and synonym expansion
//!
//! Keyword extraction and contextual-synonym computation run in external
//! services; the query layer only sees these traits.

use super::KeywordGroup;
use async_trait::async_trait;

/// Extracts the most salient keywords from a claim, in relevance order.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract(&self, text: &str, max_keywords: usize) -> anyhow::Result<Vec<String>>;
}

/// Suggests synonyms for a keyword in the context of the full claim.
#[async_trait]
pub trait SynonymProvider: Send + Sync {
    async fn contextual_synonyms(
        &self,
        keyword: &str,
        context: &str,
        top_n: usize,
        threshold: f64,
    ) -> anyhow::Result<Vec<String>>;
}

/// Build keyword groups, widening each keyword with up to `max_per_group`
/// contextual synonyms. Group order follows the keyword order.
pub async fn expand_with_synonyms(
    keywords: &[String],
    context: &str,
    provider: &dyn SynonymProvider,
    top_n: usize,
    threshold: f64,
    max_per_group: usize,
) -> anyhow::Result<Vec<KeywordGroup>> {
    let mut groups = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let mut alternatives = provider
            .contextual_synonyms(keyword, context, top_n, threshold)
            .await?;
        alternatives.truncate(max_per_group);
        groups.push(KeywordGroup::with_alternatives(keyword.clone(), alternatives));
    }
    Ok(groups)
}
