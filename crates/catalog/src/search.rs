//! Combined menu search: semantic first, lexical fallback.

use std::sync::Arc;

use sufra_domain::menu::MenuItem;

use crate::catalog::MenuCatalog;
use crate::vector::{InputType, VectorBackend};

/// Scores below this are noise and are dropped from vector results.
const MIN_SCORE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: MenuItem,
    pub score: f32,
}

pub struct MenuSearch {
    catalog: Arc<MenuCatalog>,
    backend: Option<Arc<dyn VectorBackend>>,
}

impl MenuSearch {
    pub fn new(catalog: Arc<MenuCatalog>, backend: Option<Arc<dyn VectorBackend>>) -> Self {
        Self { catalog, backend }
    }

    /// Search the menu. Vector search runs first when a backend is
    /// configured; low-score hits are discarded. Any backend failure or
    /// an empty result set falls back to lexical matching over the
    /// cache.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<&str>,
    ) -> Vec<ScoredItem> {
        if let Some(backend) = &self.backend {
            match self.vector_search(backend.as_ref(), query, top_k, category).await {
                Ok(hits) if !hits.is_empty() => return hits,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "vector search failed, using lexical fallback");
                }
            }
        }

        self.catalog
            .search_lexical(query, top_k, category)
            .into_iter()
            .map(|item| ScoredItem { item, score: 0.0 })
            .collect()
    }

    async fn vector_search(
        &self,
        backend: &dyn VectorBackend,
        query: &str,
        top_k: usize,
        category: Option<&str>,
    ) -> sufra_domain::Result<Vec<ScoredItem>> {
        let vector = backend.embed(query, InputType::Query).await?;

        let mut filter = serde_json::json!({ "is_available": true });
        if let Some(cat) = category {
            filter["category_ar"] = serde_json::json!(cat);
        }

        let matches = backend.search(&vector, top_k, &filter).await?;

        Ok(matches
            .into_iter()
            .filter(|m| m.score >= MIN_SCORE)
            .filter_map(|m| {
                let id: i32 = m.id.parse().ok()?;
                let item = self.catalog.get(id)?;
                item.is_available.then_some(ScoredItem {
                    item,
                    score: m.score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorMatch;
    use sufra_domain::error::{Error, Result};

    fn item(id: i32, name_ar: &str) -> MenuItem {
        MenuItem {
            id,
            name_ar: name_ar.into(),
            name_en: None,
            description_ar: None,
            category_ar: "برجر".into(),
            price: 25.0,
            is_combo: false,
            is_available: true,
        }
    }

    fn catalog() -> Arc<MenuCatalog> {
        let c = MenuCatalog::new();
        c.replace_all(vec![item(1, "برجر لحم"), item(2, "برجر دجاج")]);
        Arc::new(c)
    }

    /// Backend scripted with fixed matches or a failure.
    struct StubBackend {
        matches: Option<Vec<VectorMatch>>,
    }

    #[async_trait::async_trait]
    impl VectorBackend for StubBackend {
        async fn embed(&self, _text: &str, _input_type: InputType) -> Result<Vec<f32>> {
            Ok(vec![0.1; 8])
        }

        async fn search(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _filter: &serde_json::Value,
        ) -> Result<Vec<VectorMatch>> {
            self.matches
                .clone()
                .ok_or_else(|| Error::Vector("unreachable".into()))
        }
    }

    fn vmatch(id: &str, score: f32) -> VectorMatch {
        VectorMatch {
            id: id.into(),
            score,
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn low_scores_are_discarded() {
        let backend = Arc::new(StubBackend {
            matches: Some(vec![vmatch("1", 0.9), vmatch("2", 0.1)]),
        });
        let search = MenuSearch::new(catalog(), Some(backend));
        let hits = search.search("برجر", 5, None).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, 1);
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_lexical() {
        let backend = Arc::new(StubBackend { matches: None });
        let search = MenuSearch::new(catalog(), Some(backend));
        let hits = search.search("برجر", 5, None).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, 0.0);
    }

    #[tokio::test]
    async fn empty_vector_result_falls_back() {
        let backend = Arc::new(StubBackend {
            matches: Some(vec![]),
        });
        let search = MenuSearch::new(catalog(), Some(backend));
        let hits = search.search("دجاج", 5, None).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, 2);
    }

    #[tokio::test]
    async fn no_backend_goes_straight_to_lexical() {
        let search = MenuSearch::new(catalog(), None);
        let hits = search.search("لحم", 5, None).await;
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_skipped() {
        let backend = Arc::new(StubBackend {
            matches: Some(vec![vmatch("999", 0.8), vmatch("1", 0.7)]),
        });
        let search = MenuSearch::new(catalog(), Some(backend));
        let hits = search.search("برجر", 5, None).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, 1);
    }
}
