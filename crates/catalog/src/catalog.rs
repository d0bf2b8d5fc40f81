//! In-process menu cache.
//!
//! Writers are limited to startup warm-up and background reindex; every
//! turn only reads. Cart state never lives here.

use std::collections::HashMap;

use parking_lot::RwLock;

use sufra_domain::arabic::clean_arabic_text;
use sufra_domain::error::Result;
use sufra_domain::menu::MenuItem;
use sufra_store::MenuRepo;

pub struct MenuCatalog {
    items: RwLock<HashMap<i32, MenuItem>>,
}

impl Default for MenuCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuCatalog {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the cache contents (tests and seed tooling).
    pub fn replace_all(&self, items: Vec<MenuItem>) {
        let mut map = self.items.write();
        map.clear();
        for item in items {
            map.insert(item.id, item);
        }
    }

    /// Warm the cache from the store. Called at startup and by the
    /// background reindex task.
    pub async fn warm(&self, repo: &MenuRepo) -> Result<usize> {
        let items = repo.all_available().await?;
        let count = items.len();
        self.replace_all(items);
        tracing::info!(items = count, "menu cache warmed");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn get(&self, item_id: i32) -> Option<MenuItem> {
        self.items.read().get(&item_id).cloned()
    }

    pub fn list_categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self
            .items
            .read()
            .values()
            .map(|i| i.category_ar.clone())
            .collect();
        cats.sort();
        cats.dedup();
        cats
    }

    pub fn items_by_category(&self, category_ar: &str) -> Vec<MenuItem> {
        let mut items: Vec<MenuItem> = self
            .items
            .read()
            .values()
            .filter(|i| i.category_ar == category_ar)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name_ar.cmp(&b.name_ar));
        items
    }

    /// Case-insensitive substring match over `name_ar`, `name_en` and
    /// `description_ar`, Arabic-normalized on both sides.
    pub fn search_lexical(
        &self,
        query: &str,
        limit: usize,
        category: Option<&str>,
    ) -> Vec<MenuItem> {
        let needle = clean_arabic_text(query).to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<MenuItem> = self
            .items
            .read()
            .values()
            .filter(|i| i.is_available)
            .filter(|i| category.map_or(true, |c| i.category_ar == c))
            .filter(|i| {
                clean_arabic_text(&i.name_ar).to_lowercase().contains(&needle)
                    || i.name_en
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
                    || i.description_ar
                        .as_deref()
                        .is_some_and(|d| clean_arabic_text(d).to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits.truncate(limit);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, name_ar: &str, name_en: Option<&str>, category: &str) -> MenuItem {
        MenuItem {
            id,
            name_ar: name_ar.into(),
            name_en: name_en.map(String::from),
            description_ar: None,
            category_ar: category.into(),
            price: 20.0,
            is_combo: false,
            is_available: true,
        }
    }

    fn sample_catalog() -> MenuCatalog {
        let catalog = MenuCatalog::new();
        catalog.replace_all(vec![
            item(1, "برجر لحم", Some("Beef Burger"), "برجر"),
            item(2, "برجر دجاج", Some("Chicken Burger"), "برجر"),
            item(3, "شاورما دجاج", Some("Chicken Shawarma"), "شاورما"),
        ]);
        catalog
    }

    #[test]
    fn lexical_search_arabic() {
        let catalog = sample_catalog();
        let hits = catalog.search_lexical("برجر", 10, None);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn lexical_search_english_case_insensitive() {
        let catalog = sample_catalog();
        let hits = catalog.search_lexical("chicken", 10, None);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn category_filter_applies() {
        let catalog = sample_catalog();
        let hits = catalog.search_lexical("دجاج", 10, Some("شاورما"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 3);
    }

    #[test]
    fn unavailable_items_hidden() {
        let catalog = sample_catalog();
        let mut hidden = item(4, "برجر سمك", None, "برجر");
        hidden.is_available = false;
        {
            let mut items = vec![
                item(1, "برجر لحم", None, "برجر"),
            ];
            items.push(hidden);
            catalog.replace_all(items);
        }
        assert_eq!(catalog.search_lexical("برجر", 10, None).len(), 1);
    }

    #[test]
    fn categories_deduped_sorted() {
        let catalog = sample_catalog();
        assert_eq!(catalog.list_categories(), vec!["برجر", "شاورما"]);
    }
}
