//! Menu reads: items, categories, modifiers, lexical search.

use sqlx::postgres::PgPool;
use sqlx::Row;

use sufra_domain::error::Result;
use sufra_domain::menu::{
    ItemWithModifiers, MenuItem, Modifier, ModifierGroup, SelectionType,
};

use crate::db_err;

#[derive(Clone)]
pub struct MenuRepo {
    pool: PgPool,
}

const ITEM_COLUMNS: &str = "id, name_ar, name_en, description_ar, category_ar, \
     price::FLOAT8 AS price, is_combo, is_available";

impl MenuRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn item_from_row(row: &sqlx::postgres::PgRow) -> Result<MenuItem> {
        Ok(MenuItem {
            id: row.try_get("id").map_err(db_err)?,
            name_ar: row.try_get("name_ar").map_err(db_err)?,
            name_en: row.try_get("name_en").map_err(db_err)?,
            description_ar: row.try_get("description_ar").map_err(db_err)?,
            category_ar: row.try_get("category_ar").map_err(db_err)?,
            price: row.try_get("price").map_err(db_err)?,
            is_combo: row.try_get("is_combo").map_err(db_err)?,
            is_available: row.try_get("is_available").map_err(db_err)?,
        })
    }

    /// Get an available item by id.
    pub async fn get_item(&self, item_id: i32) -> Result<Option<MenuItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items WHERE id = $1 AND is_available = TRUE"
        );
        let row = sqlx::query(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::item_from_row).transpose()
    }

    /// Get an item with its modifier groups and options.
    pub async fn get_item_with_modifiers(
        &self,
        item_id: i32,
    ) -> Result<Option<ItemWithModifiers>> {
        let Some(item) = self.get_item(item_id).await? else {
            return Ok(None);
        };

        let group_rows = sqlx::query(
            "SELECT mg.id, mg.name_ar, mg.selection_type, mg.min_selections, \
                    mg.max_selections, mg.is_required \
             FROM modifier_groups mg \
             INNER JOIN item_modifier_groups img ON mg.id = img.modifier_group_id \
             WHERE img.menu_item_id = $1",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut modifier_groups = Vec::with_capacity(group_rows.len());
        for row in &group_rows {
            let group_id: i32 = row.try_get("id").map_err(db_err)?;
            let selection_raw: String = row.try_get("selection_type").map_err(db_err)?;
            let selection_type = if selection_raw == "multiple" {
                SelectionType::Multiple
            } else {
                SelectionType::Single
            };

            let mod_rows = sqlx::query(
                "SELECT id, group_id, name_ar, price_delta::FLOAT8 AS price_delta, is_available \
                 FROM modifiers WHERE group_id = $1 AND is_available = TRUE",
            )
            .bind(group_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let modifiers = mod_rows
                .iter()
                .map(|m| {
                    Ok(Modifier {
                        id: m.try_get("id").map_err(db_err)?,
                        group_id: m.try_get("group_id").map_err(db_err)?,
                        name_ar: m.try_get("name_ar").map_err(db_err)?,
                        price_delta: m.try_get("price_delta").map_err(db_err)?,
                        is_available: m.try_get("is_available").map_err(db_err)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            modifier_groups.push(ModifierGroup {
                id: group_id,
                name_ar: row.try_get("name_ar").map_err(db_err)?,
                selection_type,
                min_selections: row.try_get("min_selections").map_err(db_err)?,
                max_selections: row.try_get("max_selections").map_err(db_err)?,
                is_required: row.try_get("is_required").map_err(db_err)?,
                modifiers,
            });
        }

        Ok(Some(ItemWithModifiers {
            item,
            modifier_groups,
        }))
    }

    /// All available items (used to warm the in-process catalog cache).
    pub async fn all_available(&self) -> Result<Vec<MenuItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items WHERE is_available = TRUE ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(Self::item_from_row).collect()
    }

    pub async fn items_by_category(&self, category_ar: &str) -> Result<Vec<MenuItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items \
             WHERE category_ar = $1 AND is_available = TRUE ORDER BY name_ar"
        );
        let rows = sqlx::query(&sql)
            .bind(category_ar)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(Self::item_from_row).collect()
    }

    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT category_ar FROM menu_items \
             WHERE is_available = TRUE ORDER BY category_ar",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| r.try_get("category_ar").map_err(db_err))
            .collect()
    }

    /// Case-insensitive substring search over names and description.
    pub async fn search_items(&self, term: &str, limit: i64) -> Result<Vec<MenuItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items \
             WHERE is_available = TRUE \
               AND (name_ar ILIKE $1 OR name_en ILIKE $1 OR description_ar ILIKE $1) \
             LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(format!("%{term}%"))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(Self::item_from_row).collect()
    }
}
