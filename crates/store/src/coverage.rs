//! Delivery coverage lookups.
//!
//! Matching is tolerant: the caller normalizes the query (diacritics,
//! alef variants, "حي " prefix) via `sufra_domain::arabic` before it
//! reaches SQL; here we try exact name, then alias membership, then
//! substring search for suggestions.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use sufra_domain::arabic::normalize_area_name;
use sufra_domain::error::Result;
use sufra_domain::menu::CoveredArea;

use crate::db_err;

#[derive(Clone)]
pub struct CoverageRepo {
    pool: PgPool,
}

/// Outcome of a coverage check.
#[derive(Debug, Clone)]
pub enum CoverageOutcome {
    Covered(CoveredArea),
    /// Not covered, but up to three near matches exist.
    Suggestions(Vec<CoveredArea>),
    NotCovered,
}

fn area_from_row(row: &PgRow) -> Result<CoveredArea> {
    Ok(CoveredArea {
        id: row.try_get("id").map_err(db_err)?,
        name_ar: row.try_get("name_ar").map_err(db_err)?,
        name_en: row.try_get("name_en").map_err(db_err)?,
        aliases: row.try_get("aliases_ar").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
    })
}

const AREA_COLUMNS: &str = "id, name_ar, name_en, aliases_ar, is_active";

impl CoverageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_area(&self, area_id: i32) -> Result<Option<CoveredArea>> {
        let sql = format!(
            "SELECT {AREA_COLUMNS} FROM covered_areas WHERE id = $1 AND is_active = TRUE"
        );
        let row = sqlx::query(&sql)
            .bind(area_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(area_from_row).transpose()
    }

    pub async fn all_active(&self) -> Result<Vec<CoveredArea>> {
        let sql = format!(
            "SELECT {AREA_COLUMNS} FROM covered_areas WHERE is_active = TRUE ORDER BY name_ar"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(area_from_row).collect()
    }

    /// Exact match on the normalized Arabic name or the English name.
    async fn find_exact(&self, name: &str) -> Result<Option<CoveredArea>> {
        let sql = format!(
            "SELECT {AREA_COLUMNS} FROM covered_areas \
             WHERE is_active = TRUE AND (name_ar = $1 OR name_en ILIKE $1)"
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(area_from_row).transpose()
    }

    /// Alias membership.
    async fn find_by_alias(&self, name: &str) -> Result<Option<CoveredArea>> {
        let sql = format!(
            "SELECT {AREA_COLUMNS} FROM covered_areas \
             WHERE is_active = TRUE AND $1 = ANY(aliases_ar)"
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(area_from_row).transpose()
    }

    /// Substring search across names and aliases, for suggestions.
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<CoveredArea>> {
        let sql = format!(
            "SELECT {AREA_COLUMNS} FROM covered_areas \
             WHERE is_active = TRUE \
               AND (name_ar ILIKE $1 OR name_en ILIKE $1 \
                    OR EXISTS (SELECT 1 FROM unnest(aliases_ar) alias WHERE alias ILIKE $1)) \
             ORDER BY name_ar LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(format!("%{term}%"))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(area_from_row).collect()
    }

    /// The full coverage lookup: normalize, exact, alias, suggestions.
    pub async fn check_coverage(&self, raw_name: &str) -> Result<CoverageOutcome> {
        let normalized = normalize_area_name(raw_name);
        if normalized.is_empty() {
            return Ok(CoverageOutcome::NotCovered);
        }

        if let Some(area) = self.find_exact(&normalized).await? {
            return Ok(CoverageOutcome::Covered(area));
        }
        if let Some(area) = self.find_by_alias(&normalized).await? {
            return Ok(CoverageOutcome::Covered(area));
        }

        let suggestions = self.search(&normalized, 3).await?;
        if suggestions.is_empty() {
            Ok(CoverageOutcome::NotCovered)
        } else {
            Ok(CoverageOutcome::Suggestions(suggestions))
        }
    }
}
