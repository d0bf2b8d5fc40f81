//! Read-only menu, coverage and order models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i32,
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    pub category_ar: String,
    pub price: f64,
    #[serde(default)]
    pub is_combo: bool,
    #[serde(default = "d_true")]
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modifier {
    pub id: i32,
    pub group_id: i32,
    pub name_ar: String,
    /// May be negative (e.g. "بدون صوص").
    #[serde(default)]
    pub price_delta: f64,
    #[serde(default = "d_true")]
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierGroup {
    pub id: i32,
    pub name_ar: String,
    pub selection_type: SelectionType,
    pub min_selections: i32,
    pub max_selections: i32,
    pub is_required: bool,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

/// A menu item together with its modifier groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemWithModifiers {
    #[serde(flatten)]
    pub item: MenuItem,
    pub modifier_groups: Vec<ModifierGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveredArea {
    pub id: i32,
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "d_true")]
    pub is_active: bool,
}

/// Validate a modifier selection for an item against the group
/// contract: membership, availability, and min/max/required counts.
/// Returns Arabic error messages for everything that is wrong.
pub fn validate_modifier_selection(
    groups: &[ModifierGroup],
    selected_ids: &[i32],
) -> (bool, Vec<String>) {
    let mut errors = Vec::new();

    for &sel in selected_ids {
        let Some(modifier) = groups
            .iter()
            .find_map(|g| g.modifiers.iter().find(|m| m.id == sel))
        else {
            errors.push(format!("الإضافة رقم {sel} غير متاحة لهذا الصنف"));
            continue;
        };
        if !modifier.is_available {
            errors.push(format!("الإضافة '{}' غير متوفرة حالياً", modifier.name_ar));
        }
    }

    for group in groups {
        let count = selected_ids
            .iter()
            .filter(|&&id| group.modifiers.iter().any(|m| m.id == id))
            .count() as i32;
        if group.is_required && count < group.min_selections {
            errors.push(format!(
                "يجب اختيار {} على الأقل من '{}'",
                group.min_selections, group.name_ar
            ));
        }
        if count > group.max_selections {
            errors.push(format!(
                "لا يمكن اختيار أكثر من {} من '{}'",
                group.max_selections, group.name_ar
            ));
        }
    }

    (errors.is_empty(), errors)
}

/// Order header as written at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: i64,
    pub order_number: String,
    pub created_at: DateTime<Utc>,
}

/// User-facing order number: `ORD-{id:06}`.
pub fn order_number(order_id: i64) -> String {
    format!("ORD-{order_id:06}")
}

fn d_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size_group() -> ModifierGroup {
        ModifierGroup {
            id: 1,
            name_ar: "الحجم".into(),
            selection_type: SelectionType::Single,
            min_selections: 1,
            max_selections: 1,
            is_required: true,
            modifiers: vec![
                Modifier {
                    id: 10,
                    group_id: 1,
                    name_ar: "وسط".into(),
                    price_delta: 0.0,
                    is_available: true,
                },
                Modifier {
                    id: 11,
                    group_id: 1,
                    name_ar: "كبير".into(),
                    price_delta: 4.0,
                    is_available: true,
                },
            ],
        }
    }

    #[test]
    fn required_group_must_be_selected() {
        let groups = vec![size_group()];
        let (ok, errors) = validate_modifier_selection(&groups, &[]);
        assert!(!ok);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn over_max_rejected() {
        let groups = vec![size_group()];
        let (ok, _) = validate_modifier_selection(&groups, &[10, 11]);
        assert!(!ok);
    }

    #[test]
    fn unknown_modifier_rejected() {
        let groups = vec![size_group()];
        let (ok, errors) = validate_modifier_selection(&groups, &[99]);
        assert!(!ok);
        // Unknown id error plus the unmet required-group error.
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn valid_selection_passes() {
        let groups = vec![size_group()];
        let (ok, errors) = validate_modifier_selection(&groups, &[11]);
        assert!(ok, "{errors:?}");
    }

    #[test]
    fn order_number_zero_padded() {
        assert_eq!(order_number(42), "ORD-000042");
        assert_eq!(order_number(1_234_567), "ORD-1234567");
    }
}
