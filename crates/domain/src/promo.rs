//! Promo codes and discount evaluation.
//!
//! Evaluation is pure over a loaded [`PromoCode`] so the clamp rules can
//! be tested without a database; the store layer only fetches rows and
//! increments usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: i32,
    /// Stored uppercase; matching is case-insensitive.
    pub code: String,
    pub discount_type: DiscountType,
    pub value: f64,
    #[serde(default)]
    pub min_order: f64,
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub usage_count: i32,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

/// Outcome of evaluating a promo code against a subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct PromoDecision {
    pub valid: bool,
    pub discount: f64,
    pub message_ar: String,
}

impl PromoDecision {
    fn rejected(message_ar: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount: 0.0,
            message_ar: message_ar.into(),
        }
    }
}

/// Apply the promo rules: activity, usage limit, validity window,
/// minimum order, then the discount computation with the percentage
/// clamp to `max_discount` and the universal clamp to the subtotal.
pub fn evaluate_promo(promo: &PromoCode, subtotal: f64, now: DateTime<Utc>) -> PromoDecision {
    if !promo.is_active {
        return PromoDecision::rejected("كود الخصم غير فعال");
    }
    if let Some(limit) = promo.usage_limit {
        if promo.usage_count >= limit {
            return PromoDecision::rejected("تم استنفاد عدد استخدامات هذا الكود");
        }
    }
    if let Some(from) = promo.valid_from {
        if now < from {
            return PromoDecision::rejected("كود الخصم لم يبدأ بعد");
        }
    }
    if let Some(until) = promo.valid_until {
        if now > until {
            return PromoDecision::rejected("انتهت صلاحية كود الخصم");
        }
    }
    if subtotal < promo.min_order {
        return PromoDecision::rejected(format!(
            "الحد الأدنى للطلب {} ريال لاستخدام هذا الكود",
            promo.min_order
        ));
    }

    let mut discount = match promo.discount_type {
        DiscountType::Percentage => {
            let raw = subtotal * promo.value / 100.0;
            match promo.max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountType::Fixed => promo.value,
    };
    discount = discount.min(subtotal);

    PromoDecision {
        valid: true,
        discount,
        message_ar: format!("تم تطبيق خصم {discount} ريال"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn percentage(value: f64, max: Option<f64>, min_order: f64) -> PromoCode {
        PromoCode {
            id: 1,
            code: "WELCOME10".into(),
            discount_type: DiscountType::Percentage,
            value,
            min_order,
            max_discount: max,
            usage_limit: None,
            usage_count: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
        }
    }

    #[test]
    fn percentage_clamped_to_max_discount() {
        // 20% of 500 with max 50 → 50, not 100.
        let promo = percentage(20.0, Some(50.0), 0.0);
        let d = evaluate_promo(&promo, 500.0, Utc::now());
        assert!(d.valid);
        assert_eq!(d.discount, 50.0);
    }

    #[test]
    fn welcome10_clamp() {
        let promo = percentage(10.0, Some(30.0), 0.0);
        let d = evaluate_promo(&promo, 500.0, Utc::now());
        assert_eq!(d.discount, 30.0);
    }

    #[test]
    fn min_order_boundary() {
        let promo = percentage(10.0, None, 100.0);
        let d = evaluate_promo(&promo, 99.99, Utc::now());
        assert!(!d.valid);
        assert!(d.message_ar.contains("الحد الأدنى"));
        assert!(evaluate_promo(&promo, 100.0, Utc::now()).valid);
    }

    #[test]
    fn fixed_clamped_to_subtotal() {
        let promo = PromoCode {
            discount_type: DiscountType::Fixed,
            value: 50.0,
            ..percentage(0.0, None, 0.0)
        };
        let d = evaluate_promo(&promo, 20.0, Utc::now());
        assert!(d.valid);
        assert_eq!(d.discount, 20.0);
    }

    #[test]
    fn inactive_rejected() {
        let mut promo = percentage(10.0, None, 0.0);
        promo.is_active = false;
        assert!(!evaluate_promo(&promo, 100.0, Utc::now()).valid);
    }

    #[test]
    fn exhausted_rejected() {
        let mut promo = percentage(10.0, None, 0.0);
        promo.usage_limit = Some(5);
        promo.usage_count = 5;
        assert!(!evaluate_promo(&promo, 100.0, Utc::now()).valid);
    }

    #[test]
    fn validity_window() {
        let now = Utc::now();
        let mut promo = percentage(10.0, None, 0.0);
        promo.valid_from = Some(now + Duration::days(1));
        assert!(!evaluate_promo(&promo, 100.0, now).valid);

        promo.valid_from = None;
        promo.valid_until = Some(now - Duration::days(1));
        assert!(!evaluate_promo(&promo, 100.0, now).valid);
    }
}
