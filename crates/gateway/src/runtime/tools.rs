//! Tool registry: definitions exposed to the LLM and the dispatch
//! implementations that mutate session state and the stores.
//!
//! Tool errors are returned as `{success:false, error_ar}` JSON so the
//! model sees the failure and recovers conversationally; only unknown
//! tools and undeserializable arguments short-circuit the turn.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use sufra_catalog::{MenuCatalog, MenuSearch};
use sufra_domain::arabic::{
    format_price_ar, validate_customer_name, validate_quantity, validate_saudi_phone,
};
use sufra_domain::config::RestaurantConfig;
use sufra_domain::menu::validate_modifier_selection;
use sufra_domain::promo::evaluate_promo;
use sufra_domain::session::{CartItem, CartModifier, OrderType, Session};
use sufra_domain::tool::ToolDefinition;
use sufra_store::coverage::CoverageOutcome;
use sufra_store::{CoverageRepo, MenuRepo, NewOrder, NewOrderLine, OrderRepo, PromoRepo};

use super::roles::AgentRole;
use super::runner::{ToolDispatcher, ToolOutcome};

const ESTIMATED_DELIVERY_TIME_AR: &str = "30-45 دقيقة";
const PICKUP_BRANCH_AR: &str = "استلام من الفرع - حي العليا";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ToolRegistry {
    catalog: Arc<MenuCatalog>,
    search: Arc<MenuSearch>,
    menu: MenuRepo,
    coverage: CoverageRepo,
    promos: PromoRepo,
    orders: OrderRepo,
    restaurant: RestaurantConfig,
}

impl ToolRegistry {
    pub fn new(
        catalog: Arc<MenuCatalog>,
        search: Arc<MenuSearch>,
        menu: MenuRepo,
        coverage: CoverageRepo,
        promos: PromoRepo,
        orders: OrderRepo,
        restaurant: RestaurantConfig,
    ) -> Self {
        Self {
            catalog,
            search,
            menu,
            coverage,
            promos,
            orders,
            restaurant,
        }
    }

    /// Tool definitions visible to one agent role.
    pub fn definitions_for(&self, role: AgentRole) -> Vec<ToolDefinition> {
        let allowed = role.allowed_tools();
        all_definitions()
            .into_iter()
            .filter(|d| allowed.contains(&d.name.as_str()))
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Definitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn all_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "check_delivery_district".into(),
            description: "التحقق من تغطية التوصيل لحي معيّن، مع رسوم التوصيل والوقت المتوقع.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "district": { "type": "string", "description": "اسم الحي بالعربي (مثال: حي النرجس)" }
                },
                "required": ["district"]
            }),
        },
        ToolDefinition {
            name: "set_order_type".into(),
            description: "تحديد نوع الطلب: توصيل (مع الحي) أو استلام من الفرع. يجب استدعاؤها قبل التحويل.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_type": { "type": "string", "enum": ["delivery", "pickup"], "description": "نوع الطلب" },
                    "district": { "type": "string", "description": "اسم الحي (للتوصيل فقط)" },
                    "delivery_fee": { "type": "number", "description": "رسوم التوصيل بالريال" }
                },
                "required": ["order_type"]
            }),
        },
        ToolDefinition {
            name: "search_menu".into(),
            description: "البحث في قائمة الطعام (بحث دلالي مع بديل نصي).".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "نص البحث (مثال: برجر دجاج)" },
                    "category": { "type": "string", "description": "تصفية حسب الفئة (اختياري)" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "get_item_details".into(),
            description: "تفاصيل صنف من القائمة مع الإضافات المتاحة.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "item_id": { "type": "integer", "description": "رقم الصنف" }
                },
                "required": ["item_id"]
            }),
        },
        ToolDefinition {
            name: "add_to_order".into(),
            description: "إضافة صنف للسلة.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "item_id": { "type": "integer", "description": "رقم الصنف" },
                    "quantity": { "type": "integer", "description": "الكمية (افتراضي 1)" },
                    "notes": { "type": "string", "description": "ملاحظات خاصة (مثال: بدون بصل)" },
                    "modifier_ids": {
                        "type": "array",
                        "items": { "type": "integer" },
                        "description": "أرقام الإضافات المختارة"
                    }
                },
                "required": ["item_id"]
            }),
        },
        ToolDefinition {
            name: "get_current_order".into(),
            description: "عرض السلة الحالية مع المجموع.".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "update_order_item".into(),
            description: "تعديل كمية أو ملاحظات صنف في السلة. الكمية 0 تحذف الصنف.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "item_id": { "type": "integer", "description": "رقم الصنف" },
                    "quantity": { "type": "integer", "description": "الكمية الجديدة (0 = حذف)" },
                    "notes": { "type": "string", "description": "الملاحظات الجديدة" }
                },
                "required": ["item_id"]
            }),
        },
        ToolDefinition {
            name: "remove_from_order".into(),
            description: "حذف صنف من السلة.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "item_id": { "type": "integer", "description": "رقم الصنف" }
                },
                "required": ["item_id"]
            }),
        },
        ToolDefinition {
            name: "calculate_total".into(),
            description: "حساب المجموع النهائي شامل التوصيل وأي كود خصم.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "delivery_fee": { "type": "number", "description": "رسوم التوصيل (0 للاستلام)" },
                    "promo_code": { "type": "string", "description": "كود الخصم (اختياري)" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "confirm_order".into(),
            description: "تأكيد الطلب النهائي وحفظه. يتطلب الاسم ورقم الجوال.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "customer_name": { "type": "string", "description": "اسم العميل" },
                    "customer_phone": { "type": "string", "description": "رقم جوال العميل" },
                    "district": { "type": "string", "description": "حي التوصيل" },
                    "delivery_fee": { "type": "number", "description": "رسوم التوصيل (0 للاستلام)" },
                    "discount": { "type": "number", "description": "الخصم المطبق" },
                    "order_type": { "type": "string", "enum": ["delivery", "pickup"] },
                    "notes": { "type": "string", "description": "ملاحظات الطلب" }
                },
                "required": ["customer_name", "customer_phone"]
            }),
        },
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn err_result(error_ar: impl Into<String>) -> ToolOutcome {
    ToolOutcome::Result {
        json: json!({ "success": false, "error_ar": error_ar.into() }),
        is_error: true,
    }
}

fn ok_result(json: Value) -> ToolOutcome {
    ToolOutcome::Result {
        json,
        is_error: false,
    }
}

macro_rules! parse_args {
    ($ty:ty, $args:expr) => {
        match serde_json::from_value::<$ty>($args.clone()) {
            Ok(v) => v,
            Err(_) => return ToolOutcome::BadArguments,
        }
    };
}

#[async_trait::async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn dispatch(&self, name: &str, args: &Value, session: &mut Session) -> ToolOutcome {
        match name {
            "check_delivery_district" => {
                let args = parse_args!(CheckDistrictArgs, args);
                self.check_delivery_district(&args).await
            }
            "set_order_type" => {
                let args = parse_args!(SetOrderTypeArgs, args);
                self.set_order_type(&args).await
            }
            "search_menu" => {
                let args = parse_args!(SearchMenuArgs, args);
                self.search_menu(&args).await
            }
            "get_item_details" => {
                let args = parse_args!(ItemIdArgs, args);
                self.get_item_details(&args).await
            }
            "add_to_order" => {
                let args = parse_args!(AddToOrderArgs, args);
                self.add_to_order(&args, session).await
            }
            "get_current_order" => self.get_current_order(session),
            "update_order_item" => {
                let args = parse_args!(UpdateItemArgs, args);
                self.update_order_item(&args, session)
            }
            "remove_from_order" => {
                let args = parse_args!(ItemIdArgs, args);
                self.remove_from_order(&args, session)
            }
            "calculate_total" => {
                let args = parse_args!(CalculateTotalArgs, args);
                self.calculate_total(&args, session).await
            }
            "confirm_order" => {
                let args = parse_args!(ConfirmOrderArgs, args);
                self.confirm_order(&args, session).await
            }
            _ => ToolOutcome::UnknownTool,
        }
    }
}

// ── Argument shapes ────────────────────────────────────────────────

#[derive(Deserialize)]
struct CheckDistrictArgs {
    district: String,
}

#[derive(Deserialize)]
struct SetOrderTypeArgs {
    order_type: String,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    delivery_fee: Option<f64>,
}

#[derive(Deserialize)]
struct SearchMenuArgs {
    query: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Deserialize)]
struct ItemIdArgs {
    item_id: i32,
}

#[derive(Deserialize)]
struct AddToOrderArgs {
    item_id: i32,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    modifier_ids: Vec<i32>,
}

#[derive(Deserialize)]
struct UpdateItemArgs {
    item_id: i32,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
struct CalculateTotalArgs {
    #[serde(default)]
    delivery_fee: Option<f64>,
    #[serde(default)]
    promo_code: Option<String>,
}

#[derive(Deserialize)]
struct ConfirmOrderArgs {
    // Defaulted so a forgetful model gets a polite validation error
    // instead of a short-circuited turn.
    #[serde(default)]
    customer_name: String,
    #[serde(default)]
    customer_phone: String,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    delivery_fee: Option<f64>,
    #[serde(default)]
    discount: Option<f64>,
    #[serde(default)]
    order_type: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

// ── Implementations ────────────────────────────────────────────────

impl ToolRegistry {
    async fn check_delivery_district(&self, args: &CheckDistrictArgs) -> ToolOutcome {
        let outcome = match self.coverage.check_coverage(&args.district).await {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(error = %e, "coverage lookup failed");
                return err_result("صار خطأ أثناء التحقق من المنطقة، حاول مرة ثانية");
            }
        };

        match outcome {
            CoverageOutcome::Covered(area) => {
                let fee = self.restaurant.delivery_fee;
                ok_result(json!({
                    "covered": true,
                    "area_id": area.id,
                    "district": area.name_ar,
                    "delivery_fee": fee,
                    "estimated_time": ESTIMATED_DELIVERY_TIME_AR,
                    "message_ar": format!(
                        "تمام! نوصل لـ{}. رسوم التوصيل {} ريال، والوقت المتوقع {}.",
                        area.name_ar, fee, ESTIMATED_DELIVERY_TIME_AR
                    ),
                }))
            }
            CoverageOutcome::Suggestions(areas) => {
                let names: Vec<&str> = areas.iter().map(|a| a.name_ar.as_str()).collect();
                ok_result(json!({
                    "covered": false,
                    "delivery_fee": 0.0,
                    "estimated_time": "",
                    "suggestions": names,
                    "message_ar": format!(
                        "ما لقيت '{}'. هل تقصد: {}؟",
                        args.district,
                        names.join("، ")
                    ),
                }))
            }
            CoverageOutcome::NotCovered => ok_result(json!({
                "covered": false,
                "delivery_fee": 0.0,
                "estimated_time": "",
                "message_ar": format!(
                    "للأسف ما نغطي منطقة '{}' حالياً. تبي تستلم من الفرع أو تختار منطقة ثانية؟",
                    args.district
                ),
            })),
        }
    }

    async fn set_order_type(&self, args: &SetOrderTypeArgs) -> ToolOutcome {
        let is_pickup = matches!(
            args.order_type.trim().to_lowercase().as_str(),
            "pickup" | "takeaway" | "take away"
        ) || args.order_type.contains("استلام");

        if is_pickup {
            return ok_result(json!({
                "success": true,
                "order_type": "pickup",
                "district": PICKUP_BRANCH_AR,
                "area_id": null,
                "delivery_fee": 0.0,
                "message_ar": "تمام، الطلب للاستلام من الفرع في حي العليا. لا توجد رسوم توصيل.",
            }));
        }

        // Delivery requires a district validated against coverage; the
        // tool result is the authoritative source the orchestrator
        // reconciles into the session.
        let Some(district) = args.district.as_deref().filter(|d| !d.trim().is_empty()) else {
            return err_result("لازم تحدد الحي قبل اختيار التوصيل");
        };

        let outcome = match self.coverage.check_coverage(district).await {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(error = %e, "coverage lookup failed");
                return err_result("صار خطأ أثناء التحقق من المنطقة، حاول مرة ثانية");
            }
        };

        match outcome {
            CoverageOutcome::Covered(area) => {
                let fee = args.delivery_fee.unwrap_or(self.restaurant.delivery_fee);
                ok_result(json!({
                    "success": true,
                    "order_type": "delivery",
                    "district": area.name_ar,
                    "area_id": area.id,
                    "delivery_fee": fee,
                    "message_ar": format!(
                        "تمام، الطلب للتوصيل إلى {}. رسوم التوصيل {} ريال.",
                        area.name_ar, fee
                    ),
                }))
            }
            CoverageOutcome::Suggestions(areas) => {
                let names: Vec<&str> = areas.iter().map(|a| a.name_ar.as_str()).collect();
                err_result(format!(
                    "ما لقيت '{}'. هل تقصد: {}؟",
                    district,
                    names.join("، ")
                ))
            }
            CoverageOutcome::NotCovered => err_result(format!(
                "للأسف ما نغطي منطقة '{district}' حالياً. اعرض على العميل الاستلام من الفرع."
            )),
        }
    }

    async fn search_menu(&self, args: &SearchMenuArgs) -> ToolOutcome {
        let hits = self
            .search
            .search(&args.query, 5, args.category.as_deref())
            .await;

        let semantic = hits.iter().any(|h| h.score > 0.0);
        let items: Vec<Value> = hits
            .iter()
            .map(|h| {
                json!({
                    "id": h.item.id,
                    "name_ar": h.item.name_ar,
                    "description_ar": h.item.description_ar,
                    "price": h.item.price,
                    "category_ar": h.item.category_ar,
                    "is_combo": h.item.is_combo,
                })
            })
            .collect();

        ok_result(json!({
            "found": !items.is_empty(),
            "count": items.len(),
            "items": items,
            "search_type": if semantic { "vector" } else { "text" },
        }))
    }

    async fn get_item_details(&self, args: &ItemIdArgs) -> ToolOutcome {
        // Modifier groups are not cached; this always hits the store.
        match self.menu.get_item_with_modifiers(args.item_id).await {
            Ok(Some(detail)) => {
                let groups: Vec<Value> = detail
                    .modifier_groups
                    .iter()
                    .map(|g| {
                        json!({
                            "id": g.id,
                            "name_ar": g.name_ar,
                            "is_required": g.is_required,
                            "min_selections": g.min_selections,
                            "max_selections": g.max_selections,
                            "modifiers": g.modifiers.iter().map(|m| json!({
                                "id": m.id,
                                "name_ar": m.name_ar,
                                "price_delta": m.price_delta,
                            })).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                ok_result(json!({
                    "found": true,
                    "item": {
                        "id": detail.item.id,
                        "name_ar": detail.item.name_ar,
                        "description_ar": detail.item.description_ar,
                        "price": detail.item.price,
                        "category_ar": detail.item.category_ar,
                        "is_combo": detail.item.is_combo,
                        "modifier_groups": groups,
                    },
                }))
            }
            Ok(None) => ok_result(json!({
                "found": false,
                "message_ar": "الصنف غير موجود",
            })),
            Err(e) => {
                tracing::warn!(error = %e, item_id = args.item_id, "item lookup failed");
                err_result("صار خطأ أثناء جلب تفاصيل الصنف")
            }
        }
    }

    async fn add_to_order(&self, args: &AddToOrderArgs, session: &mut Session) -> ToolOutcome {
        let quantity = match validate_quantity(args.quantity.unwrap_or(1)) {
            Ok(q) => q,
            Err(msg) => return err_result(msg),
        };

        let Some(item) = self.catalog.get(args.item_id) else {
            return err_result(format!("الصنف غير موجود: {}", args.item_id));
        };
        if !item.is_available {
            return err_result(format!("للأسف {} غير متوفر حالياً", item.name_ar));
        }

        // Resolve and validate any selected modifiers against the
        // item's groups.
        let mut modifiers: Vec<CartModifier> = Vec::new();
        if !args.modifier_ids.is_empty() {
            let detail = match self.menu.get_item_with_modifiers(args.item_id).await {
                Ok(Some(d)) => d,
                Ok(None) => return err_result(format!("الصنف غير موجود: {}", args.item_id)),
                Err(e) => {
                    tracing::warn!(error = %e, "modifier lookup failed");
                    return err_result("صار خطأ أثناء التحقق من الإضافات");
                }
            };
            let (ok, errors) =
                validate_modifier_selection(&detail.modifier_groups, &args.modifier_ids);
            if !ok {
                return err_result(errors.join("، "));
            }
            for group in &detail.modifier_groups {
                for modifier in &group.modifiers {
                    if args.modifier_ids.contains(&modifier.id) {
                        modifiers.push(CartModifier {
                            modifier_id: modifier.id,
                            name_ar: modifier.name_ar.clone(),
                            price_delta: modifier.price_delta,
                        });
                    }
                }
            }
        }

        let notes = args.notes.clone().filter(|n| !n.trim().is_empty());
        let line = CartItem::new(
            item.id,
            item.name_ar.clone(),
            quantity,
            item.price,
            modifiers,
            notes.clone(),
        );
        let line_json = serde_json::to_value(&line).unwrap_or(Value::Null);
        session.add_to_cart(line);

        let subtotal = session.cart_subtotal();
        let note_suffix = notes.map(|n| format!(" ({n})")).unwrap_or_default();
        ok_result(json!({
            "success": true,
            "order_item": line_json,
            "current_total": subtotal,
            "item_count": session.cart_item_count(),
            "message_ar": format!(
                "تمام! أضفت {}× {}{}. المجموع: {} ريال",
                quantity, item.name_ar, note_suffix, subtotal
            ),
        }))
    }

    fn get_current_order(&self, session: &Session) -> ToolOutcome {
        if session.cart.is_empty() {
            return ok_result(json!({
                "items": [],
                "subtotal": 0.0,
                "item_count": 0,
                "summary_ar": "السلة فارغة",
            }));
        }

        let subtotal = session.cart_subtotal();
        let mut lines = Vec::new();
        for item in &session.cart {
            let mut line = format!(
                "• {}× {} = {} ريال",
                item.quantity, item.name_ar, item.line_total
            );
            if let Some(notes) = &item.notes {
                line.push_str(&format!(" ({notes})"));
            }
            lines.push(line);
        }
        let summary_ar = format!("{}\n\nالمجموع: {} ريال", lines.join("\n"), subtotal);

        ok_result(json!({
            "items": serde_json::to_value(&session.cart).unwrap_or(Value::Null),
            "subtotal": subtotal,
            "item_count": session.cart_item_count(),
            "summary_ar": summary_ar,
        }))
    }

    fn update_order_item(&self, args: &UpdateItemArgs, session: &mut Session) -> ToolOutcome {
        let Some(idx) = session
            .cart
            .iter()
            .position(|i| i.menu_item_id == args.item_id)
        else {
            return err_result("الصنف مو موجود في السلة");
        };

        if let Some(raw_qty) = args.quantity {
            if raw_qty == 0 {
                let removed = session.cart.remove(idx);
                return ok_result(json!({
                    "success": true,
                    "action": "removed",
                    "new_subtotal": session.cart_subtotal(),
                    "message_ar": format!("شلت {} من السلة", removed.name_ar),
                }));
            }
            let quantity = match validate_quantity(raw_qty) {
                Ok(q) => q,
                Err(msg) => return err_result(msg),
            };
            session.cart[idx].quantity = quantity;
            session.cart[idx].recompute_total();
        }

        if let Some(notes) = &args.notes {
            session.cart[idx].notes = if notes.trim().is_empty() {
                None
            } else {
                Some(notes.clone())
            };
        }

        let item = &session.cart[idx];
        ok_result(json!({
            "success": true,
            "action": "updated",
            "new_subtotal": session.cart_subtotal(),
            "message_ar": format!("تمام، صارت {}× {}", item.quantity, item.name_ar),
        }))
    }

    fn remove_from_order(&self, args: &ItemIdArgs, session: &mut Session) -> ToolOutcome {
        if !session.remove_from_cart(args.item_id) {
            return err_result("الصنف مو موجود في السلة");
        }
        ok_result(json!({
            "success": true,
            "new_subtotal": session.cart_subtotal(),
            "message_ar": "تم حذف الصنف من السلة",
        }))
    }

    async fn calculate_total(
        &self,
        args: &CalculateTotalArgs,
        session: &mut Session,
    ) -> ToolOutcome {
        if session.cart.is_empty() {
            return err_result("السلة فارغة");
        }

        let subtotal = session.cart_subtotal();
        // The passed-in fee is used verbatim: pickup paths pass 0.
        let delivery_fee = args.delivery_fee.unwrap_or(0.0);

        let mut discount = 0.0;
        let mut promo_message_ar = String::new();
        let mut promo_applied = false;
        let mut applied_code: Option<String> = None;

        if let Some(raw_code) = args.promo_code.as_deref().filter(|c| !c.trim().is_empty()) {
            let code = raw_code.trim().to_uppercase();
            match self.promos.get_by_code(&code).await {
                Ok(Some(promo)) => {
                    let decision = evaluate_promo(&promo, subtotal, chrono::Utc::now());
                    promo_message_ar = decision.message_ar;
                    if decision.valid {
                        discount = decision.discount;
                        promo_applied = true;
                        applied_code = Some(code);
                    }
                }
                Ok(None) => {
                    promo_message_ar = "كود الخصم غير صحيح".into();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "promo lookup failed");
                    promo_message_ar = "تعذر التحقق من كود الخصم حالياً".into();
                }
            }
        }

        if let Some(code) = applied_code {
            session.applied_promo_code = Some(code);
        }

        let total = subtotal + delivery_fee - discount;

        let mut breakdown = vec![format!("المجموع الفرعي: {}", format_price_ar(subtotal))];
        if delivery_fee > 0.0 {
            breakdown.push(format!("رسوم التوصيل: {}", format_price_ar(delivery_fee)));
        }
        if discount > 0.0 {
            breakdown.push(format!("الخصم: -{}", format_price_ar(discount)));
        }
        breakdown.push(format!("الإجمالي: {}", format_price_ar(total)));
        if !promo_message_ar.is_empty() {
            breakdown.push(promo_message_ar.clone());
        }

        ok_result(json!({
            "success": true,
            "subtotal": subtotal,
            "delivery_fee": delivery_fee,
            "discount": discount,
            "total": total,
            "breakdown_ar": breakdown.join("\n"),
            "promo_applied": promo_applied,
            "promo_message_ar": promo_message_ar,
        }))
    }

    async fn confirm_order(&self, args: &ConfirmOrderArgs, session: &mut Session) -> ToolOutcome {
        if session.cart.is_empty() {
            return err_result("السلة فارغة");
        }
        let customer_name = match validate_customer_name(&args.customer_name) {
            Ok(n) => n,
            Err(msg) => return err_result(msg),
        };
        let customer_phone = match validate_saudi_phone(&args.customer_phone) {
            Ok(p) => p,
            Err(msg) => return err_result(msg),
        };

        let order_type = match args.order_type.as_deref() {
            Some("pickup") => OrderType::Pickup,
            Some("delivery") => OrderType::Delivery,
            _ => session.order_type,
        };

        // Delivery orders must reference a validated coverage area.
        let delivery_area_id = match order_type {
            OrderType::Delivery => match session.location.area_id {
                Some(id) => Some(id),
                None => {
                    return err_result(
                        "ما عندنا منطقة توصيل مؤكدة. رجّع العميل لتحديد الموقع أول.",
                    )
                }
            },
            OrderType::Pickup => None,
        };

        let subtotal = session.cart_subtotal();
        let delivery_fee = match order_type {
            OrderType::Delivery => args.delivery_fee.unwrap_or(session.delivery_fee),
            OrderType::Pickup => 0.0,
        };
        let discount = args.discount.unwrap_or(0.0);
        let total = subtotal + delivery_fee - discount;

        // Resolve the promo row id so usage accounting joins the same
        // transaction. Only counts when a discount actually applied.
        let promo_code_id = if discount > 0.0 {
            match &session.applied_promo_code {
                Some(code) => match self.promos.get_by_code(code).await {
                    Ok(Some(promo)) => Some(promo.id),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!(error = %e, "promo lookup failed during confirm");
                        return err_result("صار خطأ أثناء حفظ الطلب، حاول مرة ثانية");
                    }
                },
                None => None,
            }
        } else {
            None
        };

        let delivery_address = match order_type {
            OrderType::Delivery => {
                let rendered = session.location.to_address_string();
                if rendered.is_empty() {
                    args.district.clone()
                } else {
                    Some(rendered)
                }
            }
            OrderType::Pickup => Some(PICKUP_BRANCH_AR.into()),
        };

        let lines: Vec<NewOrderLine> = session
            .cart
            .iter()
            .map(|item| NewOrderLine {
                menu_item_id: item.menu_item_id,
                item_name_ar: item.name_ar.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.line_total,
                notes: item.notes.clone(),
                modifiers: item.modifiers.clone(),
            })
            .collect();

        let new_order = NewOrder {
            session_id: session.session_id.clone(),
            customer_name: customer_name.clone(),
            customer_phone: customer_phone.clone(),
            delivery_address,
            delivery_area_id,
            order_type: order_type.as_str().into(),
            subtotal,
            delivery_fee,
            discount_amount: discount,
            promo_code_id,
            total,
            notes: args.notes.clone(),
            lines,
        };

        let created = match self.orders.create_order(&new_order).await {
            Ok(c) => c,
            Err(e) => {
                // Atomic: nothing was written; cart and session survive
                // so the user can retry.
                tracing::error!(error = %e, session_id = %session.session_id, "order creation failed");
                return err_result("صار خطأ أثناء حفظ الطلب، حاول مرة ثانية 🙏");
            }
        };

        let items_summary = session
            .cart
            .iter()
            .map(|item| {
                format!(
                    "  • {}× {} = {} ريال",
                    item.quantity, item.name_ar, item.line_total
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let location_text = match order_type {
            OrderType::Delivery => format!(
                "📍 التوصيل إلى: {}",
                session
                    .location
                    .area_name
                    .clone()
                    .or_else(|| args.district.clone())
                    .unwrap_or_default()
            ),
            OrderType::Pickup => "📍 استلام من الفرع".into(),
        };
        let fee_text = if delivery_fee > 0.0 {
            format!("\n🚗 رسوم التوصيل: {delivery_fee} ريال")
        } else {
            String::new()
        };
        let discount_text = if discount > 0.0 {
            format!("\n🎁 الخصم: -{discount} ريال")
        } else {
            String::new()
        };

        let confirmation_ar = format!(
            "✅ تم تأكيد طلبك!\n\n🔢 رقم الطلب: {}\n\n📋 الطلب:\n{}\n\n💰 المجموع: {} ريال{}{}\n💵 الإجمالي: {} ريال\n\n{}\n👤 الاسم: {}\n📱 الجوال: {}\n\n💳 الدفع عند الاستلام\n\nشكراً لك! 🙏",
            created.order_number,
            items_summary,
            subtotal,
            fee_text,
            discount_text,
            total,
            location_text,
            customer_name,
            customer_phone,
        );

        // Persist customer identity and empty the cart only after the
        // transaction committed.
        session.customer_name = Some(customer_name);
        session.customer_phone = Some(customer_phone);
        session.clear_cart();

        ok_result(json!({
            "success": true,
            "order_id": created.order_id,
            "order_number": created.order_number,
            "total": total,
            "confirmation_ar": confirmation_ar,
        }))
    }
}
