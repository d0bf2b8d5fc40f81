//! Arabic text processing: numeral normalization, name/phone/quantity
//! validation, area-name normalization, and price formatting.
//!
//! Numeral normalization always precedes any pattern matching.

use std::sync::OnceLock;

use regex::Regex;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Numerals
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Map Arabic-Indic (٠-٩) and extended/Persian (۰-۹) digits to ASCII.
/// Idempotent: `normalize_numerals(normalize_numerals(s)) == normalize_numerals(s)`.
pub fn normalize_numerals(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => {
                char::from(b'0' + (c as u32 - 0x0660) as u8)
            }
            '\u{06F0}'..='\u{06F9}' => {
                char::from(b'0' + (c as u32 - 0x06F0) as u8)
            }
            _ => c,
        })
        .collect()
}

/// Extract the first integer in the text (after numeral normalization).
pub fn extract_quantity(text: &str) -> Option<u32> {
    let normalized = normalize_numerals(text);
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+").expect("quantity regex"));
    re.find(&normalized)?.as_str().parse().ok()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Text normalization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Clean Arabic text for matching: strip diacritics and tatweel, unify
/// alef variants, map teh marbuta to heh, collapse whitespace.
pub fn clean_arabic_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            // Tashkeel and the superscript alef.
            '\u{064B}'..='\u{065F}' | '\u{0670}' => {}
            // Tatweel (kashida).
            '\u{0640}' => {}
            'أ' | 'إ' | 'آ' => out.push('ا'),
            'ة' => out.push('ه'),
            _ => out.push(c),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a district/area name for coverage matching: clean the text
/// and drop common prefixes ("حي ", "منطقة ", …).
pub fn normalize_area_name(name: &str) -> String {
    let mut name = clean_arabic_text(name);
    for prefix in ["حي ", "منطقه ", "منطقة ", "شارع ", "طريق "] {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest.to_string();
            break;
        }
    }
    name.trim().to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validators
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validation outcome: the normalized value, or an Arabic explanation.
pub type Validated<T> = std::result::Result<T, String>;

/// Validate and normalize a Saudi mobile number.
///
/// Accepted after numeral normalization and separator stripping:
/// `05XXXXXXXX`, `+966XXXXXXXXX`, `966XXXXXXXXX` — all normalized to
/// the local `05XXXXXXXX` form.
pub fn validate_saudi_phone(raw: &str) -> Validated<String> {
    let mut phone = normalize_numerals(raw);
    phone.retain(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'));

    if let Some(rest) = phone.strip_prefix("+966") {
        phone = format!("0{rest}");
    } else if let Some(rest) = phone.strip_prefix("966") {
        phone = format!("0{rest}");
    }

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^05\d{8}$").expect("phone regex"));
    if re.is_match(&phone) {
        Ok(phone)
    } else {
        Err("رقم الجوال غير صحيح. يجب أن يبدأ بـ 05 ويتكون من 10 أرقام".into())
    }
}

/// Validate a customer name: at least 2 characters, Arabic/Latin
/// letters and spaces only, internal whitespace collapsed.
pub fn validate_customer_name(raw: &str) -> Validated<String> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().filter(|c| !c.is_whitespace()).count() < 2 {
        return Err("يرجى إدخال اسم صحيح (حرفين على الأقل)".into());
    }
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[\u{0600}-\u{06FF}\u{0750}-\u{077F}a-zA-Z\s]+$").expect("name regex")
    });
    if re.is_match(&cleaned) {
        Ok(cleaned)
    } else {
        Err("الاسم يجب أن يحتوي على حروف فقط".into())
    }
}

/// Quantity must be an integer in `[1, 99]`.
pub fn validate_quantity(quantity: i64) -> Validated<u32> {
    if quantity < 1 {
        return Err("الكمية يجب أن تكون 1 على الأقل".into());
    }
    if quantity > 99 {
        return Err("الحد الأقصى للكمية هو 99".into());
    }
    Ok(quantity as u32)
}

/// Delivery address completeness: area, street and building all
/// present. Returns the Arabic names of the missing parts.
pub fn missing_address_parts(
    area: Option<&str>,
    street: Option<&str>,
    building: Option<&str>,
) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if area.map_or(true, |s| s.trim().len() < 2) {
        missing.push("الحي/المنطقة");
    }
    if street.map_or(true, |s| s.trim().len() < 2) {
        missing.push("الشارع");
    }
    if building.map_or(true, |s| s.trim().is_empty()) {
        missing.push("رقم المبنى/الفيلا");
    }
    missing
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Phrase checks & formatting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const CANCEL_PHRASES: &[&str] = &["كنسل", "الغي الطلب", "الغاء الطلب", "إلغاء الطلب", "ابي الغي", "ألغي"];

/// Does the message ask to cancel the whole order?
pub fn is_cancellation(text: &str) -> bool {
    let cleaned = clean_arabic_text(text);
    CANCEL_PHRASES
        .iter()
        .any(|p| cleaned.contains(&clean_arabic_text(p)))
}

pub fn format_price_ar(amount: f64) -> String {
    format!("{amount:.2} ريال")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerals_map_both_scripts() {
        assert_eq!(normalize_numerals("٠٥٥١٢٣٤٥٦٧"), "0551234567");
        assert_eq!(normalize_numerals("۰۵۵۵۰۰۰۰۰۰"), "0555000000");
        assert_eq!(normalize_numerals("abc ١٢ xyz"), "abc 12 xyz");
    }

    #[test]
    fn numeral_normalization_is_idempotent() {
        let inputs = ["٠٥٥١٢٣٤٥٦٧", "۴۲", "plain 123", "حي النرجس ٥"];
        for s in inputs {
            let once = normalize_numerals(s);
            assert_eq!(normalize_numerals(&once), once);
        }
    }

    #[test]
    fn phone_local_form() {
        assert_eq!(validate_saudi_phone("0551234567").unwrap(), "0551234567");
    }

    #[test]
    fn phone_international_forms_normalize() {
        assert_eq!(validate_saudi_phone("+966551234567").unwrap(), "0551234567");
        assert_eq!(validate_saudi_phone("966551234567").unwrap(), "0551234567");
        assert_eq!(validate_saudi_phone("055 123-4567").unwrap(), "0551234567");
    }

    #[test]
    fn phone_arabic_numerals_accepted() {
        assert_eq!(validate_saudi_phone("٠٥٥٥٠٠٠٠٠٠").unwrap(), "0555000000");
    }

    #[test]
    fn phone_rejections() {
        assert!(validate_saudi_phone("123").is_err());
        assert!(validate_saudi_phone("0651234567").is_err());
        assert!(validate_saudi_phone("05512345678").is_err());
    }

    #[test]
    fn name_validation() {
        assert_eq!(validate_customer_name("  محمد   العتيبي ").unwrap(), "محمد العتيبي");
        assert_eq!(validate_customer_name("Khalid").unwrap(), "Khalid");
        assert!(validate_customer_name("م").is_err());
        assert!(validate_customer_name("abc123").is_err());
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(0).is_err());
        assert_eq!(validate_quantity(1).unwrap(), 1);
        assert_eq!(validate_quantity(99).unwrap(), 99);
        assert!(validate_quantity(100).is_err());
    }

    #[test]
    fn area_name_prefix_and_alef() {
        assert_eq!(normalize_area_name("حي النرجس"), "النرجس");
        assert_eq!(normalize_area_name("  النرجس  "), "النرجس");
        // Alef variants unify.
        assert_eq!(normalize_area_name("أبها"), "ابها");
    }

    #[test]
    fn clean_strips_diacritics_and_tatweel() {
        assert_eq!(clean_arabic_text("مـــرحَباً"), "مرحبا");
    }

    #[test]
    fn quantity_extraction_handles_arabic_digits() {
        assert_eq!(extract_quantity("ابي ٣ برجر"), Some(3));
        assert_eq!(extract_quantity("بدون رقم"), None);
    }

    #[test]
    fn cancellation_phrases() {
        assert!(is_cancellation("خلاص كنسل الطلب"));
        assert!(is_cancellation("ابي الغي الطلب كله"));
        assert!(!is_cancellation("ابي برجر"));
    }

    #[test]
    fn missing_address_reports_arabic_parts() {
        let missing = missing_address_parts(Some("النرجس"), None, None);
        assert_eq!(missing, vec!["الشارع", "رقم المبنى/الفيلا"]);
        assert!(missing_address_parts(Some("النرجس"), Some("التخصصي"), Some("12")).is_empty());
    }
}
