//! Handoff markers.
//!
//! Agents request transitions by appending `[HANDOFF:<target>]` to
//! their reply. The orchestrator extracts the marker, strips it from
//! the user-visible text, and maps it through the breadcrumb rules.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffTarget {
    Location,
    Order,
    Checkout,
    End,
}

const MARKERS: &[(&str, HandoffTarget)] = &[
    ("[HANDOFF:location]", HandoffTarget::Location),
    ("[HANDOFF:order]", HandoffTarget::Order),
    ("[HANDOFF:checkout]", HandoffTarget::Checkout),
    ("[HANDOFF:end]", HandoffTarget::End),
];

/// The first handoff marker present in the text, if any.
pub fn extract_handoff(text: &str) -> Option<HandoffTarget> {
    MARKERS
        .iter()
        .filter_map(|(marker, target)| text.find(marker).map(|pos| (pos, *target)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, target)| target)
}

/// Remove every handoff marker from the user-visible text.
pub fn strip_handoff(text: &str) -> String {
    let mut out = text.to_string();
    for (marker, _) in MARKERS {
        out = out.replace(marker, "");
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_each_target() {
        assert_eq!(
            extract_handoff("تمام! [HANDOFF:location]"),
            Some(HandoffTarget::Location)
        );
        assert_eq!(
            extract_handoff("خلني أحولك [HANDOFF:order]"),
            Some(HandoffTarget::Order)
        );
        assert_eq!(
            extract_handoff("[HANDOFF:checkout]"),
            Some(HandoffTarget::Checkout)
        );
        assert_eq!(extract_handoff("مع السلامة [HANDOFF:end]"), Some(HandoffTarget::End));
    }

    #[test]
    fn no_marker_is_none() {
        assert_eq!(extract_handoff("تبي شي ثاني؟"), None);
    }

    #[test]
    fn first_marker_wins() {
        let text = "x [HANDOFF:order] y [HANDOFF:end]";
        assert_eq!(extract_handoff(text), Some(HandoffTarget::Order));
    }

    #[test]
    fn strip_removes_all_markers_and_trims() {
        let text = "تمام! خلني أحولك [HANDOFF:checkout] ";
        assert_eq!(strip_handoff(text), "تمام! خلني أحولك");
        let text = "[HANDOFF:order][HANDOFF:end]";
        assert_eq!(strip_handoff(text), "");
    }
}
