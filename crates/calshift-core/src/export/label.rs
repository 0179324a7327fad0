//! Informational name suffixes for relocated maps.

use crate::map::{AxisMatchType, MapEntity, MatchType};

const MARKERS: [&str; 7] = ["(seq)", "(fuzzy)", "(deep)", "(x-off)", "(?x)", "(y-off)", "(?y)"];

/// Remove trailing markers left by an earlier export
pub fn strip_markers(name: &str) -> &str {
    let mut clean = name.trim_end();
    while let Some(rest) = MARKERS.iter().find_map(|m| clean.strip_suffix(m)) {
        clean = rest.trim_end();
    }
    clean
}

/// Markers describing how `entity` was resolved, in display order
pub fn markers(entity: &MapEntity) -> Vec<&'static str> {
    let mut out = Vec::new();
    match entity.match_type() {
        MatchType::Sequential => out.push("(seq)"),
        MatchType::Fuzzy => out.push("(fuzzy)"),
        _ => {}
    }
    if entity.match_type().is_resolved() && entity.resolution.is_deep() {
        out.push("(deep)");
    }
    match entity.x_resolution.match_type {
        AxisMatchType::Offset => out.push("(x-off)"),
        AxisMatchType::Guess => out.push("(?x)"),
        _ => {}
    }
    match entity.y_resolution.match_type {
        AxisMatchType::Offset => out.push("(y-off)"),
        AxisMatchType::Guess => out.push("(?y)"),
        _ => {}
    }
    out
}

/// Map name with stale markers replaced by current ones
pub fn display_label(entity: &MapEntity) -> String {
    let mut label = strip_markers(&entity.name).to_string();
    for marker in markers(entity) {
        label.push(' ');
        label.push_str(marker);
    }
    label
}
