//! Symbolic color names

use design_mcp_core::{DesignError, Result};

const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("red", "#ff0000"),
    ("green", "#008000"),
    ("lime", "#00ff00"),
    ("blue", "#0000ff"),
    ("yellow", "#ffff00"),
    ("orange", "#ffa500"),
    ("purple", "#800080"),
    ("pink", "#ffc0cb"),
    ("brown", "#a52a2a"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("lightgray", "#d3d3d3"),
    ("lightgrey", "#d3d3d3"),
    ("darkgray", "#a9a9a9"),
    ("darkgrey", "#a9a9a9"),
    ("cyan", "#00ffff"),
    ("magenta", "#ff00ff"),
    ("navy", "#000080"),
    ("teal", "#008080"),
    ("olive", "#808000"),
    ("maroon", "#800000"),
    ("silver", "#c0c0c0"),
    ("gold", "#ffd700"),
    ("indigo", "#4b0082"),
    ("violet", "#ee82ee"),
    ("lightblue", "#add8e6"),
    ("darkblue", "#00008b"),
    ("lightgreen", "#90ee90"),
    ("darkgreen", "#006400"),
    ("transparent", "#00000000"),
];

/// Resolve a color name or hex string to lowercase hex
///
/// Names ignore case, spaces, hyphens and underscores ("Light Gray" works).
pub fn translate(color: &str) -> Option<String> {
    let color = color.trim();

    if let Some(hex) = color.strip_prefix('#') {
        let valid = matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
        return valid.then(|| format!("#{}", hex.to_ascii_lowercase()));
    }

    let key: String = color
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, hex)| hex.to_string())
}

/// Translate the named color fields of a parameter object in place
pub fn translate_fields(
    params: &mut serde_json::Map<String, serde_json::Value>,
    fields: &[&str],
) -> Result<()> {
    for field in fields {
        let Some(value) = params.get_mut(*field) else {
            continue;
        };
        let Some(raw) = value.as_str() else {
            continue;
        };

        let hex = translate(raw).ok_or_else(|| {
            DesignError::InvalidParams(format!("{}: unknown color '{}'", field, raw))
        })?;
        *value = serde_json::Value::String(hex);
    }
    Ok(())
}
