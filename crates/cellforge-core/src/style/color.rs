//! Color descriptions and their canonical RGB form

use std::fmt;

/// Named colors accepted wherever a color description is expected
const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "000000"),
    ("white", "FFFFFF"),
    ("red", "FF0000"),
    ("green", "00FF00"),
    ("blue", "0000FF"),
    ("yellow", "FFFF00"),
    ("cyan", "00FFFF"),
    ("magenta", "FF00FF"),
    ("darkblue", "000080"),
    ("darkgreen", "008000"),
    ("darkred", "800000"),
    ("purple", "800080"),
    ("orange", "FFA500"),
    ("gray", "808080"),
    ("lightblue", "ADD8E6"),
    ("lightgreen", "90EE90"),
    ("lightyellow", "FFFFE0"),
    ("lightgray", "D3D3D3"),
    ("lightcyan", "E0FFFF"),
    ("lightcoral", "F08080"),
    ("lightpink", "FFB6C1"),
    ("gold", "FFD700"),
    ("lavender", "E6E6FA"),
];

/// A color as the user described it ("red", "#ff0000", "FF0000")
///
/// Equality compares the canonical RGB form, so `Color::new("red")` equals
/// `Color::new("#FF0000")`.
#[derive(Debug, Clone)]
pub struct Color {
    description: String,
}

impl Color {
    /// Create a color from a name or hex description
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// Create a color from RGB components
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(format!("{:02X}{:02X}{:02X}", r, g, b))
    }

    /// Black
    pub fn black() -> Self {
        Self::new("000000")
    }

    /// The description this color was created from
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Canonical 6-digit uppercase RGB hex (no `#`)
    ///
    /// Named colors go through a fixed lookup, `#RRGGBB` and `RRGGBB` are
    /// uppercased, `AARRGGBB` drops its alpha byte. Anything else is black.
    pub fn to_rgb_hex(&self) -> String {
        canonical_hex(&self.description)
    }

    /// ARGB hex as written in XLSX style parts (always opaque)
    pub fn to_argb_hex(&self) -> String {
        format!("FF{}", self.to_rgb_hex())
    }
}

/// Canonicalise a color description to 6-digit uppercase RGB hex
pub fn canonical_hex(description: &str) -> String {
    let d = description.trim();
    let lower = d.to_ascii_lowercase();
    if let Some((_, hex)) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
        return (*hex).to_string();
    }

    let hex = d.strip_prefix('#').unwrap_or(d);
    let is_hex = hex.chars().all(|c| c.is_ascii_hexdigit());
    match hex.len() {
        6 if is_hex => hex.to_ascii_uppercase(),
        8 if is_hex => hex[2..].to_ascii_uppercase(),
        _ => "000000".to_string(),
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.to_rgb_hex() == other.to_rgb_hex()
    }
}

impl Eq for Color {}

impl std::hash::Hash for Color {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_rgb_hex().hash(state);
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_rgb_hex())
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Color::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_hex() {
        assert_eq!(canonical_hex("red"), "FF0000");
        assert_eq!(canonical_hex("LightBlue"), "ADD8E6");
        assert_eq!(canonical_hex("#ff0000"), "FF0000");
        assert_eq!(canonical_hex("00ff7f"), "00FF7F");
        assert_eq!(canonical_hex("FF112233"), "112233");
        assert_eq!(canonical_hex("not-a-color"), "000000");
        assert_eq!(canonical_hex("#12"), "000000");
    }

    #[test]
    fn test_named_and_hex_compare_equal() {
        assert_eq!(Color::new("red"), Color::new("#FF0000"));
        assert_ne!(Color::new("red"), Color::new("blue"));
        assert_eq!(Color::rgb(255, 0, 0).to_argb_hex(), "FFFF0000");
    }
}
