//! Fill style types

use super::Color;

/// Fill pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatternType {
    /// No pattern
    #[default]
    None,
    /// Solid (100% foreground)
    Solid,
    /// 50% gray
    MediumGray,
    /// 75% gray
    DarkGray,
    /// 25% gray
    LightGray,
    /// 12.5% gray
    Gray125,
    /// 6.25% gray
    Gray0625,
}

impl PatternType {
    /// XML attribute value for this pattern
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::None => "none",
            PatternType::Solid => "solid",
            PatternType::MediumGray => "mediumGray",
            PatternType::DarkGray => "darkGray",
            PatternType::LightGray => "lightGray",
            PatternType::Gray125 => "gray125",
            PatternType::Gray0625 => "gray0625",
        }
    }

    /// Parse an XML attribute value; unknown patterns read as `None`
    pub fn from_str(s: &str) -> Self {
        match s {
            "solid" => PatternType::Solid,
            "mediumGray" => PatternType::MediumGray,
            "darkGray" => PatternType::DarkGray,
            "lightGray" => PatternType::LightGray,
            "gray125" => PatternType::Gray125,
            "gray0625" => PatternType::Gray0625,
            _ => PatternType::None,
        }
    }
}

/// Background fill of a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fill {
    pub pattern: PatternType,
    /// Foreground color of the pattern
    pub color: Option<Color>,
}

impl Fill {
    /// A solid fill of one color
    pub fn solid(color: Color) -> Self {
        Self {
            pattern: PatternType::Solid,
            color: Some(color),
        }
    }

    /// Whether this fill draws nothing
    pub fn is_none(&self) -> bool {
        self.pattern == PatternType::None
    }
}
