//! Border style types

use super::Color;

/// Line style of one border edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderLineStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
}

impl BorderLineStyle {
    /// XML attribute value for this line style
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderLineStyle::None => "none",
            BorderLineStyle::Thin => "thin",
            BorderLineStyle::Medium => "medium",
            BorderLineStyle::Thick => "thick",
            BorderLineStyle::Dashed => "dashed",
            BorderLineStyle::Dotted => "dotted",
            BorderLineStyle::Double => "double",
            BorderLineStyle::Hair => "hair",
        }
    }

    /// Parse an XML attribute value; unknown styles read as `None`
    pub fn from_str(s: &str) -> Self {
        match s {
            "thin" => BorderLineStyle::Thin,
            "medium" => BorderLineStyle::Medium,
            "thick" => BorderLineStyle::Thick,
            "dashed" => BorderLineStyle::Dashed,
            "dotted" => BorderLineStyle::Dotted,
            "double" => BorderLineStyle::Double,
            "hair" => BorderLineStyle::Hair,
            _ => BorderLineStyle::None,
        }
    }
}

/// One edge of a cell border
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BorderEdge {
    pub style: BorderLineStyle,
    pub color: Color,
}

impl BorderEdge {
    /// Create a new border edge
    pub fn new(style: BorderLineStyle, color: Color) -> Self {
        Self { style, color }
    }
}

/// Border of a cell, per side
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Border {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
}

impl Border {
    /// Create a border with no edges
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all four edges to the same style
    pub fn all(style: BorderLineStyle, color: Color) -> Self {
        let edge = Some(BorderEdge::new(style, color));
        Self {
            left: edge.clone(),
            right: edge.clone(),
            top: edge.clone(),
            bottom: edge,
        }
    }

    /// Edges in XML order: left, right, top, bottom
    pub fn edges(&self) -> [(&'static str, Option<&BorderEdge>); 4] {
        [
            ("left", self.left.as_ref()),
            ("right", self.right.as_ref()),
            ("top", self.top.as_ref()),
            ("bottom", self.bottom.as_ref()),
        ]
    }

    /// Whether no edge is drawn
    pub fn is_empty(&self) -> bool {
        self.edges()
            .iter()
            .all(|(_, e)| e.map_or(true, |e| e.style == BorderLineStyle::None))
    }
}
