//! Style presets: a named theme per infographic look.
//!
//! Each [`StylePreset`] resolves to an immutable [`StyleTheme`] (colours,
//! fonts, row and icon-frame decoration) used by the layout stage, and to
//! an icon prompt template used by the image generator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visual theme of the generated infographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StylePreset {
    /// Blue and slate, uppercase title, thin row rules. (default)
    #[default]
    Corporate,
    /// Green-to-blue gradient with translucent cards.
    ColorfulSocial,
    /// Serif body, black on white.
    Minimalist,
    /// Near-black background with a cyan accent.
    ModernDark,
    /// Pale green with rounded white icon tiles.
    FreshClean,
    /// Cream background, bold black title, rose accents.
    Geometric,
}

impl StylePreset {
    pub const ALL: [StylePreset; 6] = [
        StylePreset::Corporate,
        StylePreset::ColorfulSocial,
        StylePreset::Minimalist,
        StylePreset::ModernDark,
        StylePreset::FreshClean,
        StylePreset::Geometric,
    ];

    /// Display name, e.g. `"Fresh & Clean"`.
    pub fn name(self) -> &'static str {
        match self {
            StylePreset::Corporate => "Corporate",
            StylePreset::ColorfulSocial => "Colorful Social",
            StylePreset::Minimalist => "Minimalist",
            StylePreset::ModernDark => "Modern Dark",
            StylePreset::FreshClean => "Fresh & Clean",
            StylePreset::Geometric => "Geometric",
        }
    }

    /// Kebab-case identifier used on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            StylePreset::Corporate => "corporate",
            StylePreset::ColorfulSocial => "colorful-social",
            StylePreset::Minimalist => "minimalist",
            StylePreset::ModernDark => "modern-dark",
            StylePreset::FreshClean => "fresh-clean",
            StylePreset::Geometric => "geometric",
        }
    }

    pub fn theme(self) -> &'static StyleTheme {
        match self {
            StylePreset::Corporate => &CORPORATE,
            StylePreset::ColorfulSocial => &COLORFUL_SOCIAL,
            StylePreset::Minimalist => &MINIMALIST,
            StylePreset::ModernDark => &MODERN_DARK,
            StylePreset::FreshClean => &FRESH_CLEAN,
            StylePreset::Geometric => &GEOMETRIC,
        }
    }

    /// Icon prompt template. `{keyword}` is replaced per insight.
    pub fn icon_prompt_template(self) -> &'static str {
        match self {
            StylePreset::Corporate => "A professional, clean, single-color line icon representing '{keyword}'. The icon should be simple, modern, and suitable for a corporate presentation, using a blue and gray color palette. White background.",
            StylePreset::ColorfulSocial => "A vibrant, colorful, and friendly illustration-style icon for '{keyword}'. It should be bold, eye-catching, and suitable for social media. Use a bright, energetic color palette. White background.",
            StylePreset::Minimalist => "An elegant, ultra-thin, minimalist line icon for '{keyword}'. The design should be pure, simple, and use only black or dark gray lines. Emphasize whitespace and geometric purity. White background.",
            StylePreset::ModernDark => "A modern, professional icon for '{keyword}' for a dark-themed infographic. Use a bright, single accent color (like teal or cyan) on a transparent background. The style should be clean, thin lines.",
            StylePreset::FreshClean => "A friendly, simple, filled-shape icon representing '{keyword}'. Use a soft and fresh color palette (like light green, sky blue). The style should be clean and approachable. White background.",
            StylePreset::Geometric => "A bold, geometric icon for '{keyword}'. The design should be constructed from simple shapes (circles, squares, triangles) and use a vibrant, high-contrast color palette. White background.",
        }
    }

    /// The icon prompt for a single keyword.
    pub fn icon_prompt(self, keyword: &str) -> String {
        self.icon_prompt_template().replace("{keyword}", keyword)
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StylePreset {
    type Err = String;

    /// Accepts the display name or slug, case-insensitively
    /// (`"Modern Dark"`, `"modern-dark"`, `"modern_dark"`, `"fresh & clean"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        StylePreset::ALL
            .into_iter()
            .find(|p| p.slug().replace('-', "") == key)
            .ok_or_else(|| {
                let names: Vec<&str> = StylePreset::ALL.iter().map(|p| p.slug()).collect();
                format!("unknown style '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

// ── Theme descriptor ─────────────────────────────────────────────────────

/// Canvas fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Solid(&'static str),
    /// Diagonal gradient from the top-left corner to the bottom-right.
    LinearGradient {
        from: &'static str,
        to: &'static str,
    },
}

/// A line around or above a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: &'static str,
    pub width: f32,
}

/// Typography for one text role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Overrides the theme font when set.
    pub font_family: Option<&'static str>,
    pub size: f32,
    pub weight: u16,
    /// Overrides the theme text colour when set.
    pub color: Option<&'static str>,
    pub uppercase: bool,
    pub letter_spacing: f32,
    pub line_height: f32,
    pub opacity: f32,
}

impl TextStyle {
    pub const DEFAULT: TextStyle = TextStyle {
        font_family: None,
        size: 30.0,
        weight: 400,
        color: None,
        uppercase: false,
        letter_spacing: 0.0,
        line_height: 1.2,
        opacity: 1.0,
    };
}

/// Decoration of one insight row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowStyle {
    /// Rule drawn along the top edge of the row.
    pub top_rule: Option<Stroke>,
    /// Card fill behind the row.
    pub fill: Option<&'static str>,
    pub radius: f32,
    pub padding_x: f32,
}

impl RowStyle {
    pub const PLAIN: RowStyle = RowStyle {
        top_rule: None,
        fill: None,
        radius: 0.0,
        padding_x: 0.0,
    };
}

/// Corner shape of the icon frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Corner {
    Circle,
    Rounded(f32),
}

/// Box drawn behind each icon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStyle {
    pub fill: Option<&'static str>,
    pub stroke: Option<Stroke>,
    pub corner: Corner,
    pub shadow: bool,
}

impl FrameStyle {
    pub const NONE: FrameStyle = FrameStyle {
        fill: None,
        stroke: None,
        corner: Corner::Rounded(0.0),
        shadow: false,
    };
}

/// Everything the layout stage needs to know about a preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleTheme {
    pub background: Background,
    pub text_color: &'static str,
    pub font_family: &'static str,
    pub title: TextStyle,
    pub insight_title: TextStyle,
    pub insight_description: TextStyle,
    pub row: RowStyle,
    pub icon_frame: FrameStyle,
}

const INTER: &str = "'Inter', sans-serif";
const POPPINS: &str = "'Poppins', sans-serif";
const SOURCE_SERIF: &str = "'Source Serif 4', serif";

static CORPORATE: StyleTheme = StyleTheme {
    background: Background::Solid("#f8fafc"),
    text_color: "#0f172a",
    font_family: INTER,
    title: TextStyle {
        font_family: Some(POPPINS),
        size: 88.0,
        weight: 700,
        color: Some("#1e3a8a"),
        uppercase: true,
        letter_spacing: -2.0,
        ..TextStyle::DEFAULT
    },
    insight_title: TextStyle {
        size: 44.0,
        weight: 700,
        color: Some("#1e3a8a"),
        ..TextStyle::DEFAULT
    },
    insight_description: TextStyle {
        size: 30.0,
        color: Some("#334155"),
        line_height: 1.6,
        ..TextStyle::DEFAULT
    },
    row: RowStyle {
        top_rule: Some(Stroke {
            color: "#e2e8f0",
            width: 2.0,
        }),
        ..RowStyle::PLAIN
    },
    icon_frame: FrameStyle {
        fill: Some("#eff6ff"),
        stroke: Some(Stroke {
            color: "#dbeafe",
            width: 2.0,
        }),
        corner: Corner::Circle,
        shadow: false,
    },
};

static COLORFUL_SOCIAL: StyleTheme = StyleTheme {
    background: Background::LinearGradient {
        from: "#6EE7B7",
        to: "#3B82F6",
    },
    text_color: "#ffffff",
    font_family: POPPINS,
    title: TextStyle {
        size: 100.0,
        weight: 700,
        ..TextStyle::DEFAULT
    },
    insight_title: TextStyle {
        size: 48.0,
        weight: 700,
        ..TextStyle::DEFAULT
    },
    insight_description: TextStyle {
        size: 32.0,
        line_height: 1.5,
        opacity: 0.9,
        ..TextStyle::DEFAULT
    },
    row: RowStyle {
        top_rule: None,
        fill: Some("rgba(255,255,255,0.1)"),
        radius: 24.0,
        padding_x: 20.0,
    },
    icon_frame: FrameStyle {
        fill: None,
        stroke: None,
        corner: Corner::Rounded(16.0),
        shadow: true,
    },
};

static MINIMALIST: StyleTheme = StyleTheme {
    background: Background::Solid("#ffffff"),
    text_color: "#111827",
    font_family: SOURCE_SERIF,
    title: TextStyle {
        size: 92.0,
        weight: 700,
        letter_spacing: 1.0,
        ..TextStyle::DEFAULT
    },
    insight_title: TextStyle {
        font_family: Some(INTER),
        size: 40.0,
        weight: 700,
        uppercase: true,
        letter_spacing: 2.0,
        ..TextStyle::DEFAULT
    },
    insight_description: TextStyle {
        size: 32.0,
        color: Some("#4b5563"),
        line_height: 1.7,
        ..TextStyle::DEFAULT
    },
    row: RowStyle {
        top_rule: Some(Stroke {
            color: "#e5e7eb",
            width: 1.0,
        }),
        ..RowStyle::PLAIN
    },
    icon_frame: FrameStyle::NONE,
};

static MODERN_DARK: StyleTheme = StyleTheme {
    background: Background::Solid("#111827"),
    text_color: "#d1d5db",
    font_family: INTER,
    title: TextStyle {
        font_family: Some(POPPINS),
        size: 92.0,
        weight: 700,
        color: Some("#ffffff"),
        uppercase: true,
        letter_spacing: -1.5,
        ..TextStyle::DEFAULT
    },
    insight_title: TextStyle {
        size: 44.0,
        weight: 700,
        color: Some("#22d3ee"),
        ..TextStyle::DEFAULT
    },
    insight_description: TextStyle {
        size: 30.0,
        color: Some("#d1d5db"),
        line_height: 1.6,
        ..TextStyle::DEFAULT
    },
    row: RowStyle {
        top_rule: Some(Stroke {
            color: "#374151",
            width: 1.0,
        }),
        ..RowStyle::PLAIN
    },
    icon_frame: FrameStyle::NONE,
};

static FRESH_CLEAN: StyleTheme = StyleTheme {
    background: Background::Solid("#f0fdf4"),
    text_color: "#1f2937",
    font_family: INTER,
    title: TextStyle {
        font_family: Some(POPPINS),
        size: 92.0,
        weight: 700,
        color: Some("#166534"),
        ..TextStyle::DEFAULT
    },
    insight_title: TextStyle {
        size: 44.0,
        weight: 700,
        color: Some("#15803d"),
        ..TextStyle::DEFAULT
    },
    insight_description: TextStyle {
        size: 30.0,
        color: Some("#374151"),
        line_height: 1.6,
        ..TextStyle::DEFAULT
    },
    row: RowStyle::PLAIN,
    icon_frame: FrameStyle {
        fill: Some("#ffffff"),
        stroke: Some(Stroke {
            color: "#bbf7d0",
            width: 2.0,
        }),
        corner: Corner::Rounded(16.0),
        shadow: false,
    },
};

static GEOMETRIC: StyleTheme = StyleTheme {
    background: Background::Solid("#fffbeb"),
    text_color: "#1f2937",
    font_family: POPPINS,
    title: TextStyle {
        size: 96.0,
        weight: 900,
        color: Some("#000000"),
        uppercase: true,
        ..TextStyle::DEFAULT
    },
    insight_title: TextStyle {
        size: 44.0,
        weight: 700,
        color: Some("#be123c"),
        ..TextStyle::DEFAULT
    },
    insight_description: TextStyle {
        font_family: Some(INTER),
        size: 30.0,
        line_height: 1.5,
        color: Some("#374151"),
        ..TextStyle::DEFAULT
    },
    row: RowStyle {
        padding_x: 20.0,
        ..RowStyle::PLAIN
    },
    icon_frame: FrameStyle {
        fill: Some("#fecdd3"),
        stroke: None,
        corner: Corner::Rounded(0.0),
        shadow: false,
    },
};
