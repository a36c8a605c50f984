// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration: detection thresholds and the font mapping table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Result, UnredactError};

/// Tunables for the unredaction pipeline.
///
/// Every threshold the detector and resolver use lives here so that runs are
/// reproducible and boundaries can be tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A color is dark when its brightest RGB channel is at or below this
    /// value (0.0–1.0).
    pub dark_threshold: f32,
    /// Additional colors treated as censor marks (e.g. solid white-out).
    pub censor_colors: Vec<Color>,
    /// Per-channel tolerance when matching `censor_colors`.
    pub censor_color_tolerance: f32,
    /// Minimum occluder area in square points.
    pub min_area: f64,
    /// Minimum occluder extent in points along both axes; thinner fills are
    /// rules and underlines, not marks.
    pub min_thickness: f64,
    /// Only classify shapes that overlap something painted earlier.
    pub require_overlap: bool,
    /// Maximum luma variance (0–1 scale) for an image to count as solid.
    pub image_variance_threshold: f32,
    /// Fraction of the smaller box that must be covered for an op to count as
    /// hidden by an occluder.
    pub min_overlap_fraction: f64,
    /// Edge tolerance in points when pairing stacked images.
    pub pair_tolerance: f64,
    /// Per-channel tolerance (0.0–1.0) when matching pixels against a
    /// transparency pair's background.
    pub background_match_tolerance: f32,
    /// Color that replaces simulated-transparent pixels.
    pub backdrop: Color,
    pub fonts: FontMap,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 0.10,
            censor_colors: Vec::new(),
            censor_color_tolerance: 0.02,
            min_area: 16.0,
            min_thickness: 2.0,
            require_overlap: false,
            image_variance_threshold: 0.002,
            min_overlap_fraction: 0.5,
            pair_tolerance: 0.5,
            background_match_tolerance: 0.08,
            backdrop: Color::white(),
            fonts: FontMap::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration; missing fields keep
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values outside the range each threshold is defined on.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("dark_threshold", self.dark_threshold),
            ("censor_color_tolerance", self.censor_color_tolerance),
            ("image_variance_threshold", self.image_variance_threshold),
            ("background_match_tolerance", self.background_match_tolerance),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(UnredactError::Config(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_overlap_fraction) {
            return Err(UnredactError::Config(format!(
                "min_overlap_fraction must be between 0 and 1, got {}",
                self.min_overlap_fraction
            )));
        }
        let lengths = [
            ("min_area", self.min_area),
            ("min_thickness", self.min_thickness),
            ("pair_tolerance", self.pair_tolerance),
        ];
        for (name, value) in lengths {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(UnredactError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The fourteen fonts every PDF consumer provides without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFont {
    #[serde(rename = "Times-Roman")]
    TimesRoman,
    #[serde(rename = "Times-Bold")]
    TimesBold,
    #[serde(rename = "Times-Italic")]
    TimesItalic,
    #[serde(rename = "Times-BoldItalic")]
    TimesBoldItalic,
    #[serde(rename = "Helvetica")]
    Helvetica,
    #[serde(rename = "Helvetica-Bold")]
    HelveticaBold,
    #[serde(rename = "Helvetica-Oblique")]
    HelveticaOblique,
    #[serde(rename = "Helvetica-BoldOblique")]
    HelveticaBoldOblique,
    #[serde(rename = "Courier")]
    Courier,
    #[serde(rename = "Courier-Bold")]
    CourierBold,
    #[serde(rename = "Courier-Oblique")]
    CourierOblique,
    #[serde(rename = "Courier-BoldOblique")]
    CourierBoldOblique,
    #[serde(rename = "Symbol")]
    Symbol,
    #[serde(rename = "ZapfDingbats")]
    ZapfDingbats,
}

impl StandardFont {
    pub const ALL: [StandardFont; 14] = [
        Self::TimesRoman,
        Self::TimesBold,
        Self::TimesItalic,
        Self::TimesBoldItalic,
        Self::Helvetica,
        Self::HelveticaBold,
        Self::HelveticaOblique,
        Self::HelveticaBoldOblique,
        Self::Courier,
        Self::CourierBold,
        Self::CourierOblique,
        Self::CourierBoldOblique,
        Self::Symbol,
        Self::ZapfDingbats,
    ];

    /// PostScript name used in `/BaseFont`.
    pub fn postscript_name(&self) -> &'static str {
        match self {
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
            Self::Symbol => "Symbol",
            Self::ZapfDingbats => "ZapfDingbats",
        }
    }

    pub fn from_postscript_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|font| font.postscript_name() == name)
    }
}

/// Process-wide font substitution table, passed explicitly to the font
/// mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontMap {
    /// Base font name (subset tag stripped) → standard font.
    pub substitutions: BTreeMap<String, StandardFont>,
    /// Per-font code → character overrides, keyed by base font name.
    pub glyphs: BTreeMap<String, BTreeMap<u32, char>>,
    /// Used for names missing from `substitutions`.
    pub default_font: StandardFont,
    /// Drawn in place of glyphs that cannot be mapped.
    pub placeholder: char,
}

impl Default for FontMap {
    fn default() -> Self {
        use StandardFont::*;
        let table = [
            ("TimesNewRomanPSMT", TimesRoman),
            ("TimesNewRomanPS-ItalicMT", TimesItalic),
            ("TimesNewRomanPS-BoldItalicMT", TimesBoldItalic),
            ("TimesNewRomanPS-BoldMT", TimesBold),
            ("ArialMT", Helvetica),
            ("Arial-ItalicMT", HelveticaOblique),
            ("Arial-BoldMT", HelveticaBold),
            ("Arial-BoldItalicMT", HelveticaBoldOblique),
            ("CambriaMath", TimesRoman),
            ("Calibri", Helvetica),
            ("Corbel", Helvetica),
            ("CourierNew", Courier),
            ("CourierNewPSMT", Courier),
            ("Arial", Helvetica),
            ("Arial,Bold", HelveticaBold),
            ("Arial,BoldItalic", HelveticaBoldOblique),
            ("QuickTypeII", Helvetica),
            ("QuickTypeII,Italic", HelveticaOblique),
            ("QuickTypeII,Bold", HelveticaBold),
            ("QuickTypeIICondensed", Helvetica),
            ("QuickTypeIICondensed,Bold", HelveticaBold),
            ("QuickTypeIICourierA", Courier),
            ("QuickTypeIIPi", Helvetica),
            ("UniversLTStd-Light", Helvetica),
            ("Univers_LT_Std_45_LightBold", HelveticaBold),
            ("Univers_LT_Std_47_Cn_LtBold", HelveticaBold),
            ("Univers_LT_Std_47_Cn_Lt", Helvetica),
            ("Univers_LT_Std_57_Cn", Helvetica),
            ("Univers_LT_Std_55", Helvetica),
            ("Univers_LT_67_CondensedBoldBold", HelveticaBold),
            ("Verdana", Helvetica),
            ("Wingdings-Regular", ZapfDingbats),
            ("Wingdings2", ZapfDingbats),
        ];

        Self {
            substitutions: table
                .into_iter()
                .map(|(name, font)| (name.to_string(), font))
                .collect(),
            glyphs: BTreeMap::new(),
            default_font: TimesRoman,
            placeholder: '?',
        }
    }
}

impl FontMap {
    /// Standard font for `name`: the name itself when it already is one,
    /// then the substitution table.
    pub fn lookup(&self, name: &str) -> Option<StandardFont> {
        StandardFont::from_postscript_name(name).or_else(|| self.substitutions.get(name).copied())
    }

    pub fn glyph_override(&self, font_name: &str, code: u32) -> Option<char> {
        self.glyphs.get(font_name)?.get(&code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.dark_threshold, 0.10);
        assert_eq!(config.min_overlap_fraction, 0.5);
        assert!(!config.require_overlap);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"min_area": 40.0}"#).unwrap();
        assert_eq!(config.min_area, 40.0);
        assert_eq!(config.dark_threshold, 0.10);
        assert_eq!(config.fonts.lookup("ArialMT"), Some(StandardFont::Helvetica));
    }

    #[test]
    fn font_map_serialises_postscript_names() {
        let json = EngineConfig::default().to_json().unwrap();
        assert!(json.contains("\"Times-Roman\""));
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back, EngineConfig::default());
    }

    #[test]
    fn out_of_range_values_are_config_errors() {
        for json in [
            r#"{"dark_threshold": 1.5}"#,
            r#"{"min_overlap_fraction": -0.1}"#,
            r#"{"min_area": -4.0}"#,
        ] {
            match EngineConfig::from_json(json) {
                Err(UnredactError::Config(detail)) => assert!(detail.contains("must be")),
                other => panic!("expected a config error for {json}, got {other:?}"),
            }
        }
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn standard_names_map_to_themselves() {
        let map = FontMap::default();
        assert_eq!(map.lookup("Courier-Bold"), Some(StandardFont::CourierBold));
        assert_eq!(map.lookup("NoSuchFont"), None);
    }
}
