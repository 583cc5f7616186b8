//! Options controlling a box-erasing run and its previews.

use serde::{Deserialize, Serialize};

use crate::error::{EraseError, Result};

/// All options controlling the erase pipeline.
/// Loaded from TOML config files, then overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EraseOptions {
    // -- General --
    pub verbose: u8,

    // -- Page selection --
    pub start_page: Option<i64>,
    pub end_page: Option<i64>,

    // -- Traversal --
    /// XObject resource names treated as Form-like (subtype is still checked).
    pub form_prefixes: Vec<String>,
    /// XObject resource names treated as images; these are never opened.
    pub image_prefixes: Vec<String>,
    /// Subtype-check XObjects whose names match neither convention.
    pub inspect_unprefixed_xobjects: bool,
    /// Recurse into ExtGState soft masks.
    pub follow_soft_masks: bool,

    // -- Output --
    /// Flate-compress streams before saving.
    pub compress_output: bool,

    // -- Preview --
    pub preview_dpi: u16,
    pub preview_format: PreviewFormat,
    /// JPEG quality (1-100). Only used for `jpeg` previews.
    pub jpeg_quality: u8,
}

impl Default for EraseOptions {
    fn default() -> Self {
        Self {
            verbose: 0,
            start_page: None,
            end_page: None,
            form_prefixes: vec!["Fm".to_string(), "FXX".to_string()],
            image_prefixes: vec!["Im".to_string()],
            inspect_unprefixed_xobjects: false,
            follow_soft_masks: true,
            compress_output: false,
            preview_dpi: 100,
            preview_format: PreviewFormat::Png,
            jpeg_quality: 85,
        }
    }
}

impl EraseOptions {
    /// Parse options from a TOML document. Missing fields keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| EraseError::Config(e.to_string()))
    }

    /// Serialize the effective options as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EraseError::Config(e.to_string()))
    }

    /// How an XObject resource name is classified by naming convention.
    pub fn classify_xobject_name(&self, name: &str) -> XObjectClass {
        if self.form_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            XObjectClass::FormLike
        } else if self.image_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            XObjectClass::ImageLike
        } else {
            XObjectClass::Other
        }
    }
}

/// Naming-convention class of an XObject resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XObjectClass {
    /// `/Fm*`, `/FXX*` by default. Recursed into after a subtype check.
    FormLike,
    /// `/Im*` by default. Never opened.
    ImageLike,
    /// Neither convention.
    Other,
}

/// Image format produced by the preview renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreviewFormat {
    #[default]
    Png,
    Jpeg,
}

impl PreviewFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PreviewFormat::Png => "png",
            PreviewFormat::Jpeg => "jpg",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(PreviewFormat::Png),
            "jpg" | "jpeg" => Some(PreviewFormat::Jpeg),
            _ => None,
        }
    }
}
