//! Font registry and face resolution.
//!
//! The registry is owned by the caller for the duration of one request and
//! caches parsed faces keyed by a stable hash of the face file path — no
//! ambient global state survives across requests.
//!
//! Style resolution matches by case-insensitive keyword ("bold", "italic",
//! "oblique") over the family's style map, skipping symbol/emoji entries.
//! The fallback chain is preferred style → "Regular" → any regular-ish
//! entry → first entry → built-in bitmap face, so resolution of a missing
//! style never fails. A style map entry that points at an unreadable or
//! unparsable file is a configuration error and is propagated.

pub mod raster;

use std::collections::HashMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use ab_glyph::FontArc;

use crate::error::RotuloError;

/// A resolved typeface: either a loaded TTF/OTF or the built-in bitmap face.
///
/// The built-in face (Spleen 12x24) terminates every fallback chain and also
/// serves as the monospace face for code spans.
#[derive(Clone)]
pub enum Face {
    Ttf(FontArc),
    Builtin,
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Face::Ttf(_) => f.write_str("Face::Ttf"),
            Face::Builtin => f.write_str("Face::Builtin"),
        }
    }
}

impl Face {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Face::Builtin)
    }
}

/// The four dialect faces plus the monospace face used for code.
#[derive(Debug, Clone)]
pub struct FaceSet {
    pub regular: Face,
    pub bold: Face,
    pub italic: Face,
    pub bold_italic: Face,
    pub mono: Face,
}

impl FaceSet {
    /// All faces fall back to the built-in bitmap font.
    pub fn builtin() -> Self {
        FaceSet {
            regular: Face::Builtin,
            bold: Face::Builtin,
            italic: Face::Builtin,
            bold_italic: Face::Builtin,
            mono: Face::Builtin,
        }
    }
}

/// Per-request font cache keyed by a hash of the face file path.
#[derive(Default)]
pub struct FontRegistry {
    faces: HashMap<u64, FontArc>,
}

fn path_key(path: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

/// True for style-map entries that should never satisfy a text face lookup.
fn is_symbol_face(name: &str) -> bool {
    name.contains("symbols") || name.contains("emoji")
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a face file, reusing the cached parse if the path was seen before.
    pub fn load(&mut self, path: &str) -> Result<FontArc, RotuloError> {
        let key = path_key(path);
        if let Some(font) = self.faces.get(&key) {
            return Ok(font.clone());
        }
        let bytes = std::fs::read(path)
            .map_err(|e| RotuloError::FontResolution(format!("{path}: {e}")))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| RotuloError::FontResolution(format!("{path}: {e}")))?;
        self.faces.insert(key, font.clone());
        Ok(font)
    }

    /// Resolve the full face set for a family style map.
    ///
    /// `style_map` maps style names (e.g. "Regular", "Bold Italic") to font
    /// file paths. Missing styles fall back silently; only a file that fails
    /// to load produces an error.
    pub fn resolve_faces(
        &mut self,
        style_map: &HashMap<String, String>,
        preferred_style: &str,
    ) -> Result<FaceSet, RotuloError> {
        // Sorted entries so fallback picks are deterministic regardless of
        // map iteration order.
        let mut entries: Vec<(&str, &str)> = style_map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort();

        let find_with_keywords = |keywords: &[&str]| -> Option<&str> {
            entries.iter().find_map(|(name, path)| {
                let lower = name.to_lowercase();
                if is_symbol_face(&lower) {
                    return None;
                }
                if keywords.iter().all(|word| lower.contains(word)) {
                    Some(*path)
                } else {
                    None
                }
            })
        };

        let regular_path = style_map
            .get(preferred_style)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .or_else(|| {
                style_map
                    .get("Regular")
                    .map(String::as_str)
                    .filter(|p| !p.is_empty())
            })
            .or_else(|| find_with_keywords(&["regular"]))
            .or_else(|| {
                entries
                    .iter()
                    .find(|(name, _)| !is_symbol_face(&name.to_lowercase()))
                    .map(|(_, path)| *path)
            });

        let Some(regular_path) = regular_path else {
            return Ok(FaceSet::builtin());
        };

        let bold_path = find_with_keywords(&["bold"]).unwrap_or(regular_path);
        let italic_path = find_with_keywords(&["italic"])
            .or_else(|| find_with_keywords(&["oblique"]))
            .unwrap_or(regular_path);
        let bold_italic_path = find_with_keywords(&["bold", "italic"])
            .or_else(|| find_with_keywords(&["bold", "oblique"]))
            .unwrap_or(bold_path);

        Ok(FaceSet {
            regular: Face::Ttf(self.load(regular_path)?),
            bold: Face::Ttf(self.load(bold_path)?),
            italic: Face::Ttf(self.load(italic_path)?),
            bold_italic: Face::Ttf(self.load(bold_italic_path)?),
            mono: Face::Builtin,
        })
    }
}
