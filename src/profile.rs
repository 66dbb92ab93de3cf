//! Extraction profiles.
//!
//! A profile bundles every tunable of the extraction heuristic: where to look
//! for the article, how strict the paragraph filter is, and which image to
//! pick. The generic profile works on arbitrary news pages; the site profile
//! is a fast path for mediabuddha.net, which serves EUC-KR pages with the
//! article in `div#content`.

use clap::ValueEnum;
use encoding_rs::{Encoding, EUC_KR};
use url::Url;

/// Where the article body is expected to live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSelector {
    /// First element with this tag name.
    Tag(&'static str),
    /// First `div` whose class attribute contains one of the keywords.
    ClassKeyword(&'static [&'static str]),
    /// First `div` whose id attribute contains one of the keywords.
    IdKeyword(&'static [&'static str]),
    /// The `div` with exactly this id.
    Id(&'static str),
}

/// How the representative image is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStrategy {
    /// Within the content region only, sources containing the marker.
    Scoped { marker: &'static str },
    /// Whole document, skipping sources containing any excluded word.
    Unscoped { exclude: &'static [&'static str] },
    /// Whole document, only sources containing one of the keywords.
    Keyword { include: &'static [&'static str] },
}

pub const EDITOR_MARKER: &str = "/data/editor/";
pub const EXCLUDED_IMAGE_WORDS: &[&str] = &["logo", "icon", "banner", "ad"];
pub const IMAGE_KEYWORDS: &[&str] = &["upload", "photo", "image"];

const CLASS_KEYWORDS: &[&str] = &["content", "article", "view"];
const ID_KEYWORDS: &[&str] = &["content", "article"];

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionProfile {
    pub name: &'static str,
    /// Tried in order; the first match is the content region.
    pub locators: Vec<ContentSelector>,
    /// Paragraphs must be strictly longer than this many characters.
    pub min_paragraph_chars: usize,
    /// Keep only `p` elements styled `text-align: justify`.
    pub require_justified: bool,
    /// Scan the whole document for paragraphs when no region is found.
    pub fallback_to_document: bool,
    pub image: ImageStrategy,
    pub legacy_encoding: Option<&'static Encoding>,
}

impl ExtractionProfile {
    pub fn generic() -> Self {
        Self {
            name: "generic",
            locators: vec![
                ContentSelector::Tag("article"),
                ContentSelector::ClassKeyword(CLASS_KEYWORDS),
                ContentSelector::IdKeyword(ID_KEYWORDS),
            ],
            min_paragraph_chars: 10,
            require_justified: false,
            fallback_to_document: false,
            image: ImageStrategy::Unscoped {
                exclude: EXCLUDED_IMAGE_WORDS,
            },
            legacy_encoding: None,
        }
    }

    pub fn site() -> Self {
        Self {
            name: "site",
            locators: vec![ContentSelector::Id("content")],
            min_paragraph_chars: 20,
            require_justified: true,
            fallback_to_document: false,
            image: ImageStrategy::Scoped {
                marker: EDITOR_MARKER,
            },
            legacy_encoding: Some(EUC_KR),
        }
    }
}

// ── Known sites ──────────────────────────────────────────────────────────────

const SITE_HOSTS: &[&str] = &["mediabuddha.net"];

fn is_known_site(url: &Url) -> bool {
    let host = url.host_str().unwrap_or("").to_lowercase();
    SITE_HOSTS
        .iter()
        .any(|site| host == *site || host.ends_with(&format!(".{site}")))
}

// ── Selection ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProfileChoice {
    /// Site profile for known hosts, generic otherwise.
    #[default]
    Auto,
    Generic,
    Site,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageChoice {
    Scoped,
    Unscoped,
    Keyword,
}

impl ImageChoice {
    fn strategy(self) -> ImageStrategy {
        match self {
            ImageChoice::Scoped => ImageStrategy::Scoped {
                marker: EDITOR_MARKER,
            },
            ImageChoice::Unscoped => ImageStrategy::Unscoped {
                exclude: EXCLUDED_IMAGE_WORDS,
            },
            ImageChoice::Keyword => ImageStrategy::Keyword {
                include: IMAGE_KEYWORDS,
            },
        }
    }
}

/// Startup-time choice of profile plus per-field overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSelector {
    pub choice: ProfileChoice,
    pub min_paragraph_chars: Option<usize>,
    pub image: Option<ImageChoice>,
}

impl ProfileSelector {
    pub fn profile_for(&self, url: &Url) -> ExtractionProfile {
        let mut profile = match self.choice {
            ProfileChoice::Generic => ExtractionProfile::generic(),
            ProfileChoice::Site => ExtractionProfile::site(),
            ProfileChoice::Auto if is_known_site(url) => ExtractionProfile::site(),
            ProfileChoice::Auto => ExtractionProfile::generic(),
        };
        if let Some(min) = self.min_paragraph_chars {
            profile.min_paragraph_chars = min;
        }
        if let Some(image) = self.image {
            profile.image = image.strategy();
        }
        profile
    }
}
