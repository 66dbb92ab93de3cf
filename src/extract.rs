use std::sync::Arc;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::encoding::{decode_html, DecodeContext};
use crate::fetch::{FetchError, PageFetcher};
use crate::models::ExtractionResult;
use crate::profile::{ContentSelector, ExtractionProfile, ImageStrategy, ProfileSelector};

// ── Constants ────────────────────────────────────────────────────────────────

/// Entity text that survives when a page double-escapes its spacing.
const NBSP_ENTITY: &str = "&nbsp;";

// ── Lazy static selectors ────────────────────────────────────────────────────

static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static P_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static IMG_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static DIV_CLASS_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div[class]").unwrap());
static DIV_ID_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div[id]").unwrap());

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

// ── Request ──────────────────────────────────────────────────────────────────

/// One decoded page and the URL it was fetched from.
pub struct ExtractionRequest<'a> {
    pub target_url: &'a Url,
    pub html: &'a str,
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Fetches a page and runs the extraction heuristic over it.
///
/// Shared by the proxy and the batch tool. Holds no per-request state.
#[derive(Clone)]
pub struct Extractor {
    fetcher: Arc<dyn PageFetcher>,
    profiles: ProfileSelector,
}

impl Extractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, profiles: ProfileSelector) -> Self {
        Self { fetcher, profiles }
    }

    /// Never fails: fetch and URL problems come back as `success: false`.
    pub async fn extract(&self, target: &str) -> ExtractionResult {
        match self.try_extract(target).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(target_url = %target, error = %e, "extraction failed");
                ExtractionResult::failure(e.to_string())
            }
        }
    }

    async fn try_extract(&self, target: &str) -> Result<ExtractionResult, ExtractionError> {
        let url = parse_target(target)?;
        let profile = self.profiles.profile_for(&url);
        let page = self.fetcher.fetch(&url).await?;

        let decoded = decode_html(
            &page.raw_bytes,
            &DecodeContext {
                hint: page.declared_encoding_hint.as_deref(),
                site_encoding: profile.legacy_encoding,
            },
        );

        let request = ExtractionRequest {
            target_url: &url,
            html: &decoded.text,
        };
        Ok(extract_from_html(&request, &profile))
    }
}

fn parse_target(target: &str) -> Result<Url, ExtractionError> {
    let url = Url::parse(target.trim())
        .map_err(|e| ExtractionError::InvalidUrl(format!("{target}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExtractionError::InvalidUrl(format!(
            "{target}: only http and https URLs are supported"
        )));
    }
    Ok(url)
}

// ── Main extraction pipeline ─────────────────────────────────────────────────

pub fn extract_from_html(
    request: &ExtractionRequest<'_>,
    profile: &ExtractionProfile,
) -> ExtractionResult {
    let document = Html::parse_document(request.html);

    let title = extract_title(&document);
    let region = locate_content(&document, &profile.locators);

    let scope = region.or_else(|| {
        profile
            .fallback_to_document
            .then(|| document.root_element())
    });
    let paragraphs = scope
        .map(|scope| filter_paragraphs(scope, profile))
        .unwrap_or_default();

    let image_url =
        resolve_image(&document, region, &profile.image, request.target_url).unwrap_or_default();

    tracing::debug!(
        profile = profile.name,
        region_found = region.is_some(),
        paragraphs = paragraphs.len(),
        has_image = !image_url.is_empty(),
        "extracted page"
    );

    ExtractionResult::success(title, paragraphs, image_url)
}

// ── Title ────────────────────────────────────────────────────────────────────

fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE_SEL)
        .next()
        .map(|el| short_title(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// `"Chapter 5 | My Site - Extra"` → `"Chapter 5"`
pub fn short_title(raw: &str) -> String {
    let head = raw.split_once('|').map_or(raw, |(left, _)| left);
    let head = head.split_once('-').map_or(head, |(left, _)| left);
    head.trim().to_string()
}

// ── Container selection ──────────────────────────────────────────────────────

impl ContentSelector {
    fn locate<'doc>(&self, document: &'doc Html) -> Option<ElementRef<'doc>> {
        match self {
            ContentSelector::Tag(tag) => {
                let sel = Selector::parse(tag).ok()?;
                document.select(&sel).next()
            }
            ContentSelector::ClassKeyword(keywords) => document.select(&DIV_CLASS_SEL).find(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| contains_any(class, keywords))
            }),
            ContentSelector::IdKeyword(keywords) => document.select(&DIV_ID_SEL).find(|el| {
                el.value()
                    .id()
                    .is_some_and(|id| contains_any(id, keywords))
            }),
            ContentSelector::Id(id) => document
                .select(&DIV_ID_SEL)
                .find(|el| el.value().id() == Some(*id)),
        }
    }
}

/// First selector with a match wins. `None` is not an error.
fn locate_content<'doc>(
    document: &'doc Html,
    locators: &[ContentSelector],
) -> Option<ElementRef<'doc>> {
    locators.iter().find_map(|locator| {
        let found = locator.locate(document);
        if found.is_some() {
            tracing::debug!(?locator, "content region located");
        }
        found
    })
}

// ── Paragraphs ───────────────────────────────────────────────────────────────

fn filter_paragraphs(scope: ElementRef<'_>, profile: &ExtractionProfile) -> Vec<String> {
    scope
        .select(&P_SEL)
        .filter(|p| {
            !profile.require_justified || p.value().attr("style").is_some_and(is_justified)
        })
        .map(|p| clean_paragraph(&p.text().collect::<String>()))
        .filter(|text| keep_paragraph(text, profile.min_paragraph_chars))
        .collect()
}

/// Trim every line and drop blank ones, so a paragraph never contains the
/// separator used to join paragraphs.
fn clean_paragraph(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Body text is longer than `min_chars` characters and is not a page-number
/// fragment.
pub fn keep_paragraph(text: &str, min_chars: usize) -> bool {
    text.chars().count() > min_chars && !is_numeric_noise(text)
}

/// True when nothing but digits remains after dropping whitespace and
/// `&nbsp;` leftovers. An empty remainder counts as noise too.
pub fn is_numeric_noise(text: &str) -> bool {
    let stripped: String = text
        .replace(NBSP_ENTITY, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    stripped.chars().all(char::is_numeric)
}

/// Matches `text-align: justify` regardless of spacing and case.
pub fn is_justified(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("text-align:justify")
}

fn contains_any(value: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| value.contains(n))
}

fn contains_any_ignore_case(value: &str, needles: &[&str]) -> bool {
    contains_any(&value.to_lowercase(), needles)
}

// ── Image ────────────────────────────────────────────────────────────────────

fn image_sources<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    scope
        .select(&IMG_SEL)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
}

fn resolve_image(
    document: &Html,
    region: Option<ElementRef<'_>>,
    strategy: &ImageStrategy,
    base_url: &Url,
) -> Option<String> {
    match strategy {
        ImageStrategy::Scoped { marker } => image_sources(region?)
            .filter(|src| src.contains(marker))
            .find_map(|src| absolutize(src, base_url)),
        ImageStrategy::Unscoped { exclude } => image_sources(document.root_element())
            .filter(|src| !contains_any_ignore_case(src, exclude))
            .find_map(|src| absolutize(src, base_url)),
        ImageStrategy::Keyword { include } => image_sources(document.root_element())
            .filter(|src| contains_any(src, include))
            .find_map(|src| absolutize(src, base_url)),
    }
}

/// Make an image source absolute against the page's scheme and host.
///
/// Absolute sources are returned untouched. Root-relative and bare relative
/// sources both hang off the host root. Sources that cannot carry a host
/// (`data:` and friends) yield `None`.
pub fn absolutize(src: &str, base_url: &Url) -> Option<String> {
    if let Ok(absolute) = Url::parse(src) {
        return absolute.has_host().then(|| src.to_string());
    }
    let path = if src.starts_with('/') {
        src.to_string()
    } else {
        format!("/{src}")
    };
    base_url
        .join(&path)
        .ok()
        .filter(Url::has_host)
        .map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{EDITOR_MARKER, EXCLUDED_IMAGE_WORDS, IMAGE_KEYWORDS};

    fn base() -> Url {
        Url::parse("http://example.com/page").unwrap()
    }

    fn run(html: &str, profile: &ExtractionProfile) -> ExtractionResult {
        let url = base();
        extract_from_html(&ExtractionRequest { target_url: &url, html }, profile)
    }

    #[test]
    fn title_strips_site_suffixes() {
        assert_eq!(short_title("Chapter 5 | My Site - Extra"), "Chapter 5");
        assert_eq!(short_title("  Only a title  "), "Only a title");
        assert_eq!(short_title("Left - Right | Site"), "Left");
        assert_eq!(short_title(""), "");
    }

    #[test]
    fn missing_title_is_empty() {
        let html = "<html><body><p>nothing here</p></body></html>";
        let result = run(html, &ExtractionProfile::generic());
        assert!(result.success);
        assert_eq!(result.title, "");
    }

    #[test]
    fn paragraph_filter_rejects_noise() {
        assert!(!keep_paragraph("12345", 3));
        assert!(!keep_paragraph("1 2 3 4 5 6 7 8 9 10 11 12", 10));
        assert!(!keep_paragraph("&nbsp; &nbsp; &nbsp; &nbsp;", 10));
        assert!(!keep_paragraph("\u{a0}\u{a0}\u{a0}", 0));
        assert!(!keep_paragraph("short", 10));
    }

    #[test]
    fn paragraph_filter_accepts_korean_sentence() {
        let sentence = "초파일을 맞아 조계사 마당에 연등이 많이 걸렸";
        assert_eq!(sentence.chars().count(), 25);
        assert!(keep_paragraph(sentence, 20));
        assert!(keep_paragraph(sentence, 10));
    }

    #[test]
    fn threshold_is_strict() {
        let ten = "abcdefghij";
        assert!(!keep_paragraph(ten, 10));
        assert!(keep_paragraph(&format!("{ten}k"), 10));
    }

    #[test]
    fn paragraph_lines_are_trimmed_and_blank_lines_dropped() {
        assert_eq!(
            clean_paragraph("  first line \n\n\n   second line  "),
            "first line\nsecond line"
        );
        assert_eq!(clean_paragraph("\u{a0}single\u{a0}"), "single");
    }

    #[test]
    fn justified_style_predicate() {
        assert!(is_justified("text-align: justify;"));
        assert!(is_justified("margin:0; TEXT-ALIGN:justify"));
        assert!(!is_justified("text-align: left"));
        assert!(!is_justified(""));
    }

    #[test]
    fn absolutize_root_relative() {
        assert_eq!(
            absolutize("/data/editor/img1.jpg", &base()).as_deref(),
            Some("http://example.com/data/editor/img1.jpg")
        );
    }

    #[test]
    fn absolutize_keeps_absolute() {
        assert_eq!(
            absolutize("http://cdn.example.com/x.jpg", &base()).as_deref(),
            Some("http://cdn.example.com/x.jpg")
        );
    }

    #[test]
    fn absolutize_bare_relative_hangs_off_host() {
        let nested = Url::parse("https://example.com:8443/m/news/view.php?number=1").unwrap();
        assert_eq!(
            absolutize("img/a.jpg", &nested).as_deref(),
            Some("https://example.com:8443/img/a.jpg")
        );
    }

    #[test]
    fn absolutize_rejects_hostless_sources() {
        assert!(absolutize("data:image/png;base64,AAAA", &base()).is_none());
    }

    #[test]
    fn locator_prefers_article_over_class_match() {
        let html = r#"<div class="content"><p>class region paragraph text</p></div>
            <article><p>article region paragraph text</p></article>"#;
        let result = run(html, &ExtractionProfile::generic());
        assert_eq!(result.body_text, "article region paragraph text");
    }

    #[test]
    fn locator_falls_back_to_id_keyword() {
        let html = r#"<div id="main-article"><p>identified by id keyword</p></div>
            <p>outside of any region entirely</p>"#;
        let result = run(html, &ExtractionProfile::generic());
        assert_eq!(result.body_text, "identified by id keyword");
    }

    #[test]
    fn keyword_locators_match_case() {
        let html = r#"<div class="ContentWrapper"><p>capitalised class is not a region</p></div>
            <div class="main-content"><p>lower case class keyword region</p></div>"#;
        let result = run(html, &ExtractionProfile::generic());
        assert_eq!(result.body_text, "lower case class keyword region");

        let html = r#"<div id="Article"><p>capitalised id is not a region</p></div>"#;
        assert_eq!(run(html, &ExtractionProfile::generic()).paragraph_count, 0);
    }

    #[test]
    fn no_region_yields_zero_paragraphs() {
        let html = "<html><body><p>a paragraph outside any region</p></body></html>";
        let result = run(html, &ExtractionProfile::generic());
        assert!(result.success);
        assert_eq!(result.paragraph_count, 0);
        assert_eq!(result.body_text, "");
    }

    #[test]
    fn document_fallback_scans_whole_page() {
        let mut profile = ExtractionProfile::generic();
        profile.fallback_to_document = true;
        let html = "<html><body><p>a paragraph outside any region</p></body></html>";
        assert_eq!(run(html, &profile).paragraph_count, 1);
    }

    #[test]
    fn site_profile_requires_justified_paragraphs() {
        let html = r#"<div id="content">
            <p style="text-align: justify;">초파일을 맞아 조계사 마당에 연등이 많이 걸렸</p>
            <p>초파일을 맞아 조계사 마당에 연등이 많이 걸렸</p>
            <p style="text-align: justify;">2024</p>
        </div>"#;
        let result = run(html, &ExtractionProfile::site());
        assert_eq!(result.paragraph_count, 1);
    }

    #[test]
    fn scoped_image_needs_region_and_marker() {
        let strategy = ImageStrategy::Scoped {
            marker: EDITOR_MARKER,
        };
        let html = r#"<img src="/data/editor/outside.jpg">
            <div id="content"><img src="/images/deco.gif"><img src="/data/editor/inside.jpg"></div>"#;
        let document = Html::parse_document(html);
        let region = locate_content(&document, &[ContentSelector::Id("content")]);
        assert_eq!(
            resolve_image(&document, region, &strategy, &base()).as_deref(),
            Some("http://example.com/data/editor/inside.jpg")
        );
        assert!(resolve_image(&document, None, &strategy, &base()).is_none());
    }

    #[test]
    fn unscoped_image_skips_excluded_words() {
        let strategy = ImageStrategy::Unscoped {
            exclude: EXCLUDED_IMAGE_WORDS,
        };
        let html = r#"<img src="/img/site-LOGO.png"><img src="/img/Icon.svg">
            <img src="/img/top_banner.jpg"><img src="/pics/chapter5.jpg">"#;
        let document = Html::parse_document(html);
        assert_eq!(
            resolve_image(&document, None, &strategy, &base()).as_deref(),
            Some("http://example.com/pics/chapter5.jpg")
        );
    }

    #[test]
    fn unscoped_image_excludes_logo() {
        let strategy = ImageStrategy::Unscoped {
            exclude: EXCLUDED_IMAGE_WORDS,
        };
        let document = Html::parse_document(r#"<img src="/img/logo.png">"#);
        assert!(resolve_image(&document, None, &strategy, &base()).is_none());
    }

    #[test]
    fn unscoped_image_excludes_upload_paths() {
        // "ad" is a plain substring, so upload directories are skipped too.
        let strategy = ImageStrategy::Unscoped {
            exclude: EXCLUDED_IMAGE_WORDS,
        };
        let html = r#"<img src="/wp-content/uploads/2024/05/a.jpg">
            <img src="/files/THREAD.png"><img src="/pics/chapter5.jpg">"#;
        let document = Html::parse_document(html);
        assert_eq!(
            resolve_image(&document, None, &strategy, &base()).as_deref(),
            Some("http://example.com/pics/chapter5.jpg")
        );
    }

    #[test]
    fn keyword_image_requires_keyword() {
        let strategy = ImageStrategy::Keyword {
            include: IMAGE_KEYWORDS,
        };
        let html = r#"<img src="/static/spacer.gif"><img src="/upload/2024/05/p1.jpg">"#;
        let document = Html::parse_document(html);
        assert_eq!(
            resolve_image(&document, None, &strategy, &base()).as_deref(),
            Some("http://example.com/upload/2024/05/p1.jpg")
        );
    }

    #[test]
    fn parse_target_rejects_non_http() {
        assert!(parse_target("ftp://example.com/file").is_err());
        assert!(parse_target("not a url").is_err());
        assert!(parse_target(" https://example.com/a ").is_ok());
    }
}
