use serde::Serialize;

/// Separator placed between retained paragraphs in `body_text`.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

impl ProxyQuery {
    /// First `url` pair wins; repeated keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            url: pairs
                .into_iter()
                .find_map(|(key, value)| (key == "url").then_some(value)),
        }
    }
}

/// Outcome of one extraction call. Serialized verbatim by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    pub title: String,
    #[serde(rename = "koreanText")]
    pub body_text: String,
    pub image_url: String,
    pub paragraph_count: usize,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExtractionResult {
    pub fn success(title: String, paragraphs: Vec<String>, image_url: String) -> Self {
        Self {
            success: true,
            title,
            paragraph_count: paragraphs.len(),
            body_text: paragraphs.join(PARAGRAPH_SEPARATOR),
            image_url,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            title: String::new(),
            body_text: String::new(),
            image_url: String::new(),
            paragraph_count: 0,
            error_message: Some(message.into()),
        }
    }
}

/// Body of every non-200 proxy response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// File written by the batch extractor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterData {
    pub korean_url: String,
    pub korean_text: String,
    pub image_url: String,
    pub paragraph_count: usize,
}

impl ChapterData {
    pub fn from_result(url: &str, result: &ExtractionResult) -> Self {
        Self {
            korean_url: url.to_string(),
            korean_text: result.body_text.clone(),
            image_url: result.image_url.clone(),
            paragraph_count: result.paragraph_count,
        }
    }
}
