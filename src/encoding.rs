//! Turning fetched bytes into text.
//!
//! Decoding walks an ordered chain of attempts and keeps the first one that
//! succeeds. The last link decodes any byte sequence, so [`decode_html`]
//! always returns text.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;

/// `<meta charset="...">`
static CHARSET_META_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>/;]+)"#).unwrap());

/// `<meta http-equiv="Content-Type" content="...; charset=...">`
static CONTENT_TYPE_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?content-type["']?[^>]+content\s*=\s*["']?[^"'>]*;\s*charset\s*=\s*([^"'\s>;]+)"#)
        .unwrap()
});

const SNIFF_LEN: usize = 1024;

// ── Decode context ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext<'a> {
    /// Charset label declared by the server or sniffed from the markup.
    pub hint: Option<&'a str>,
    /// Legacy encoding a known site is served in.
    pub site_encoding: Option<&'static Encoding>,
}

#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    /// True when invalid sequences were substituted.
    pub lossy: bool,
}

// ── Decode chain ─────────────────────────────────────────────────────────────

trait DecodeAttempt {
    fn name(&self) -> &'static str;
    fn attempt(&self, bytes: &[u8], ctx: &DecodeContext<'_>) -> Option<Decoded>;
}

/// Strict decode in the site's legacy encoding, or in a non-UTF-8 charset
/// named by the hint.
struct LegacyEncoding;

struct Utf8Strict;

struct Utf8Lossy;

/// windows-1252 maps every byte, so this never fails.
struct SingleByte;

impl DecodeAttempt for LegacyEncoding {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn attempt(&self, bytes: &[u8], ctx: &DecodeContext<'_>) -> Option<Decoded> {
        let encoding = ctx.site_encoding.or_else(|| ctx.hint.and_then(legacy_label))?;
        let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
        Some(Decoded {
            text: text.into_owned(),
            encoding,
            lossy: false,
        })
    }
}

impl DecodeAttempt for Utf8Strict {
    fn name(&self) -> &'static str {
        "utf-8"
    }

    fn attempt(&self, bytes: &[u8], _ctx: &DecodeContext<'_>) -> Option<Decoded> {
        let text = UTF_8.decode_without_bom_handling_and_without_replacement(bytes)?;
        Some(Decoded {
            text: text.into_owned(),
            encoding: UTF_8,
            lossy: false,
        })
    }
}

impl DecodeAttempt for Utf8Lossy {
    fn name(&self) -> &'static str {
        "utf-8-lossy"
    }

    fn attempt(&self, bytes: &[u8], _ctx: &DecodeContext<'_>) -> Option<Decoded> {
        let (text, had_errors) = UTF_8.decode_without_bom_handling(bytes);
        Some(Decoded {
            text: text.into_owned(),
            encoding: UTF_8,
            lossy: had_errors,
        })
    }
}

impl DecodeAttempt for SingleByte {
    fn name(&self) -> &'static str {
        "windows-1252"
    }

    fn attempt(&self, bytes: &[u8], _ctx: &DecodeContext<'_>) -> Option<Decoded> {
        Some(single_byte(bytes))
    }
}

const DECODE_CHAIN: &[&dyn DecodeAttempt] =
    &[&LegacyEncoding, &Utf8Strict, &Utf8Lossy, &SingleByte];

fn single_byte(bytes: &[u8]) -> Decoded {
    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    Decoded {
        text: text.into_owned(),
        encoding: WINDOWS_1252,
        lossy: had_errors,
    }
}

/// Resolve a charset label to an encoding worth trying before UTF-8.
///
/// UTF-8, UTF-16 and the replacement encoding all resolve to UTF-8 here and
/// are left to the UTF-8 links of the chain.
fn legacy_label(label: &str) -> Option<&'static Encoding> {
    let encoding = Encoding::for_label(label.trim().as_bytes())?;
    (encoding.output_encoding() != UTF_8).then_some(encoding)
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Decode page bytes. Total: every input yields text.
pub fn decode_html(bytes: &[u8], ctx: &DecodeContext<'_>) -> Decoded {
    for link in DECODE_CHAIN {
        if let Some(decoded) = link.attempt(bytes, ctx) {
            tracing::debug!(
                attempt = link.name(),
                encoding = decoded.encoding.name(),
                lossy = decoded.lossy,
                "decoded page"
            );
            return decoded;
        }
    }
    single_byte(bytes)
}

/// Look for a charset declaration in the first kilobyte of markup.
pub fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(SNIFF_LEN)]);
    [&*CHARSET_META_RE, &*CONTENT_TYPE_CHARSET_RE]
        .iter()
        .find_map(|re| re.captures(&head).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
}
