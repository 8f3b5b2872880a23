//! Character encoding detection for fetched pages
//!
//! Target sites frequently serve legacy Cyrillic pages with missing or wrong
//! charset declarations, so the byte-to-text decision is made from the body
//! itself:
//!
//! 1. A byte-order mark wins.
//! 2. Valid non-ASCII UTF-8 is UTF-8.
//! 3. Otherwise `chardetng` guesses; the guess is accepted only if it decodes
//!    the bytes without errors.
//! 4. Anything else (empty input, pure ASCII, an unusable guess) falls back to
//!    the configured legacy encoding.
//!
//! Detection never fails; ambiguity is resolved by the fallback and is not
//! visible to callers.

use crate::config::HttpConfig;
use crate::ConfigError;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};

/// Encoding used when detection has no confident answer
pub const DEFAULT_FALLBACK: &Encoding = WINDOWS_1251;

/// How a run turns page bytes into text
#[derive(Debug, Clone, Copy)]
pub enum EncodingPolicy {
    /// Detect per page, falling back to a legacy encoding
    Detect { fallback: &'static Encoding },
    /// Always decode with one encoding
    Fixed(&'static Encoding),
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self::Detect {
            fallback: DEFAULT_FALLBACK,
        }
    }
}

impl EncodingPolicy {
    /// Builds the policy from the `[http]` section
    ///
    /// `encoding = "auto"` selects detection; any other value must be a WHATWG
    /// encoding label and pins that encoding.
    pub fn from_config(config: &HttpConfig) -> Result<Self, ConfigError> {
        let fallback = lookup(&config.fallback_encoding)?;

        if config.encoding.trim().eq_ignore_ascii_case("auto") {
            Ok(Self::Detect { fallback })
        } else {
            Ok(Self::Fixed(lookup(&config.encoding)?))
        }
    }

    /// Chooses the encoding for one page body
    pub fn resolve(&self, bytes: &[u8]) -> &'static Encoding {
        match self {
            Self::Detect { fallback } => detect_encoding(bytes, fallback),
            Self::Fixed(encoding) => encoding,
        }
    }

    /// Decodes a page body, returning the text and the encoding used
    pub fn decode(&self, bytes: &[u8]) -> (String, &'static Encoding) {
        let encoding = self.resolve(bytes);
        let (text, actual, _) = encoding.decode(bytes);
        (text.into_owned(), actual)
    }
}

/// Resolves an encoding label such as `windows-1251` or `cp1251`
fn lookup(label: &str) -> Result<&'static Encoding, ConfigError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))
}

/// Detects the encoding of raw page bytes
///
/// # Examples
///
/// ```
/// use text_harvest::encoding::{detect_encoding, DEFAULT_FALLBACK};
///
/// let encoding = detect_encoding("Привет".as_bytes(), DEFAULT_FALLBACK);
/// assert_eq!(encoding.name(), "UTF-8");
///
/// let encoding = detect_encoding(b"plain ascii", DEFAULT_FALLBACK);
/// assert_eq!(encoding.name(), "windows-1251");
/// ```
pub fn detect_encoding(bytes: &[u8], fallback: &'static Encoding) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if bytes.is_ascii() {
        return fallback;
    }

    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, false);

    let (_, _, had_errors) = guess.decode(bytes);
    if had_errors {
        tracing::debug!(
            "Detected encoding {} cannot decode page cleanly, using {}",
            guess.name(),
            fallback.name()
        );
        return fallback;
    }

    guess
}
