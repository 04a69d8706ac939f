//! Supported locale tags for translation and speech output.
//!
//! Both upstream services accept the same closed set of 11 Indian locale
//! tags (`en-IN`, `hi-IN`, …).  [`Language`] keeps that set closed on our
//! side: the UI selector, the prompt builders and the speech client all work
//! in terms of this enum, and the raw tag string only appears at the wire
//! boundary.  Unknown tags fall back to [`Language::English`] instead of
//! leaking arbitrary strings upstream.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// One of the 11 locale tags supported by the completion and speech services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    Hindi,
    Bengali,
    Kannada,
    Malayalam,
    Marathi,
    Odia,
    Punjabi,
    Tamil,
    Telugu,
    Gujarati,
}

/// All supported languages, in UI selector order (English first).
pub const ALL_LANGUAGES: [Language; 11] = [
    Language::English,
    Language::Hindi,
    Language::Bengali,
    Language::Kannada,
    Language::Malayalam,
    Language::Marathi,
    Language::Odia,
    Language::Punjabi,
    Language::Tamil,
    Language::Telugu,
    Language::Gujarati,
];

impl Language {
    /// The locale tag sent verbatim to both upstream services.
    ///
    /// ```
    /// use sahayak::lang::Language;
    ///
    /// assert_eq!(Language::Hindi.tag(), "hi-IN");
    /// assert_eq!(Language::English.tag(), "en-IN");
    /// ```
    pub fn tag(&self) -> &'static str {
        match self {
            Language::English => "en-IN",
            Language::Hindi => "hi-IN",
            Language::Bengali => "bn-IN",
            Language::Kannada => "kn-IN",
            Language::Malayalam => "ml-IN",
            Language::Marathi => "mr-IN",
            Language::Odia => "od-IN",
            Language::Punjabi => "pa-IN",
            Language::Tamil => "ta-IN",
            Language::Telugu => "te-IN",
            Language::Gujarati => "gu-IN",
        }
    }

    /// English display name, used in selectors and embedded in prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Bengali => "Bengali",
            Language::Kannada => "Kannada",
            Language::Malayalam => "Malayalam",
            Language::Marathi => "Marathi",
            Language::Odia => "Odia",
            Language::Punjabi => "Punjabi",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Gujarati => "Gujarati",
        }
    }

    /// Resolve a locale tag reported by an upstream (e.g. the detected
    /// language of a consultation recording).  Unrecognized tags resolve to
    /// [`Language::English`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "en-IN" => Language::English,
            "hi-IN" => Language::Hindi,
            "bn-IN" => Language::Bengali,
            "kn-IN" => Language::Kannada,
            "ml-IN" => Language::Malayalam,
            "mr-IN" => Language::Marathi,
            "od-IN" => Language::Odia,
            "pa-IN" => Language::Punjabi,
            "ta-IN" => Language::Tamil,
            "te-IN" => Language::Telugu,
            "gu-IN" => Language::Gujarati,
            _ => Language::English,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
