//! Text quality scoring
//!
//! Two independent measures decide whether a candidate text is usable:
//! the share of alphabetic characters and the share of tokens that are
//! dictionary words. Both feed the acceptability predicates used by the
//! fallback arbiter.

mod dictionary;

pub use dictionary::Dictionary;

use crate::config::QualityConfig;
use crate::error::Result;
use crate::normalize::normalize;
use crate::ocr::OcrResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Runs of two or more letters or underscores; digits and punctuation break a token.
static WORD_TOKENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[^\d\W]{2,}\b").unwrap());

/// Fraction of alphabetic characters; 0.0 for the empty string.
pub fn letter_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut letters = 0usize;
    for c in text.chars() {
        total += 1;
        if c.is_alphabetic() {
            letters += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    letters as f64 / total as f64
}

/// Word tokens considered by the gibberish check.
pub fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
    WORD_TOKENS.find_iter(text).map(|m| m.as_str())
}

/// Fraction of word tokens found in `dictionary`, `None` when there are no tokens.
pub fn dictionary_word_fraction(text: &str, dictionary: &Dictionary) -> Option<f64> {
    let mut total = 0usize;
    let mut known = 0usize;
    for word in word_tokens(text) {
        total += 1;
        if dictionary.contains(word) {
            known += 1;
        }
    }
    if total == 0 {
        None
    } else {
        Some(known as f64 / total as f64)
    }
}

/// Text with no word tokens, or with too few dictionary words, is gibberish.
pub fn is_gibberish(text: &str, dictionary: &Dictionary, threshold: f64) -> bool {
    match dictionary_word_fraction(text, dictionary) {
        None => true,
        Some(fraction) => fraction < threshold,
    }
}

/// Applies the configured thresholds to native and OCR candidates
#[derive(Debug, Clone)]
pub struct QualityEvaluator {
    dictionary: Arc<Dictionary>,
    min_text_len: usize,
    min_letter_ratio: f64,
    gibberish_threshold: f64,
    min_confidence: f32,
}

impl QualityEvaluator {
    /// Build an evaluator, resolving the dictionary from the configuration.
    pub fn from_config(config: &QualityConfig) -> Result<Self> {
        let dictionary = Dictionary::resolve(&config.language, config.dictionary_path.as_deref())?;
        Ok(Self::with_dictionary(config, Arc::new(dictionary)))
    }

    /// Build an evaluator around an already loaded dictionary.
    pub fn with_dictionary(config: &QualityConfig, dictionary: Arc<Dictionary>) -> Self {
        Self {
            dictionary,
            min_text_len: config.min_text_len,
            min_letter_ratio: config.min_letter_ratio,
            gibberish_threshold: config.gibberish_threshold,
            min_confidence: config.min_confidence,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn is_gibberish(&self, text: &str) -> bool {
        is_gibberish(text, &self.dictionary, self.gibberish_threshold)
    }

    fn long_enough(&self, text: &str) -> bool {
        !text.is_empty() && text.chars().count() >= self.min_text_len
    }

    /// Acceptability of an embedded text layer. The text is judged after
    /// normalization, the same form that ends up in the page record.
    pub fn accepts_native(&self, raw: &str) -> bool {
        let text = normalize(raw);
        self.long_enough(&text)
            && letter_ratio(&text) >= self.min_letter_ratio
            && !self.is_gibberish(&text)
    }

    /// Acceptability of an OCR result. Engines that report no confidence are
    /// judged on length and vocabulary only.
    pub fn accepts_ocr(&self, result: &OcrResult) -> bool {
        let confident = result
            .confidence
            .map_or(true, |confidence| confidence >= self.min_confidence);
        let text = normalize(&result.text);
        confident && self.long_enough(&text) && !self.is_gibberish(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn evaluator() -> QualityEvaluator {
        QualityEvaluator::from_config(&QualityConfig::default()).unwrap()
    }

    #[rstest]
    #[case("", 0.0)]
    #[case("abc123", 0.5)]
    #[case("abcd", 1.0)]
    #[case("1234", 0.0)]
    #[case("ăîșț", 1.0)]
    fn test_letter_ratio(#[case] text: &str, #[case] expected: f64) {
        assert!((letter_ratio(text) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_is_gibberish() {
        let eval = evaluator();
        assert!(eval.is_gibberish(""));
        assert!(eval.is_gibberish("12 34 !! ?? 5"));
        // single letters are not word tokens
        assert!(eval.is_gibberish("a b c d"));
    }

    #[test]
    fn test_dictionary_words_are_not_gibberish() {
        let eval = evaluator();
        assert!(!eval.is_gibberish("This is a simple sentence with common words"));
        assert!(eval.is_gibberish("xqzv brrtk plmnq wvvx zzkt"));
    }

    #[test]
    fn test_word_tokens_skip_digits_and_punctuation() {
        let tokens: Vec<&str> = word_tokens("hello, world 42 abc123 ok!").collect();
        assert_eq!(tokens, vec!["hello", "world", "ok"]);
    }

    #[test]
    fn test_word_tokens_keep_underscores_and_split_apostrophes() {
        let tokens: Vec<&str> = word_tokens("foo_bar city's x_1").collect();
        assert_eq!(tokens, vec!["foo_bar", "city"]);
    }

    #[test]
    fn test_accepts_native() {
        let eval = evaluator();
        assert!(eval.accepts_native("The quick report about the water supply for the city."));
        // too short
        assert!(!eval.accepts_native("The report"));
        // low letter ratio
        assert!(!eval.accepts_native("12.50 + 13.75 = 26.25 ; 44.1 / 2 = 22.05 the"));
        // gibberish
        assert!(!eval.accepts_native("qwrtp zxcvb lkjhg mnbvc poiuy trewq"));
        assert!(!eval.accepts_native(""));
    }

    #[rstest]
    #[case("Yesterday the committee approved several amendments concerning municipal zoning ordinances and bicycle lanes.")]
    #[case("Photosynthesis converts sunlight into chemical energy that plants store in their leaves and roots.")]
    #[case("The university announced that students will receive their examination results next week.")]
    #[case("Residents complained about delayed buses, flooded streets and rising prices during the winter months.")]
    fn test_accepts_ordinary_prose(#[case] text: &str) {
        let eval = evaluator();
        let fraction = dictionary_word_fraction(text, eval.dictionary()).unwrap();
        assert!(fraction >= 0.8, "only {:.2} of words recognized in {:?}", fraction, text);
        assert!(eval.accepts_native(text));
    }

    #[test]
    fn test_accepts_ocr_confidence_gate() {
        let eval = evaluator();
        let text = "This is a page of text from the scanner about the house".to_string();

        let confident = OcrResult {
            text: text.clone(),
            confidence: Some(80.0),
        };
        assert!(eval.accepts_ocr(&confident));

        let unsure = OcrResult {
            text: text.clone(),
            confidence: Some(40.0),
        };
        assert!(!eval.accepts_ocr(&unsure));

        let unscored = OcrResult {
            text,
            confidence: None,
        };
        assert!(eval.accepts_ocr(&unscored));

        let short = OcrResult {
            text: "the house".to_string(),
            confidence: Some(95.0),
        };
        assert!(!eval.accepts_ocr(&short));
    }
}
