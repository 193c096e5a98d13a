//! Reference word lists for gibberish detection
//!
//! A dictionary is either a hunspell `.dic`/`.aff` pair, checked with full
//! affix rules, or a flat word list. The flat English list compiled into the
//! binary is only used when no hunspell dictionary is installed; it
//! understands the common regular inflections.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BUILTIN_ENGLISH: &str = include_str!("words_en.txt");

const SYSTEM_DICTIONARY_DIRS: &[&str] = &[
    "/usr/share/hunspell",
    "/usr/share/myspell",
    "/usr/share/myspell/dicts",
    "/usr/local/share/hunspell",
];

/// Regular English suffixes and the endings they may replace.
const ENGLISH_SUFFIXES: &[(&str, &[&str])] = &[
    ("iness", &["y"]),
    ("ness", &[""]),
    ("ment", &[""]),
    ("iest", &["y"]),
    ("ies", &["y"]),
    ("ied", &["y"]),
    ("ier", &["y"]),
    ("ily", &["y"]),
    ("ing", &["", "e"]),
    ("est", &["", "e"]),
    ("ed", &["", "e"]),
    ("er", &["", "e"]),
    ("es", &[""]),
    ("ly", &[""]),
    ("s", &[""]),
];

/// Inflections peeled off before giving up, e.g. `developments` -> `develop`
const MAX_SUFFIX_DEPTH: usize = 2;

#[derive(Clone)]
enum Lookup {
    Words {
        words: HashSet<String>,
        english_inflections: bool,
    },
    Hunspell(Arc<spellbook::Dictionary>),
}

/// Case-insensitive spelling reference for one language
#[derive(Clone)]
pub struct Dictionary {
    language: String,
    lookup: Lookup,
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Dictionary");
        s.field("language", &self.language);
        match &self.lookup {
            Lookup::Words { words, .. } => s.field("words", &words.len()),
            Lookup::Hunspell(_) => s.field("backend", &"hunspell"),
        };
        s.finish()
    }
}

impl Dictionary {
    /// Build a dictionary from an iterator of words.
    pub fn from_words<I, S>(language: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let language = language.into();
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            lookup: Lookup::Words {
                words,
                english_inflections: is_english(&language),
            },
            language,
        }
    }

    /// The English word list compiled into the binary.
    pub fn builtin_english() -> Self {
        Self::from_words("en", BUILTIN_ENGLISH.lines().filter(|l| !l.starts_with('#')))
    }

    /// Parse a plain word list or a hunspell `.dic` file without its affix rules.
    ///
    /// Hunspell files start with an entry count and carry affix flags after a
    /// `/`; both are stripped.
    pub fn parse(language: impl Into<String>, content: &str) -> Self {
        let mut lines = content.lines().peekable();
        if let Some(first) = lines.peek() {
            if first.trim().chars().all(|c| c.is_ascii_digit()) {
                lines.next();
            }
        }
        let words = lines.filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let word = line.split('/').next().unwrap_or(line);
            let word = word.split_whitespace().next().unwrap_or(word);
            Some(word.to_string())
        });
        Self::from_words(language, words)
    }

    /// Build a hunspell dictionary from `.aff` and `.dic` contents.
    pub fn hunspell(language: impl Into<String>, aff: &str, dic: &str) -> Result<Self> {
        let dictionary = spellbook::Dictionary::new(aff, dic).map_err(|e| Error::Config {
            reason: format!("invalid hunspell dictionary: {}", e),
        })?;
        Ok(Self {
            language: language.into(),
            lookup: Lookup::Hunspell(Arc::new(dictionary)),
        })
    }

    /// Load a dictionary file from disk. A `.dic` file with an `.aff`
    /// next to it is loaded with its affix rules.
    pub fn from_path(language: impl Into<String>, path: &Path) -> Result<Self> {
        let content = read_lossy(path)?;
        let aff_path = path.with_extension("aff");
        let is_dic = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("dic"));
        if is_dic && aff_path.is_file() {
            let aff = read_lossy(&aff_path)?;
            return Self::hunspell(language, &aff, &content);
        }
        Ok(Self::parse(language, &content))
    }

    /// Resolve the dictionary for a language: explicit path first, then
    /// system hunspell/myspell files, then the built-in list for English.
    pub fn resolve(language: &str, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "loading dictionary file");
            return Self::from_path(language, path);
        }

        for candidate in system_candidates(language) {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "using system dictionary");
                return Self::from_path(language, &candidate);
            }
        }

        if is_english(language) {
            tracing::debug!(language, "no system dictionary, using built-in English word list");
            return Ok(Self::builtin_english());
        }

        Err(Error::Config {
            reason: format!("no dictionary available for language {}", language),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Number of entries of a word-list dictionary; `None` for hunspell.
    pub fn word_count(&self) -> Option<usize> {
        match &self.lookup {
            Lookup::Words { words, .. } => Some(words.len()),
            Lookup::Hunspell(_) => None,
        }
    }

    pub fn is_hunspell(&self) -> bool {
        matches!(self.lookup, Lookup::Hunspell(_))
    }

    /// Case-insensitive lookup.
    pub fn contains(&self, word: &str) -> bool {
        match &self.lookup {
            Lookup::Hunspell(dictionary) => {
                dictionary.check(word) || dictionary.check(&word.to_lowercase())
            }
            Lookup::Words {
                words,
                english_inflections,
            } => {
                let lower = word.to_lowercase();
                words.contains(&lower)
                    || (*english_inflections && contains_inflected(words, &lower, MAX_SUFFIX_DEPTH))
            }
        }
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    // Older hunspell dictionaries are Latin-1; a lossy read keeps ASCII words usable
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Try the stems of `word` under the regular English suffix rules.
fn contains_inflected(words: &HashSet<String>, word: &str, depth: usize) -> bool {
    if depth == 0 {
        return false;
    }
    for (suffix, endings) in ENGLISH_SUFFIXES {
        let Some(base) = word.strip_suffix(suffix) else {
            continue;
        };
        if base.chars().count() < 2 {
            continue;
        }
        for ending in *endings {
            let stem = format!("{}{}", base, ending);
            if words.contains(&stem) || contains_inflected(words, &stem, depth - 1) {
                return true;
            }
        }
        // stopped -> stop, running -> run
        if let Some(single) = undouble(base) {
            if words.contains(single) {
                return true;
            }
        }
    }
    false
}

fn undouble(base: &str) -> Option<&str> {
    let mut chars = base.chars().rev();
    let last = chars.next()?;
    let before = chars.next()?;
    if last == before && !"aeiou".contains(last) && last.is_alphabetic() {
        Some(&base[..base.len() - last.len_utf8()])
    } else {
        None
    }
}

fn is_english(language: &str) -> bool {
    let lower = language.to_ascii_lowercase();
    lower == "en" || lower.starts_with("en_") || lower.starts_with("en-") || lower == "eng"
}

fn system_candidates(language: &str) -> Vec<PathBuf> {
    let mut names = vec![language.to_string()];
    let underscored = language.replace('-', "_");
    if underscored != language {
        names.push(underscored);
    }
    if language.eq_ignore_ascii_case("en") || language.eq_ignore_ascii_case("eng") {
        names.push("en_US".to_string());
        names.push("en_GB".to_string());
    }
    SYSTEM_DICTIONARY_DIRS
        .iter()
        .flat_map(|dir| {
            names
                .iter()
                .map(move |name| Path::new(dir).join(format!("{}.dic", name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const AFFIXES: &str = "SET UTF-8\n\nSFX S Y 1\nSFX S 0 s .\n\nSFX D Y 2\nSFX D 0 d e\nSFX D 0 ed [^e]\n";
    const STEMS: &str = "3\napprove/DS\ncommittee/S\nwalk/DS\n";

    #[test]
    fn test_builtin_english_lookup() {
        let dict = Dictionary::builtin_english();
        assert!(dict.word_count().unwrap() > 1000);
        assert!(!dict.is_hunspell());
        assert!(dict.contains("the"));
        assert!(dict.contains("The"));
        assert!(dict.contains("WATER"));
        assert!(!dict.contains("xqzv"));
    }

    #[rstest]
    #[case("approved")]
    #[case("amendments")]
    #[case("concerning")]
    #[case("zoning")]
    #[case("ordinances")]
    #[case("cities")]
    #[case("stopped")]
    #[case("running")]
    #[case("developments")]
    #[case("happily")]
    fn test_builtin_english_inflections(#[case] word: &str) {
        assert!(Dictionary::builtin_english().contains(word), "{} not recognized", word);
    }

    #[rstest]
    #[case("qwrtx")]
    #[case("ing")]
    #[case("zzzed")]
    fn test_builtin_english_rejects_noise(#[case] word: &str) {
        assert!(!Dictionary::builtin_english().contains(word));
    }

    #[test]
    fn test_inflections_are_english_only() {
        let dict = Dictionary::from_words("ro_RO", ["casă", "walk"]);
        assert!(dict.contains("casă"));
        assert!(!dict.contains("walked"));
    }

    #[test]
    fn test_parse_hunspell_format() {
        let dict = Dictionary::parse("ro_RO", "4\ncasă/S\nmasă/SP\n\nșcoală\n# comment\n");
        assert_eq!(dict.word_count(), Some(3));
        assert!(dict.contains("Casă"));
        assert!(dict.contains("masă"));
        assert!(dict.contains("ȘCOALĂ"));
        assert_eq!(dict.language(), "ro_RO");
    }

    #[test]
    fn test_hunspell_applies_affix_rules() {
        let dict = Dictionary::hunspell("en_US", AFFIXES, STEMS).unwrap();
        assert!(dict.is_hunspell());
        assert!(dict.contains("approved"));
        assert!(dict.contains("committees"));
        assert!(dict.contains("walked"));
        assert!(dict.contains("Approved"));
        assert!(!dict.contains("approveded"));
    }

    #[test]
    fn test_dic_with_aff_loads_as_hunspell() {
        let dir = tempfile::tempdir().unwrap();
        let dic = dir.path().join("en_TEST.dic");
        std::fs::write(&dic, STEMS).unwrap();
        std::fs::write(dir.path().join("en_TEST.aff"), AFFIXES).unwrap();

        let dict = Dictionary::resolve("en_US", Some(&dic)).unwrap();
        assert!(dict.is_hunspell());
        assert!(dict.contains("walks"));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "alpha\nbeta\n").unwrap();

        let dict = Dictionary::resolve("xx", Some(&path)).unwrap();
        assert!(dict.contains("alpha"));
        assert!(!dict.contains("the"));
    }

    #[test]
    fn test_resolve_english_always_succeeds() {
        for lang in ["en", "en_US", "en-GB", "EN_us"] {
            let dict = Dictionary::resolve(lang, None).unwrap();
            assert!(dict.contains("house"), "{} should resolve", lang);
            assert!(dict.contains("committees"), "{} should resolve", lang);
        }
    }

    #[test]
    fn test_resolve_unknown_language_without_file() {
        let result = Dictionary::resolve("zz_NOWHERE", None);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_english_candidates_include_regional_files() {
        let names: Vec<String> = system_candidates("en")
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert!(names.contains(&"en_US.dic".to_string()));
    }
}
