//! Text analysis for `text` fields.
//!
//! Built-in analyzers, addressable by id from any schema:
//! - `standard`: `SimpleTokenizer`, `LowerCaser`, `RemoveLongFilter`
//! - `keyword`: the whole value as a single token
//! - `whitespace`: splits on whitespace, case preserved
//! - any stemmer language name (e.g. `english`): the standard chain plus the
//!   language's stop words and a `Stemmer`
//!
//! Schemas may define further analyzers by id; custom definitions shadow the
//! built-in ids.

use std::{collections::BTreeMap, fmt};

use celldex_config::RawAnalyzer;
use stop_words::LANGUAGE;
use tantivy::tokenizer::{
    Language, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer, Stemmer,
    StopWordFilter, TextAnalyzer, Token, TokenStream, TokenizerManager, WhitespaceTokenizer,
};
use tracing::debug;

use crate::IndexError;

/// Id of the analyzer used when a schema names none.
pub const STANDARD_ANALYZER: &str = "standard";

/// Id of the single-token analyzer.
pub const KEYWORD_ANALYZER: &str = "keyword";

/// Id of the whitespace analyzer.
pub const WHITESPACE_ANALYZER: &str = "whitespace";

/// Tantivy tokenizer used for untokenized string fields.
pub(crate) const RAW_TOKENIZER: &str = "raw";

/// Maximum token length in bytes before filtering.
const MAX_TOKEN_LENGTH: usize = 40;

/// Parses a stemmer language string into a Tantivy `Language`.
///
/// Supports lowercase language names matching Tantivy's `Language` enum.
pub fn parse_language(name: &str) -> Result<Language, IndexError> {
    match name.to_lowercase().as_str() {
        "arabic" => Ok(Language::Arabic),
        "danish" => Ok(Language::Danish),
        "dutch" => Ok(Language::Dutch),
        "english" => Ok(Language::English),
        "finnish" => Ok(Language::Finnish),
        "french" => Ok(Language::French),
        "german" => Ok(Language::German),
        "greek" => Ok(Language::Greek),
        "hungarian" => Ok(Language::Hungarian),
        "italian" => Ok(Language::Italian),
        "norwegian" => Ok(Language::Norwegian),
        "portuguese" => Ok(Language::Portuguese),
        "romanian" => Ok(Language::Romanian),
        "russian" => Ok(Language::Russian),
        "spanish" => Ok(Language::Spanish),
        "swedish" => Ok(Language::Swedish),
        "tamil" => Ok(Language::Tamil),
        "turkish" => Ok(Language::Turkish),
        other => Err(IndexError::InvalidLanguage(other.to_string())),
    }
}

/// Default stop words for a stemmer language.
///
/// Languages without a bundled list get none.
pub fn default_stop_words(language: Language) -> Vec<String> {
    let list = match language {
        Language::English => LANGUAGE::English,
        Language::French => LANGUAGE::French,
        Language::German => LANGUAGE::German,
        Language::Italian => LANGUAGE::Italian,
        Language::Portuguese => LANGUAGE::Portuguese,
        Language::Russian => LANGUAGE::Russian,
        Language::Spanish => LANGUAGE::Spanish,
        Language::Dutch => LANGUAGE::Dutch,
        Language::Swedish => LANGUAGE::Swedish,
        _ => return Vec::new(),
    };
    stop_words::get(list)
        .iter()
        .map(|word| word.to_lowercase())
        .collect()
}

/// Builds the standard analyzer, removing the given stop words.
pub fn standard_analyzer(stop_words: Vec<String>) -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .filter(StopWordFilter::remove(stop_words))
        .build()
}

/// Builds a stemming analyzer for `language`.
pub fn snowball_analyzer(language: Language, stop_words: Vec<String>) -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .filter(StopWordFilter::remove(stop_words))
        .filter(Stemmer::new(language))
        .build()
}

/// Builds the single-token analyzer.
pub fn keyword_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(RawTokenizer::default()).build()
}

/// Builds the whitespace analyzer.
pub fn whitespace_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(WhitespaceTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .build()
}

/// Builds an analyzer from its configuration.
pub fn build_analyzer(raw: &RawAnalyzer) -> Result<TextAnalyzer, IndexError> {
    Ok(match raw {
        RawAnalyzer::Standard { stop_words } => standard_analyzer(stop_words.clone()),
        RawAnalyzer::Snowball {
            language,
            stop_words,
        } => {
            let language = parse_language(language)?;
            let stop_words = stop_words
                .clone()
                .unwrap_or_else(|| default_stop_words(language));
            snowball_analyzer(language, stop_words)
        }
        RawAnalyzer::Whitespace => whitespace_analyzer(),
        RawAnalyzer::Keyword => keyword_analyzer(),
    })
}

/// Builds one of the built-in analyzers by id.
fn builtin_analyzer(id: &str) -> Option<TextAnalyzer> {
    match id {
        STANDARD_ANALYZER => Some(standard_analyzer(Vec::new())),
        KEYWORD_ANALYZER => Some(keyword_analyzer()),
        WHITESPACE_ANALYZER => Some(whitespace_analyzer()),
        other => parse_language(other)
            .ok()
            .map(|language| snowball_analyzer(language, default_stop_words(language))),
    }
}

/// Runs `text` through `analyzer` and collects the token texts.
pub fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next() {
        tokens.push(token.text.clone());
    }
    tokens
}

/// The analyzers available to one schema: built-ins plus custom definitions.
#[derive(Clone, Default)]
pub struct Analyzers {
    /// Custom analyzers by id.
    custom: BTreeMap<String, TextAnalyzer>,
}

impl fmt::Debug for Analyzers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzers")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Analyzers {
    /// Builds the custom analyzers of a schema configuration.
    pub fn from_config(raw: &BTreeMap<String, RawAnalyzer>) -> Result<Self, IndexError> {
        let mut custom = BTreeMap::new();
        for (id, definition) in raw {
            if id == RAW_TOKENIZER {
                return Err(IndexError::Configuration(format!(
                    "analyzer id '{RAW_TOKENIZER}' is reserved"
                )));
            }
            debug!(analyzer = %id, "building custom analyzer");
            custom.insert(id.clone(), build_analyzer(definition)?);
        }
        Ok(Self { custom })
    }

    /// Returns true if `id` names a custom or built-in analyzer.
    pub fn contains(&self, id: &str) -> bool {
        self.custom.contains_key(id) || builtin_analyzer(id).is_some()
    }

    /// Returns a fresh copy of the analyzer named `id`.
    pub fn get(&self, id: &str) -> Result<TextAnalyzer, IndexError> {
        if let Some(analyzer) = self.custom.get(id) {
            return Ok(analyzer.clone());
        }
        builtin_analyzer(id)
            .ok_or_else(|| IndexError::Configuration(format!("unknown analyzer '{id}'")))
    }

    /// Analyzes `text` with the analyzer named `id`.
    pub fn tokenize(&self, id: &str, text: &str) -> Result<Vec<String>, IndexError> {
        let mut analyzer = self.get(id)?;
        Ok(tokenize(&mut analyzer, text))
    }

    /// Analyzes `text` with the analyzer named `id`, keeping token positions
    /// and offsets.
    pub fn tokens(&self, id: &str, text: &str) -> Result<Vec<Token>, IndexError> {
        let mut analyzer = self.get(id)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(token.clone());
        }
        Ok(tokens)
    }

    /// Registers the named analyzers with a tokenizer manager.
    pub fn register<'a>(
        &self,
        manager: &TokenizerManager,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), IndexError> {
        for id in ids {
            manager.register(id, self.get(id)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(parse_language("English").unwrap(), Language::English);
        assert_eq!(parse_language("FRENCH").unwrap(), Language::French);
        assert_eq!(parse_language("tamil").unwrap(), Language::Tamil);
    }

    #[test]
    fn parse_invalid_language() {
        let err = parse_language("klingon").unwrap_err();
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn standard_lowercases_and_splits() {
        let mut analyzer = standard_analyzer(Vec::new());
        assert_eq!(tokenize(&mut analyzer, "Hello, World! foo-bar"), vec![
            "hello", "world", "foo", "bar"
        ]);
    }

    #[test]
    fn tokens_keep_stop_word_gaps() {
        let mut raw = BTreeMap::new();
        raw.insert("en".to_string(), RawAnalyzer::Standard {
            stop_words: vec!["the".into()],
        });
        let analyzers = Analyzers::from_config(&raw).unwrap();
        let tokens = analyzers.tokens("en", "find the fox").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[test]
    fn standard_removes_stop_words() {
        let mut analyzer = standard_analyzer(vec!["the".into()]);
        assert_eq!(tokenize(&mut analyzer, "The cat"), vec!["cat"]);
    }

    #[test]
    fn snowball_stems() {
        let mut analyzer = snowball_analyzer(Language::English, Vec::new());
        assert_eq!(tokenize(&mut analyzer, "handling running"), vec![
            "handl", "run"
        ]);
    }

    #[test]
    fn long_tokens_are_dropped() {
        let mut analyzer = standard_analyzer(Vec::new());
        let text = format!("short {} word", "a".repeat(50));
        assert_eq!(tokenize(&mut analyzer, &text), vec!["short", "word"]);
    }

    #[test]
    fn keyword_keeps_whole_value() {
        let mut analyzer = keyword_analyzer();
        assert_eq!(tokenize(&mut analyzer, "New York"), vec!["New York"]);
    }

    #[test]
    fn whitespace_preserves_case() {
        let mut analyzer = whitespace_analyzer();
        assert_eq!(tokenize(&mut analyzer, "New  York"), vec!["New", "York"]);
    }

    #[test]
    fn language_ids_are_builtin() {
        let analyzers = Analyzers::default();
        assert!(analyzers.contains("english"));
        assert!(analyzers.contains(STANDARD_ANALYZER));
        assert!(!analyzers.contains("klingon"));
        assert_eq!(analyzers.tokenize("english", "databases").unwrap(), vec![
            "databas"
        ]);
    }

    #[test]
    fn custom_analyzers_shadow_builtins() {
        let mut raw = BTreeMap::new();
        raw.insert(STANDARD_ANALYZER.to_string(), RawAnalyzer::Keyword);
        raw.insert("plain".to_string(), RawAnalyzer::Standard {
            stop_words: vec!["a".into()],
        });
        let analyzers = Analyzers::from_config(&raw).unwrap();

        assert_eq!(analyzers.tokenize(STANDARD_ANALYZER, "A B").unwrap(), vec![
            "A B"
        ]);
        assert_eq!(analyzers.tokenize("plain", "a b").unwrap(), vec!["b"]);
    }

    #[test]
    fn snowball_config_with_bad_language_fails() {
        let mut raw = BTreeMap::new();
        raw.insert("x".to_string(), RawAnalyzer::Snowball {
            language: "klingon".into(),
            stop_words: None,
        });
        assert!(matches!(
            Analyzers::from_config(&raw),
            Err(IndexError::InvalidLanguage(_))
        ));
    }

    #[test]
    fn raw_id_is_reserved() {
        let mut raw = BTreeMap::new();
        raw.insert(RAW_TOKENIZER.to_string(), RawAnalyzer::Keyword);
        assert!(matches!(
            Analyzers::from_config(&raw),
            Err(IndexError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_analyzer_is_configuration_error() {
        assert!(matches!(
            Analyzers::default().get("nope"),
            Err(IndexError::Configuration(_))
        ));
    }
}
