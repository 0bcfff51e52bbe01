// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Word tokenization
//!
//! Text is first split into sentences using the punkt abbreviation list,
//! then each sentence goes through Treebank-style rules: punctuation and
//! brackets become separate tokens, clitics are split off (`they'll` ->
//! `they 'll`, `can't` -> `ca n't`) and a handful of fused contractions are
//! separated (`cannot` -> `can not`).

use crate::resources::LanguageResources;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref NON_SPACE_RE: Regex = Regex::new(r"\S+").unwrap();

    static ref STARTING_QUOTES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"([«“‘„]|`+)").unwrap(), " ${1} "),
        (Regex::new(r#"^""#).unwrap(), "``"),
        (Regex::new(r"(``)").unwrap(), " ${1} "),
        (Regex::new(r#"([ (\[{<])("|'{2})"#).unwrap(), "${1} `` "),
    ];

    static ref PUNCTUATION: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r#"([^.])(\.)([\]\)}>"']*)\s*$"#).unwrap(), "${1} ${2} ${3} "),
        (Regex::new(r"([:,])([^\d])").unwrap(), " ${1} ${2}"),
        (Regex::new(r"([:,])$").unwrap(), " ${1} "),
        (Regex::new(r"\.{2,}").unwrap(), " ${0} "),
        (Regex::new(r"[;@#$%&]").unwrap(), " ${0} "),
        (Regex::new(r"[?!]").unwrap(), " ${0} "),
        (Regex::new(r"([^'])' ").unwrap(), "${1} ' "),
        (Regex::new(r"\*").unwrap(), " ${0} "),
    ];

    static ref PARENS_BRACKETS: Regex = Regex::new(r"[\]\[\(\)\{\}<>]").unwrap();
    static ref DOUBLE_DASHES: Regex = Regex::new(r"--").unwrap();

    static ref ENDING_QUOTES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"([»”’])").unwrap(), " ${1} "),
        (Regex::new(r"''").unwrap(), " '' "),
        (Regex::new(r#"""#).unwrap(), " '' "),
        (Regex::new(r"([^' ])('[sS]|'[mM]|'[dD]|') ").unwrap(), "${1} ${2} "),
        (Regex::new(r"([^' ])('ll|'LL|'re|'RE|'ve|'VE|n't|N'T) ").unwrap(), "${1} ${2} "),
    ];

    static ref CONTRACTIONS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(can)(not)\b").unwrap(),
        Regex::new(r"(?i)\b(d)('ye)\b").unwrap(),
        Regex::new(r"(?i)\b(gim)(me)\b").unwrap(),
        Regex::new(r"(?i)\b(gon)(na)\b").unwrap(),
        Regex::new(r"(?i)\b(got)(ta)\b").unwrap(),
        Regex::new(r"(?i)\b(lem)(me)\b").unwrap(),
        Regex::new(r"(?i)\b(more)('n)\b").unwrap(),
        Regex::new(r"(?i)\b(wan)(na)\s").unwrap(),
        Regex::new(r"(?i) ('t)(is)\b").unwrap(),
        Regex::new(r"(?i) ('t)(was)\b").unwrap(),
    ];
}

/// Closing characters that may trail a sentence terminator
const TRAILING_CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '”', '’', '»'];

/// Abbreviation-aware sentence splitter
#[derive(Debug, Clone, Default)]
pub struct SentenceSplitter {
    abbreviations: HashSet<String>,
}

impl SentenceSplitter {
    /// `abbreviations` are lowercase, without the trailing period
    pub fn new(abbreviations: HashSet<String>) -> Self {
        Self { abbreviations }
    }

    pub fn from_resources(resources: &LanguageResources) -> Self {
        Self::new(resources.abbreviations().clone())
    }

    /// Split `text` into sentence slices
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start: Option<usize> = None;

        for token in NON_SPACE_RE.find_iter(text) {
            let sentence_start = *start.get_or_insert(token.start());
            if self.ends_sentence(token.as_str()) {
                sentences.push(&text[sentence_start..token.end()]);
                start = None;
            }
        }

        if let Some(sentence_start) = start {
            sentences.push(text[sentence_start..].trim_end());
        }

        sentences
    }

    fn ends_sentence(&self, token: &str) -> bool {
        let core = token.trim_end_matches(TRAILING_CLOSERS);

        if core.ends_with('?') || core.ends_with('!') {
            return true;
        }
        if !core.ends_with('.') || core.ends_with("..") {
            return false;
        }

        let word = core
            .trim_end_matches('.')
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if word.is_empty() {
            return false;
        }
        // Single-letter initials ("J. Smith")
        if word.chars().count() == 1 && word.chars().all(char::is_alphabetic) {
            return false;
        }

        !self.abbreviations.contains(&word)
    }
}

/// Treebank-style word tokenizer for a single sentence
#[derive(Debug, Clone, Copy, Default)]
pub struct TreebankWordTokenizer;

impl TreebankWordTokenizer {
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut text = text.to_string();

        for (re, replacement) in STARTING_QUOTES.iter() {
            text = re.replace_all(&text, *replacement).into_owned();
        }
        for (re, replacement) in PUNCTUATION.iter() {
            text = re.replace_all(&text, *replacement).into_owned();
        }

        text = PARENS_BRACKETS.replace_all(&text, " ${0} ").into_owned();
        text = DOUBLE_DASHES.replace_all(&text, " -- ").into_owned();

        // Clitic rules expect a trailing space
        text = format!(" {} ", text);

        for (re, replacement) in ENDING_QUOTES.iter() {
            text = re.replace_all(&text, *replacement).into_owned();
        }
        for re in CONTRACTIONS.iter() {
            text = re.replace_all(&text, " ${1} ${2} ").into_owned();
        }

        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Sentence-split `text`, then word-tokenize each sentence
pub fn word_tokenize(text: &str, splitter: &SentenceSplitter) -> Vec<String> {
    let tokenizer = TreebankWordTokenizer;
    splitter
        .split(text)
        .into_iter()
        .flat_map(|sentence| tokenizer.tokenize(sentence))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter() -> SentenceSplitter {
        SentenceSplitter::new(["dr", "mr", "e.g"].iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_sentence_split_respects_abbreviations() {
        let sentences = splitter().split("Dr. Smith sold it. I loved it! Did you?  Yes");
        assert_eq!(sentences, vec!["Dr. Smith sold it.", "I loved it!", "Did you?", "Yes"]);
    }

    #[test]
    fn test_sentence_split_initials_and_ellipsis() {
        let sentences = splitter().split("J. Smith wrote... nothing. Done.");
        assert_eq!(sentences, vec!["J. Smith wrote... nothing.", "Done."]);
    }

    #[test]
    fn test_sentence_split_empty() {
        assert!(splitter().split("").is_empty());
        assert!(splitter().split("   ").is_empty());
    }

    #[test]
    fn test_treebank_punctuation() {
        let tokens = word_tokenize(
            "Good muffins cost $3.88\nin New York.  Please buy me\ntwo of them.\nThanks.",
            &splitter(),
        );
        assert_eq!(
            tokens,
            vec![
                "Good", "muffins", "cost", "$", "3.88", "in", "New", "York", ".", "Please", "buy",
                "me", "two", "of", "them", ".", "Thanks", "."
            ]
        );
    }

    #[test]
    fn test_treebank_clitics() {
        let tokenizer = TreebankWordTokenizer;
        assert_eq!(
            tokenizer.tokenize("They'll save and invest more."),
            vec!["They", "'ll", "save", "and", "invest", "more", "."]
        );
        assert_eq!(
            tokenizer.tokenize("I can't believe it's real"),
            vec!["I", "ca", "n't", "believe", "it", "'s", "real"]
        );
    }

    #[test]
    fn test_treebank_contractions() {
        let tokenizer = TreebankWordTokenizer;
        assert_eq!(tokenizer.tokenize("i cannot wait"), vec!["i", "can", "not", "wait"]);
        assert_eq!(tokenizer.tokenize("gonna love it"), vec!["gon", "na", "love", "it"]);
    }

    #[test]
    fn test_treebank_quotes_and_brackets() {
        let tokenizer = TreebankWordTokenizer;
        assert_eq!(
            tokenizer.tokenize("\"Best (really) buy\""),
            vec!["``", "Best", "(", "really", ")", "buy", "''"]
        );
        assert_eq!(tokenizer.tokenize("wait -- what"), vec!["wait", "--", "what"]);
    }

    #[test]
    fn test_cleaned_text_tokenizes_on_whitespace() {
        let tokens = word_tokenize("the quick brown fox", &splitter());
        assert_eq!(tokens, vec!["the", "quick", "brown", "fox"]);
    }
}
