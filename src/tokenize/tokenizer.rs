//! The tokenizer seam and the built-in character-class segmenter.
//!
//! A full morphological analyzer backed by a dictionary (IPADIC and friends)
//! plugs in through the [`Tokenizer`] trait. The built-in implementation
//! needs no dictionary: it segments on Unicode script-class runs, which is
//! enough to separate content words (kanji, katakana, latin, digits) from
//! the hiragana particles and okurigana between them.

use serde::{Deserialize, Serialize};

use super::TokenizeResult;

/// A single analyzed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// As-written form
    pub surface: String,
    /// IPADIC-style part-of-speech tag, comma-separated from coarse to fine
    pub pos: String,
    /// Dictionary form, when the analyzer knows one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_form: Option<String>,
}

impl Token {
    pub fn new(surface: impl Into<String>, pos: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            pos: pos.into(),
            base_form: None,
        }
    }

    pub fn with_base_form(mut self, base_form: impl Into<String>) -> Self {
        self.base_form = Some(base_form.into());
        self
    }
}

/// Morphological analysis seam.
///
/// Implementations must be shareable across worker threads; normalization
/// fans sentences out with parallel iterators.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> TokenizeResult<Vec<Token>>;

    /// Analyzer name recorded in logs.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Kanji,
    Hiragana,
    Katakana,
    Latin,
    Digit,
    Symbol,
    Space,
}

fn classify(c: char) -> CharClass {
    if c.is_whitespace() {
        return CharClass::Space;
    }
    match c {
        '\u{3041}'..='\u{309F}' => CharClass::Hiragana,
        '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' => CharClass::Katakana,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '々'
        | '〆'
        | '〇' => CharClass::Kanji,
        'A'..='Z' | 'a'..='z' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
            CharClass::Latin
        }
        '0'..='9' | '\u{FF10}'..='\u{FF19}' => CharClass::Digit,
        _ => CharClass::Symbol,
    }
}

fn pos_tag(class: CharClass) -> &'static str {
    match class {
        CharClass::Kanji | CharClass::Katakana | CharClass::Latin => "名詞,一般",
        CharClass::Digit => "名詞,数",
        CharClass::Hiragana => "助詞,一般",
        CharClass::Symbol => "記号,一般",
        CharClass::Space => "記号,空白",
    }
}

/// Dictionary-free segmenter over Unicode script-class runs.
///
/// Consecutive characters of the same class form one token. Kanji runs get
/// a base form equal to their surface; katakana, latin and digit runs carry
/// none, exercising the surface-form fallback downstream. Hiragana runs are
/// tagged as particles so the default noun filter drops them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharClassTokenizer;

impl CharClassTokenizer {
    fn flush(tokens: &mut Vec<Token>, run: &mut String, class: CharClass) {
        if run.is_empty() {
            return;
        }
        let token = Token::new(run.as_str(), pos_tag(class));
        let token = if class == CharClass::Kanji {
            token.with_base_form(run.as_str())
        } else {
            token
        };
        tokens.push(token);
        run.clear();
    }
}

impl Tokenizer for CharClassTokenizer {
    fn tokenize(&self, text: &str) -> TokenizeResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut run = String::new();
        let mut current = CharClass::Space;

        for c in text.chars() {
            let class = classify(c);
            if class != current {
                Self::flush(&mut tokens, &mut run, current);
                current = class;
            }
            if class != CharClass::Space {
                run.push(c);
            }
        }
        Self::flush(&mut tokens, &mut run, current);

        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "char-class"
    }
}
