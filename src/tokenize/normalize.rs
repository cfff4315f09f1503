//! Token filtering and term extraction policy.

use super::tokenizer::Token;
use crate::config::TokenizeConfig;

/// Applies the part-of-speech filter and picks the indexed form per token.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pos_filter: String,
    use_base_form: bool,
}

impl Normalizer {
    pub fn new(pos_filter: impl Into<String>, use_base_form: bool) -> Self {
        Self {
            pos_filter: pos_filter.into(),
            use_base_form,
        }
    }

    pub fn from_config(config: &TokenizeConfig) -> Self {
        Self::new(config.pos_filter.clone(), config.use_base_form)
    }

    /// Whether a token survives the part-of-speech filter.
    ///
    /// An empty filter keeps everything.
    pub fn keeps(&self, token: &Token) -> bool {
        token.pos.starts_with(self.pos_filter.as_str())
    }

    /// The form a kept token contributes to the term string.
    ///
    /// Base form when present and enabled. Numerals and katakana
    /// transliterations typically lack one, so the surface form backs it
    /// up rather than nulling out the joined string. A `*` placeholder
    /// counts as absent, matching dictionary conventions.
    pub fn term<'a>(&self, token: &'a Token) -> &'a str {
        if self.use_base_form
            && let Some(base) = token.base_form.as_deref()
            && !base.is_empty()
            && base != "*"
        {
            return base;
        }
        &token.surface
    }

    /// Kept terms for one token sequence, in token order.
    pub fn terms(&self, tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| self.keeps(t))
            .map(|t| self.term(t).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_matching_pos_prefix() {
        let normalizer = Normalizer::new("名詞", true);
        let noun = Token::new("猫", "名詞,一般");
        let particle = Token::new("が", "助詞,格助詞");
        let symbol = Token::new("。", "記号,句点");

        assert!(normalizer.keeps(&noun));
        assert!(!normalizer.keeps(&particle));
        assert!(!normalizer.keeps(&symbol));
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let normalizer = Normalizer::new("", true);
        assert!(normalizer.keeps(&Token::new("が", "助詞,格助詞")));
        assert!(normalizer.keeps(&Token::new("。", "記号,句点")));
    }

    #[test]
    fn prefers_base_form_when_present() {
        let normalizer = Normalizer::new("名詞", true);
        let token = Token::new("走り", "名詞,一般").with_base_form("走る");
        assert_eq!(normalizer.term(&token), "走る");
    }

    #[test]
    fn falls_back_to_surface_without_base_form() {
        let normalizer = Normalizer::new("名詞", true);
        let katakana = Token::new("ネコ", "名詞,一般");
        let numeral = Token::new("333", "名詞,数");
        assert_eq!(normalizer.term(&katakana), "ネコ");
        assert_eq!(normalizer.term(&numeral), "333");
    }

    #[test]
    fn star_placeholder_counts_as_absent() {
        let normalizer = Normalizer::new("名詞", true);
        let token = Token::new("ネコ", "名詞,一般").with_base_form("*");
        assert_eq!(normalizer.term(&token), "ネコ");
    }

    #[test]
    fn surface_mode_ignores_base_form() {
        let normalizer = Normalizer::new("名詞", false);
        let token = Token::new("走り", "名詞,一般").with_base_form("走る");
        assert_eq!(normalizer.term(&token), "走り");
    }

    #[test]
    fn terms_keep_token_order() {
        let normalizer = Normalizer::new("名詞", true);
        let tokens = vec![
            Token::new("猫", "名詞,一般").with_base_form("猫"),
            Token::new("が", "助詞,格助詞"),
            Token::new("好", "名詞,一般").with_base_form("好"),
        ];
        assert_eq!(normalizer.terms(&tokens), vec!["猫", "好"]);
    }
}
