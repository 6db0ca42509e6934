use deunicode::deunicode;

use crate::lazy_regex;

lazy_regex! { WHITESPACE_REGEX, r"\s+" }

/// Folds an answer to a comparable form: ASCII transliteration, lowercase, single spaces.
pub fn normalize(text: &str) -> String {
    let ascii = deunicode(text).to_lowercase();
    WHITESPACE_REGEX.replace_all(ascii.trim(), " ").into_owned()
}

/// Decides whether a chat message answers a question.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerMatcher {
    /// Byte-for-byte equality.
    Exact(String),
    /// Equal after trimming, ignoring case.
    IgnoreCase(String),
    /// Equal to any alias after [`normalize`]. Aliases are stored normalized.
    AnyOf(Vec<String>),
    /// The normalized answer appears somewhere in the normalized message.
    Contains(String),
}

impl AnswerMatcher {
    pub fn any_of<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = aliases
            .into_iter()
            .map(|alias| normalize(alias.as_ref()))
            .filter(|alias| !alias.is_empty())
            .collect();
        normalized.dedup();
        Self::AnyOf(normalized)
    }

    pub fn contains(answer: &str) -> Self {
        Self::Contains(normalize(answer))
    }

    pub fn matches(&self, content: &str) -> bool {
        match self {
            AnswerMatcher::Exact(expected) => content == expected,
            AnswerMatcher::IgnoreCase(expected) => content.trim().to_lowercase() == expected.to_lowercase(),
            AnswerMatcher::AnyOf(aliases) => {
                let content = normalize(content);
                aliases.iter().any(|alias| *alias == content)
            }
            AnswerMatcher::Contains(needle) => normalize(content).contains(needle.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_accents_case_and_spacing() {
        assert_eq!(normalize("  Kimi   RÄIKKÖNEN "), "kimi raikkonen");
        assert_eq!(normalize("Nikola Jokić"), "nikola jokic");
    }

    #[test]
    fn any_of_accepts_aliases_without_accents() {
        let matcher = AnswerMatcher::any_of(["Sergio Pérez", "Pérez"]);
        assert!(matcher.matches("perez"));
        assert!(matcher.matches("SERGIO PEREZ"));
        assert!(!matcher.matches("checo"));
    }

    #[test]
    fn exact_is_strict() {
        let matcher = AnswerMatcher::Exact("SLAM DUNK".into());
        assert!(matcher.matches("SLAM DUNK"));
        assert!(!matcher.matches("slam dunk"));
    }

    #[test]
    fn ignore_case_trims() {
        let matcher = AnswerMatcher::IgnoreCase("GO".into());
        assert!(matcher.matches(" go "));
        assert!(!matcher.matches("gogo"));
    }

    #[test]
    fn contains_finds_answer_inside_a_sentence() {
        let matcher = AnswerMatcher::contains("Lakers");
        assert!(matcher.matches("pretty sure it's the lakers"));
        assert!(!matcher.matches("celtics"));
    }
}
