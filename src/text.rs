//! Free-text answer canonicalization and fuzzy equivalence.
//!
//! Everything in this module is pure and deterministic: [`normalize`] folds an
//! answer into a canonical form and [`are_similar`] decides whether two
//! answers should count as the same herd answer.

/// Words removed wholesale during normalization.
const ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Spelled-out digits replaced by their numeric form, in replacement order.
const DIGIT_WORDS: [(&str, &str); 6] = [
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
];

/// Canonicalize a free-text answer for comparison.
///
/// The pipeline lowercases, collapses whitespace, strips punctuation and
/// symbols, folds common spelling variations (`ph` -> `f`, `& `-> `and`,
/// spelled-out digits), drops articles, and strips plural/gerund suffixes so
/// near-identical answers compare equal.
pub fn normalize(answer: &str) -> String {
    let lowered = answer.to_lowercase();
    let mut text: String = lowered.split_whitespace().collect::<Vec<_>>().join(" ");

    text.retain(|c| !matches!(c, '.' | ',' | '!' | '?' | '\'' | '"'));
    let text = text.replace('&', "and");

    // Keep word characters, spaces, and hyphens; drops emoji and symbols.
    let text: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '-'))
        .collect();

    let text = text.replace("ph", "f");

    let text = text
        .split_whitespace()
        .filter(|word| !ARTICLES.contains(word))
        .collect::<Vec<_>>()
        .join(" ");

    let text = map_segments(&text, strip_plural);

    let mut text = text;
    for (word, digit) in DIGIT_WORDS {
        text = text.replace(word, digit);
    }

    let text = map_segments(&text, strip_gerund);
    let text = map_segments(&text, soften_ie);

    text.trim().to_string()
}

/// Decide whether two answers should be treated as the same herd answer.
///
/// Exact match after normalization always qualifies; otherwise the answers
/// are similar when their edit distance stays within one character per five
/// characters of the longer normalized form, plus one.
pub fn are_similar(first: &str, second: &str) -> bool {
    let left = normalize(first);
    let right = normalize(second);

    if left == right {
        return true;
    }

    let max_length = left.chars().count().max(right.chars().count());
    let allowed = max_length / 5 + 1;
    levenshtein(&left, &right) <= allowed
}

/// Standard Levenshtein edit distance (insert/delete/substitute, unit cost).
///
/// Full dynamic-programming matrix; answer strings are short enough that no
/// early exit is needed.
pub fn levenshtein(first: &str, second: &str) -> usize {
    let a: Vec<char> = first.chars().collect();
    let b: Vec<char> = second.chars().collect();

    let mut matrix = vec![vec![0usize; a.len() + 1]; b.len() + 1];
    for (i, cell) in matrix[0].iter_mut().enumerate() {
        *cell = i;
    }
    for (j, row) in matrix.iter_mut().enumerate() {
        row[0] = j;
    }

    for j in 1..=b.len() {
        for i in 1..=a.len() {
            let substitution = usize::from(a[i - 1] != b[j - 1]);
            matrix[j][i] = (matrix[j][i - 1] + 1)
                .min(matrix[j - 1][i] + 1)
                .min(matrix[j - 1][i - 1] + substitution);
        }
    }

    matrix[b.len()][a.len()]
}

/// Apply `transform` to every whitespace- or hyphen-delimited segment.
fn map_segments<F>(text: &str, transform: F) -> String
where
    F: Fn(&str) -> String,
{
    text.split(' ')
        .map(|word| {
            word.split('-')
                .map(&transform)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip a single trailing `s` unless the segment ends in `ss`.
fn strip_plural(segment: &str) -> String {
    if segment.len() >= 2 && segment.ends_with('s') && !segment.ends_with("ss") {
        segment[..segment.len() - 1].to_string()
    } else {
        segment.to_string()
    }
}

/// Strip trailing `ing` repeatedly so the result is stable under re-application.
fn strip_gerund(segment: &str) -> String {
    let mut out = segment;
    while let Some(stripped) = out.strip_suffix("ing") {
        out = stripped;
    }
    out.to_string()
}

/// Fold a trailing `ie` into `y` (common misspelling, e.g. `zombie`/`zomby`).
fn soften_ie(segment: &str) -> String {
    match segment.strip_suffix("ie") {
        Some(stem) => format!("{stem}y"),
        None => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("  Red!  "), "red");
        assert_eq!(normalize("red."), "red");
        assert_eq!(normalize("\"Blue\""), "blue");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("deep   dish    pizza"), "deep dish pizza");
    }

    #[test]
    fn normalize_replaces_ampersand() {
        assert_eq!(normalize("rock & roll"), "rock and roll");
    }

    #[test]
    fn normalize_drops_emoji_and_symbols() {
        assert_eq!(normalize("red 🚗"), "red");
        assert_eq!(normalize("c@t"), "ct");
    }

    #[test]
    fn normalize_folds_ph_to_f() {
        assert_eq!(normalize("dolphin"), "dolfin");
    }

    #[test]
    fn normalize_removes_articles() {
        assert_eq!(normalize("the cat"), "cat");
        assert_eq!(normalize("an apple"), "apple");
        assert_eq!(normalize("a big dog"), "big dog");
    }

    #[test]
    fn normalize_strips_plurals_per_word() {
        assert_eq!(normalize("cats"), "cat");
        assert_eq!(normalize("cats dogs"), "cat dog");
        // Double-s endings are left alone.
        assert_eq!(normalize("glass"), "glass");
    }

    #[test]
    fn normalize_replaces_digit_words() {
        assert_eq!(normalize("two"), "2");
        assert_eq!(normalize("three dogs"), "3 dog");
    }

    #[test]
    fn normalize_strips_gerund_and_ie() {
        assert_eq!(normalize("dancing"), "danc");
        assert_eq!(normalize("zombie"), "zomby");
    }

    #[test]
    fn normalize_is_idempotent_on_answer_corpus() {
        let corpus = [
            "  Red!  ",
            "the cats",
            "rock & roll",
            "Deep   Dish Pizza",
            "dolphins",
            "zombie movies",
            "three blind mice",
            "x the y",
            "running shoes",
            "twenty-two",
            "",
            "🎉🎉",
        ];
        for raw in corpus {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn levenshtein_known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn similarity_is_reflexive() {
        for answer in ["red", "Deep Dish Pizza", "", "🚗"] {
            assert!(are_similar(answer, answer));
        }
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [("red", "red!"), ("banana", "bananna"), ("red", "blue")];
        for (a, b) in pairs {
            assert_eq!(are_similar(a, b), are_similar(b, a));
        }
    }

    #[test]
    fn punctuation_variants_are_similar() {
        assert!(are_similar("Red", "red!"));
        assert!(are_similar("the cats", "cat"));
    }

    #[test]
    fn typos_within_threshold_are_similar() {
        // distance 1, allowed floor(7/5) + 1 = 2
        assert!(are_similar("banana", "bananna"));
    }

    #[test]
    fn distinct_answers_are_not_similar() {
        assert!(!are_similar("pizza", "sushi"));
        assert!(!are_similar("elephant", "giraffe"));
    }
}
