use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Accent-insensitive, separator-insensitive form used for all text matching.
///
/// `"Saint-Étienne"`, `"ST ETIENNE"` and `"st-etienne"` all normalize to
/// `"saint etienne"`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'œ' => "oe".to_string(),
            'æ' => "ae".to_string(),
            c if c.is_alphanumeric() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect();

    folded
        .split_whitespace()
        .map(|token| match token {
            "st" => "saint",
            "ste" => "sainte",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// URL-safe identifier derived from a display name
pub fn slugify(text: &str) -> String {
    normalize(text).replace(' ', "-")
}

/// Word trigrams as `pg_trgm` builds them: each word padded with two leading
/// blanks and one trailing blank
pub fn trigrams(normalized: &str) -> Vec<[char; 3]> {
    let mut grams = Vec::new();
    for word in normalized.split_whitespace() {
        let padded: Vec<char> = "  ".chars().chain(word.chars()).chain(" ".chars()).collect();
        for window in padded.windows(3) {
            let gram = [window[0], window[1], window[2]];
            if !grams.contains(&gram) {
                grams.push(gram);
            }
        }
    }
    grams
}

/// Shared trigrams over the union of both trigram sets, in `[0, 1]`
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let (left, right) = (trigrams(a), trigrams(b));
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.iter().filter(|gram| right.contains(gram)).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}
