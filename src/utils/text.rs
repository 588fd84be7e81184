//! Petits utilitaires de manipulation de texte

/// Retire les clôtures Markdown (```json ... ```) autour d'une réponse de
/// modèle, qui les ajoute parfois malgré la consigne.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(without_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // étiquette de langue éventuelle sur la ligne d'ouverture
    let without_lang = match without_open.find('\n') {
        Some(pos) => &without_open[pos + 1..],
        None => without_open,
    };
    without_lang.strip_suffix("```").unwrap_or(without_lang).trim()
}

/// Tronque aux `max_chars` premiers caractères, sans couper un caractère
/// accentué en deux.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_truncate_chars_respects_accents() {
        let text = "Évaluation des élèves";
        assert_eq!(truncate_chars(text, 10), "Évaluation");
        assert_eq!(truncate_chars(text, 1000), text);
        assert_eq!(truncate_chars("", 5), "");
    }
}
