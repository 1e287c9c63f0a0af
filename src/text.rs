//! Description tokenization feeding the word-cloud term frequencies.

use std::collections::HashSet;
use std::sync::OnceLock;

// ---

/// Portuguese stopwords plus the complaint-specific filler words that would
/// otherwise dominate every cloud ("produto", "empresa", the retailer name...).
const STOPWORDS: &[&str] = &[
    "a", "ao", "aos", "aquela", "aquelas", "aquele", "aqueles", "aquilo", "as", "até", "com",
    "como", "da", "das", "de", "dela", "delas", "dele", "deles", "depois", "do", "dos", "e",
    "é", "ela", "elas", "ele", "eles", "em", "entre", "era", "eram", "essa", "essas", "esse",
    "esses", "esta", "está", "estão", "estas", "estava", "estavam", "este", "estes", "eu",
    "foi", "foram", "há", "isso", "isto", "já", "lhe", "lhes", "mais", "mas", "me", "mesmo",
    "meu", "meus", "minha", "minhas", "muito", "na", "não", "nas", "nem", "no", "nos", "nós",
    "nossa", "nossas", "nosso", "nossos", "num", "numa", "o", "os", "ou", "para", "pela",
    "pelas", "pelo", "pelos", "por", "qual", "quando", "que", "quem", "se", "sem", "ser",
    "seu", "seus", "só", "sua", "suas", "também", "te", "tem", "têm", "tenho", "teu", "teus",
    "tu", "tua", "tuas", "um", "uma", "você", "vocês", "vos", "fui", "havia", "ter", "tinha",
    "estou", "sido", "pois", "ainda", "disse", "fiz", "outro", "outra",
    // dashboard-specific
    "produto", "empresa", "comprei", "loja", "pra", "tive", "dia", "dias", "entrega",
    "reclame", "aqui", "problema", "nagem",
];

const STRIPPED: &[char] = &['"', '\'', '.', ',', ';', ':', '!', '?', '(', ')', '-'];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Lowercase, strip punctuation, split on whitespace and drop stopwords and
/// single-character leftovers.
pub fn tokenize(text: &str) -> Vec<String> {
    // ---
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !stopwords().contains(token))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_tokenize_strips_punctuation_and_stopwords() {
        // ---
        let tokens = tokenize("Comprei o produto, e a GELADEIRA chegou quebrada!!!");
        assert_eq!(tokens, vec!["geladeira", "chegou", "quebrada"]);
    }

    #[test]
    fn test_tokenize_handles_hyphens_and_quotes() {
        // ---
        let tokens = tokenize("\"Ar-condicionado\" (novo) não funciona; reembolso?");
        assert_eq!(tokens, vec!["arcondicionado", "novo", "funciona", "reembolso"]);
    }

    #[test]
    fn test_tokenize_empty_text() {
        // ---
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ... !! ").is_empty());
    }
}
