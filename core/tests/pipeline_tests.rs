use lexio_core::language::{self, Language};
use lexio_core::pipeline::{
    analyze, filter_tokens, normalize, remove_stopwords, stem, tokenize,
};

#[test]
fn normalization_folds_case_and_whitespace() {
    assert_eq!(normalize("  El   Quijote\tde la  Mancha \n"), "el quijote de la mancha");
    // NFKC folds compatibility forms like the fi ligature
    assert_eq!(normalize("ﬁle"), "file");
}

#[test]
fn tokenizer_keeps_order_and_intra_word_marks() {
    let tokens = tokenize("l'été paso a paso en 1999");
    assert_eq!(tokens, vec!["l'été", "paso", "a", "paso", "en"]);
}

#[test]
fn stopwords_are_language_specific() {
    let tokens = vec!["el".to_string(), "perro".to_string(), "the".to_string()];
    let spanish = remove_stopwords(tokens.clone(), Language::Spanish);
    assert!(!spanish.contains(&"el".to_string()));
    assert!(spanish.contains(&"the".to_string()));

    let english = remove_stopwords(tokens, Language::English);
    assert!(english.contains(&"el".to_string()));
    assert!(!english.contains(&"the".to_string()));
}

#[test]
fn filter_drops_short_and_numeric_tokens() {
    let tokens = vec![
        "a".to_string(),
        "ab".to_string(),
        "2024".to_string(),
        "a1".to_string(),
    ];
    assert_eq!(filter_tokens(tokens, 2), vec!["ab", "a1"]);
}

#[test]
fn stemming_follows_the_resolved_language() {
    let tokens = vec!["corriendo".to_string()];
    assert_eq!(stem(tokens, Language::Spanish), vec!["corr"]);
    let tokens = vec!["running".to_string()];
    assert_eq!(stem(tokens, Language::English), vec!["run"]);
}

#[test]
fn analyze_is_symmetric_for_identical_inputs() {
    let text = "Los pájaros vuelan sobre el mar mientras los pescadores esperan.";
    let first = analyze(text, Language::Spanish, 2);
    let second = analyze(text, Language::Spanish, 2);
    assert_eq!(first, second);
    assert!(!first.tokens.is_empty());
}

#[test]
fn analyze_resolves_unknown_to_fallback() {
    let analysis = analyze("perro", Language::Spanish, 2);
    assert_eq!(analysis.detected, None);
    assert_eq!(analysis.resolved, Language::Spanish);
    assert_eq!(analysis.tokens, vec!["perr"]);
}

#[test]
fn analyze_detects_language_of_long_text() {
    let analysis = analyze(
        "Los exploradores cruzaron la cordillera durante semanas buscando un \
         paso seguro hacia los valles del sur.",
        Language::English,
        2,
    );
    assert_eq!(analysis.detected, Some(Language::Spanish));
    assert_eq!(analysis.resolved, Language::Spanish);
}

#[test]
fn analyze_of_garbage_is_empty_not_an_error() {
    let analysis = analyze("¡¡¡... 123 456 --- !!!", Language::Spanish, 2);
    assert!(analysis.tokens.is_empty());
}

#[test]
fn detection_confidence_gate_returns_unknown() {
    let (detected, confidence) = language::detect("abc");
    assert_eq!(detected, None);
    assert_eq!(confidence, 0.0);
}
