use proptest::prelude::*;

use rust_ocr_glossary::normalizer::builtin_rules;
use rust_ocr_glossary::{Field, KeywordTable, Normalizer, normalize, segment};

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z][a-z]{0,8}Error".prop_map(|name| format!("ErrorName: {}", name)),
        Just("エラー名".to_string()),
        "[a-z ]{0,20}".prop_map(|text| format!("Description: {}", text)),
        "[a-z ]{0,20}".prop_map(|text| format!("発生例・{}", text)),
        "[ぁ-ん]{1,15}",
        "[A-Za-z0-9()=:. ]{0,16}",
        any::<String>(),
    ]
}

fn is_clean(text: &str) -> bool {
    let folded = Normalizer::with_rules(Vec::new(), true).normalize(text);
    builtin_rules()
        .iter()
        .all(|rule| !text.contains(&rule.from) && !folded.contains(&rule.from))
}

proptest! {
    #[test]
    fn records_always_have_a_name(fragments in prop::collection::vec(fragment(), 0..40)) {
        for record in segment(&fragments) {
            prop_assert!(!record.error_name.is_empty());
        }
    }

    #[test]
    fn arbitrary_text_never_panics(fragments in prop::collection::vec(any::<String>(), 0..20)) {
        let records = segment(&fragments);
        prop_assert!(records.iter().all(|r| !r.error_name.is_empty()));
    }

    #[test]
    fn at_most_one_record_per_name_header(fragments in prop::collection::vec(fragment(), 0..40)) {
        let table = KeywordTable::default();
        let headers = fragments
            .iter()
            .filter(|f| {
                table
                    .classify(normalize(f).trim())
                    .is_some_and(|m| m.field == Field::ErrorName)
            })
            .count();
        prop_assert!(segment(&fragments).len() <= headers);
    }

    #[test]
    fn record_order_follows_header_order(
        entries in prop::collection::vec(("[A-Z][a-z]{0,8}Error", "[a-z ]{0,20}"), 0..12)
    ) {
        let mut fragments = Vec::new();
        for (name, description) in &entries {
            fragments.push(format!("ErrorName: {}", name));
            fragments.push(format!("Description: {}", description));
        }
        let names: Vec<String> = segment(&fragments).into_iter().map(|r| r.error_name).collect();
        let expected: Vec<String> = entries.iter().map(|(name, _)| normalize(name)).collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn normalizing_clean_text_is_idempotent(text in "[A-Za-z0-9 =:().ぁ-んァ-ヶ一-龥ー・：]{0,30}") {
        prop_assume!(is_clean(&text));
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn text_before_any_header_is_ignored(
        preamble in prop::collection::vec("[a-z ]{1,20}", 0..6),
        name in "[A-Z][a-z]{0,8}Error",
    ) {
        let mut fragments = preamble.clone();
        fragments.push(format!("ErrorName: {}", name));
        let records = segment(&fragments);
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(&records[0].description, "");
        prop_assert_eq!(&records[0].example, "");
    }
}
