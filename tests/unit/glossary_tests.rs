/*!
 * Tests for glossary protection and restoration
 */

use batchtrans::translation::glossary::{placeholder, GlossaryGuard};
use std::collections::BTreeMap;

use crate::common::texts;

fn guard(terms: &[(&str, &str)]) -> GlossaryGuard {
    let terms: BTreeMap<String, String> = terms
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();
    GlossaryGuard::new(&terms)
}

#[test]
fn test_glossary_throughPassthroughBackend_shouldInsertTargets() {
    let guard = guard(&[("AWS", "Amazon Web Services")]);
    let (protected, placeholders) = guard.protect(&texts(&["AWS is a cloud platform"]));

    assert_eq!(protected, texts(&["{ID_0} is a cloud platform"]));
    assert_eq!(placeholders.target(&placeholder(0)), Some("Amazon Web Services"));

    let restored = guard.restore(protected, &placeholders);
    assert_eq!(restored, texts(&["Amazon Web Services is a cloud platform"]));
}

#[test]
fn test_glossary_withOverlappingTerms_shouldPreferLongerTerm() {
    let guard = guard(&[("Machine Learning", "ML"), ("Machine", "Maschine")]);
    let (protected, placeholders) = guard.protect(&texts(&["Machine Learning is a subset of Machine"]));

    assert_eq!(protected, texts(&["{ID_0} is a subset of {ID_1}"]));
    assert_eq!(placeholders.len(), 2);
    assert_eq!(
        guard.restore(protected, &placeholders),
        texts(&["ML is a subset of Maschine"])
    );
}

#[test]
fn test_glossary_protect_shouldMatchCaseInsensitivelyOnWordBoundaries() {
    let guard = guard(&[("rust", "Rust")]);
    let (protected, _) = guard.protect(&texts(&["RUST and trust"]));
    assert_eq!(protected, texts(&["{ID_0} and trust"]));
}

#[test]
fn test_glossary_protect_withoutTerms_shouldLeaveTextsAlone() {
    let guard = guard(&[]);
    assert!(guard.is_empty());
    let (protected, placeholders) = guard.protect(&texts(&["nothing to see"]));
    assert_eq!(protected, texts(&["nothing to see"]));
    assert!(placeholders.is_empty());
}

#[test]
fn test_glossary_restore_withDroppedPlaceholder_shouldKeepProviderText() {
    let guard = guard(&[("AWS", "Amazon Web Services")]);
    let (_, placeholders) = guard.protect(&texts(&["AWS rocks"]));
    let restored = guard.restore(texts(&["les nuages"]), &placeholders);
    assert_eq!(restored, texts(&["les nuages"]));
}
