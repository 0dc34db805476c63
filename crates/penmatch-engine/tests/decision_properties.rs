use penmatch_engine::{extract_decision, DecisionLabel};
use proptest::prelude::*;

/// Filler words that never form a whole "yes", "no" or "unknown".
fn filler() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "the", "loops", "nobody", "yesterday", "unknowingly", "know", "noses", "eyes",
            "slant", "baseline", "not", "yes_", "noun", "same", "writer",
        ]),
        0..12,
    )
    .prop_map(|words| words.join(" "))
}

fn cased(word: &'static str) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(ch, up)| if up { ch.to_ascii_uppercase() } else { ch })
            .collect()
    })
}

proptest! {
    #[test]
    fn unknown_wins_over_everything(
        before in filler(),
        after in filler(),
        word in cased("unknown"),
        yes in cased("yes"),
        no in cased("no"),
    ) {
        let text = format!("{yes}, {before} {word}. {after} {no}");
        prop_assert_eq!(extract_decision(&text), DecisionLabel::Unknown);
    }

    #[test]
    fn lone_yes_is_yes(before in filler(), after in filler(), yes in cased("yes")) {
        let text = format!("{before} {yes}, {after}");
        prop_assert_eq!(extract_decision(&text), DecisionLabel::Yes);
    }

    #[test]
    fn lone_no_is_no(before in filler(), after in filler(), no in cased("no")) {
        let text = format!("{before} ({no}) {after}");
        prop_assert_eq!(extract_decision(&text), DecisionLabel::No);
    }

    #[test]
    fn yes_and_no_together_are_both(
        before in filler(),
        yes in cased("yes"),
        no in cased("no"),
        swap in any::<bool>(),
    ) {
        let text = if swap {
            format!("{no}: {before}; {yes}")
        } else {
            format!("{yes}: {before}; {no}")
        };
        prop_assert_eq!(extract_decision(&text), DecisionLabel::Both);
    }

    #[test]
    fn filler_alone_is_unknown(text in filler()) {
        prop_assert_eq!(extract_decision(&text), DecisionLabel::Unknown);
    }

    #[test]
    fn extraction_is_deterministic(text in ".{0,200}") {
        prop_assert_eq!(extract_decision(&text), extract_decision(&text));
    }
}
