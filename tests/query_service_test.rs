//! Integration tests for the query engine: play/teach, describe and compare.

use std::sync::Arc;

use rstest::rstest;

use twentyq::application::services::{compare, describe, teach, PlayOutcome, QueryService};
use twentyq::application::ApplicationError;
use twentyq::config::Settings;
use twentyq::domain::codec::{decode, encode};
use twentyq::domain::path::{find_leaf, path_to};
use twentyq::domain::{verify, DecisionTree, DomainError, DEFAULT_MAX_VALUE_LEN};
use twentyq::util::testing::{init_test_setup, ScriptedConsole};

const ANIMALS: &str = "\
{ has whiskers
    { barks
        { Nothing {nil} {nil} }
        { Dog {nil} {nil} }
    }
    { is large
        { Cat {nil} {nil} }
        { Lion {nil} {nil} }
    }
}
";

fn animals() -> DecisionTree {
    decode(ANIMALS, DEFAULT_MAX_VALUE_LEN).unwrap()
}

fn service(answers: &[&str]) -> (QueryService, Arc<ScriptedConsole>) {
    init_test_setup();
    let console = Arc::new(ScriptedConsole::new(answers));
    let svc = QueryService::new(console.clone(), Arc::new(Settings::default()));
    (svc, console)
}

// ============================================================
// play()
// ============================================================

#[test]
fn given_fresh_knowledge_base_when_playing_twice_then_learns_then_guesses() {
    let mut tree = DecisionTree::with_subject("Nothing", DEFAULT_MAX_VALUE_LEN).unwrap();

    let (svc, _) = service(&["no", "Cat", "has whiskers"]);
    let first = svc.play(&mut tree).unwrap();

    let (svc, console) = service(&["yes", "YES"]);
    let second = svc.play(&mut tree).unwrap();

    assert_eq!(
        first,
        PlayOutcome::Learned {
            subject: "Cat".into(),
            property: "has whiskers".into(),
            replaced: "Nothing".into(),
        }
    );
    assert_eq!(
        second,
        PlayOutcome::Guessed {
            subject: "Cat".into()
        }
    );
    assert_eq!(console.prompts(), vec!["has whiskers?", "Is it Cat?"]);
    assert_eq!(console.messages(), vec!["Got it!"]);
}

#[test]
fn given_non_affirmative_answers_when_playing_then_no_branches_are_followed() {
    let mut tree = animals();
    let (svc, console) = service(&["nope", "", "yes"]);

    let outcome = svc.play(&mut tree).unwrap();

    assert_eq!(
        outcome,
        PlayOutcome::Guessed {
            subject: "Nothing".into()
        }
    );
    assert_eq!(
        console.prompts(),
        vec!["has whiskers?", "barks?", "Is it Nothing?"]
    );
}

#[test]
fn given_question_ending_in_mark_when_playing_then_prompt_has_single_mark() {
    let mut tree = decode(
        "{ Он(а) летает? { Ничего {nil} {nil} } { Птица {nil} {nil} } }",
        DEFAULT_MAX_VALUE_LEN,
    )
    .unwrap();
    let (svc, console) = service(&["yes", "yes"]);

    svc.play(&mut tree).unwrap();

    assert_eq!(console.prompts(), vec!["Он(а) летает?", "Is it Птица?"]);
}

#[test]
fn given_empty_knowledge_base_when_playing_then_first_subject_is_seeded() {
    let mut tree = DecisionTree::new();
    let (svc, _) = service(&["Rock"]);

    let outcome = svc.play(&mut tree).unwrap();

    assert_eq!(
        outcome,
        PlayOutcome::Seeded {
            subject: "Rock".into()
        }
    );
    assert_eq!(encode(&tree), "{ Rock {nil} {nil} }\n");
}

#[test]
fn given_closed_input_when_playing_then_console_error_and_tree_unchanged() {
    let mut tree = animals();
    let (svc, _) = service(&["yes"]);

    let err = svc.play(&mut tree).unwrap_err();

    assert!(matches!(err, ApplicationError::Console(_)));
    assert_eq!(encode(&tree), ANIMALS);
}

#[test]
fn given_rejected_property_when_playing_then_tree_unchanged() {
    let mut tree = animals();
    let (svc, _) = service(&["yes", "yes", "no", "Tiger", "has {stripes}"]);

    let err = svc.play(&mut tree).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NodeAlloc(_))
    ));
    assert_eq!(encode(&tree), ANIMALS);
}

// ============================================================
// teach()
// ============================================================

#[rstest]
#[case("Nothing")]
#[case("Dog")]
#[case("Cat")]
#[case("Lion")]
fn given_any_leaf_when_teaching_then_one_more_subject_and_old_path_grows(#[case] name: &str) {
    let mut tree = animals();
    let leaf = find_leaf(&tree, name).unwrap();
    let before = path_to(&tree, leaf).unwrap();
    let subjects = tree.subjects().len();
    let nodes = tree.len();

    let new = teach(&mut tree, leaf, "Newcomer", "is new").unwrap();

    let after = path_to(&tree, leaf).unwrap();
    assert_eq!(tree.subjects().len(), subjects + 1);
    assert_eq!(tree.len(), nodes + 2);
    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(&after.directions()[..before.len()], before.directions());
    assert_eq!(
        path_to(&tree, new).unwrap().common_prefix_len(&after),
        before.len()
    );
    assert!(verify(&tree).is_ok());
}

#[test]
fn given_many_lessons_when_round_tripping_then_text_is_stable() {
    let mut tree = DecisionTree::with_subject("Nothing", DEFAULT_MAX_VALUE_LEN).unwrap();
    let lessons = [
        ("Nothing", "Cat", "has whiskers"),
        ("Nothing", "Dog", "barks"),
        ("Cat", "Lion", "is large"),
        ("Dog", "Wolf", "is wild"),
        ("Lion", "Tiger", "has stripes"),
    ];
    for (leaf, subject, property) in lessons {
        let leaf = find_leaf(&tree, leaf).unwrap();
        teach(&mut tree, leaf, subject, property).unwrap();
    }

    let text = encode(&tree);
    let reloaded = decode(&text, DEFAULT_MAX_VALUE_LEN).unwrap();

    assert_eq!(encode(&reloaded), text);
    assert_eq!(reloaded.len(), tree.len());
    assert_eq!(reloaded.subjects(), tree.subjects());
    assert!(verify(&reloaded).is_ok());
}

// ============================================================
// describe() / compare()
// ============================================================

#[rstest]
#[case("Nothing", "not has whiskers → not barks → Nothing")]
#[case("Dog", "not has whiskers → barks → Dog")]
#[case("Lion", "has whiskers → is large → Lion")]
fn given_subject_when_describing_then_questions_in_order(
    #[case] name: &str,
    #[case] expected: &str,
) {
    assert_eq!(describe(&animals(), name).unwrap().to_string(), expected);
}

#[test]
fn given_unknown_subject_when_describing_then_unknown_subject_error() {
    let err = describe(&animals(), "Unicorn").unwrap_err();
    assert!(matches!(err, ApplicationError::UnknownSubject(ref s) if s == "Unicorn"));
}

#[test]
fn given_empty_tree_when_comparing_then_empty_knowledge_base() {
    let err = compare(&DecisionTree::new(), "Cat", "Dog").unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::EmptyKnowledgeBase)
    ));
}

#[test]
fn given_siblings_when_comparing_then_shared_prefix_and_split() {
    let cmp = compare(&animals(), "Cat", "Lion").unwrap();

    assert_eq!(
        cmp.to_string(),
        "Cat and Lion both: has whiskers\nCat: not is large\nLion: is large"
    );
}

#[test]
fn given_subjects_on_opposite_sides_when_comparing_then_nothing_in_common() {
    let cmp = compare(&animals(), "Dog", "Cat").unwrap();

    assert!(cmp.common.is_empty());
    assert_eq!(
        cmp.to_string(),
        "Dog and Cat have nothing in common\n\
         Dog: not has whiskers → barks\n\
         Cat: has whiskers → not is large"
    );
}

#[test]
fn given_same_subject_when_comparing_then_no_differences() {
    let cmp = compare(&animals(), "Dog", "Dog").unwrap();

    assert_eq!(cmp.common.len(), 2);
    assert!(cmp.first_only.is_empty() && cmp.second_only.is_empty());
}

#[rstest]
#[case("Nothing", "Dog")]
#[case("Dog", "Lion")]
#[case("Cat", "Lion")]
#[case("Nothing", "Cat")]
fn given_two_subjects_when_comparing_both_ways_then_common_part_is_symmetric(
    #[case] a: &str,
    #[case] b: &str,
) {
    let tree = animals();
    let ab = compare(&tree, a, b).unwrap();
    let ba = compare(&tree, b, a).unwrap();

    assert_eq!(ab.common, ba.common);
    assert_eq!(ab.first_only, ba.second_only);
    assert_eq!(ab.second_only, ba.first_only);
}
