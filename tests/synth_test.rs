use quiz_backend::dto::quiz_dto::CreateQuestion;
use quiz_backend::models::question::{Difficulty, QuestionKind};
use quiz_backend::models::quiz_session::GenerationParams;
use quiz_backend::services::synth_service::LocalSynthesizer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use validator::Validate;

/// About sixty words with three repeated terms: photosynthesis,
/// chloroplasts and pigment.
const PASSAGE: &str = "Photosynthesis happens inside chloroplasts found in green plant cells. \
Chloroplasts capture sunlight using a special pigment. The pigment absorbs red and blue light very strongly. \
Photosynthesis then releases fresh oxygen into the surrounding air. Gardeners usually water their tomato \
seedlings early every summer morning. Healthy soil gives roots steady nutrients and moisture throughout long \
growing seasons. Bees carry pollen between flowers on warm afternoons.";

const HISTORY: &str = "The Roman Empire built roads across Europe to move soldiers quickly. \
Julius Caesar crossed the Rubicon river with his army in 49 BC. \
The Senate feared that Caesar would become a king and rule alone. \
Augustus became the first emperor after years of civil war. \
Roman engineers designed aqueducts that carried water into growing cities. \
The aqueducts used gravity to move water over long distances. \
Latin was the language of law and government throughout the Empire. \
Merchants traded olive oil, wine and grain in busy Mediterranean ports.";

fn params(mc: usize, tf: usize, difficulty: Difficulty) -> GenerationParams {
    GenerationParams {
        mc_count: mc,
        tf_count: tf,
        difficulty,
    }
}

fn correct(q: &CreateQuestion) -> &str {
    &q.options[q.correct_index]
}

#[test]
fn returns_only_as_many_questions_as_key_terms_allow() {
    let synth = LocalSynthesizer::new();
    let mut rng = StdRng::seed_from_u64(42);
    let questions = synth.generate_local(PASSAGE, &params(5, 0, Difficulty::Medium), &mut rng);

    assert!(!questions.is_empty());
    assert!(questions.len() <= 3, "got {} questions", questions.len());
    for q in &questions {
        assert_eq!(q.kind, QuestionKind::MultipleChoice);
        assert!(q.validate().is_ok(), "invalid question: {:?}", q);
    }
}

#[test]
fn selection_is_deterministic_across_shuffles() {
    let synth = LocalSynthesizer::new();
    let p = params(4, 3, Difficulty::Hard);

    let first = synth.generate_local(HISTORY, &p, &mut StdRng::seed_from_u64(1));
    let second = synth.generate_local(HISTORY, &p, &mut StdRng::seed_from_u64(99));

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.prompt, b.prompt);
        assert_eq!(correct(a), correct(b));
        assert_eq!(a.explanation, b.explanation);
    }
}

#[test]
fn distractors_never_repeat_the_answer() {
    let synth = LocalSynthesizer::new();
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        let questions =
            synth.generate_local(HISTORY, &params(6, 0, difficulty), &mut StdRng::seed_from_u64(7));
        assert!(!questions.is_empty());
        for q in &questions {
            assert_eq!(q.options.len(), 4);
            let answer = correct(q).to_lowercase();
            let repeats = q
                .options
                .iter()
                .filter(|o| o.to_lowercase() == answer)
                .count();
            assert_eq!(repeats, 1, "{:?}", q.options);
            assert!(q.prompt.contains("_____"));
            assert!(!q.prompt.to_lowercase().contains(&answer));
        }
    }
}

#[test]
fn questions_do_not_share_source_sentences() {
    let synth = LocalSynthesizer::new();
    let questions = synth.generate_local(
        HISTORY,
        &params(4, 4, Difficulty::Medium),
        &mut StdRng::seed_from_u64(3),
    );

    let mut explanations: Vec<&str> = questions
        .iter()
        .filter_map(|q| q.explanation.as_deref())
        .map(|e| e.split_once('"').map(|(_, s)| s).unwrap_or(e))
        .collect();
    let total = explanations.len();
    explanations.sort();
    explanations.dedup();
    assert_eq!(explanations.len(), total);
}

#[test]
fn true_statements_quote_the_source() {
    let synth = LocalSynthesizer::new();
    let questions = synth.generate_local(
        HISTORY,
        &params(0, 6, Difficulty::Medium),
        &mut StdRng::seed_from_u64(5),
    );

    assert!(!questions.is_empty());
    for q in &questions {
        assert_eq!(q.kind, QuestionKind::TrueFalse);
        assert!(q.validate().is_ok());
        if q.correct_index == 0 {
            assert!(HISTORY.contains(q.prompt.as_str()), "not verbatim: {}", q.prompt);
        } else {
            assert!(!HISTORY.contains(q.prompt.as_str()), "false statement is verbatim: {}", q.prompt);
        }
    }
}

#[test]
fn degenerate_text_yields_nothing() {
    let synth = LocalSynthesizer::new();
    let questions = synth.generate_local(
        "Yes. No. Maybe so. Fine then. Okay. Right.",
        &params(3, 3, Difficulty::Easy),
        &mut StdRng::seed_from_u64(0),
    );
    assert!(questions.is_empty());
}

#[test]
fn month_and_name_words_are_not_negated() {
    let text = "In May the heavy rains finally reach the quiet valley. \
Will Smith starred in many popular films during the nineties. \
In June the farmers harvest wheat across the wide valley. \
The valley rivers flood the lower farms every spring season.";
    let synth = LocalSynthesizer::new();
    for seed in 0..4 {
        let questions = synth.generate_local(
            text,
            &params(0, 5, Difficulty::Medium),
            &mut StdRng::seed_from_u64(seed),
        );
        for q in &questions {
            assert!(!q.prompt.contains("May not"), "{}", q.prompt);
            assert!(!q.prompt.contains("Will not"), "{}", q.prompt);
        }
    }
}
