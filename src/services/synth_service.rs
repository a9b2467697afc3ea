//! Local question synthesis used when the remote model is unavailable.
//!
//! Every question is grounded in a sentence of the source text. Sentence and
//! answer selection is a pure function of the input: ties are broken by
//! document order and the only randomness is the shuffling of
//! multiple-choice options, which never loses track of the correct answer.

use crate::dto::quiz_dto::CreateQuestion;
use crate::models::question::Difficulty;
use crate::models::quiz_session::GenerationParams;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

const MIN_SENTENCE_WORDS: usize = 5;
const MAX_SENTENCE_WORDS: usize = 40;
const MIN_TERM_CHARS: usize = 4;
const MAX_KEY_TERMS: usize = 30;
const DISTRACTOR_COUNT: usize = 3;
const BLANK: &str = "_____";
const TRUE_STATEMENT_PROBABILITY: f64 = 0.5;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "day", "get", "has", "him", "his", "how", "its", "may", "new", "now", "old",
    "see", "two", "who", "did", "she", "use", "way", "when", "what", "with", "this", "that",
    "have", "from", "they", "know", "want", "been", "good", "much", "some", "time", "very",
    "were", "will", "your", "about", "after", "before", "other", "right", "their", "there",
    "these", "which", "would", "could", "should", "also", "into", "than", "then", "them",
    "only", "such", "more", "most", "many", "each", "over", "under", "between", "through",
    "during", "while", "where", "because", "being", "does", "just", "like", "made", "make",
    "well", "within", "without", "those", "here", "both", "either", "neither", "upon", "onto",
    "among", "across", "against", "along", "around", "often", "usually", "however",
    "therefore", "thus", "although", "though", "since", "until", "unless", "whether", "every",
    "another", "others", "same", "less", "least", "even", "still", "almost", "already",
    "always", "never", "something", "anything", "everything", "nothing", "someone", "anyone",
    "everyone", "itself", "themselves", "yourself", "himself", "herself", "whose", "whom",
    "what's", "it's", "that's", "there's", "let's", "can't", "don't", "doesn't", "isn't",
    "aren't", "wasn't", "weren't", "won't", "shall", "might", "must", "once", "again", "further",
    "above", "below", "next", "last", "several", "various", "called", "known", "used", "using",
    "include", "includes", "including", "around", "towards", "toward", "whereas", "yet", "per",
];

const AUXILIARIES: &[&str] = &[
    "is", "are", "was", "were", "can", "will", "has", "have", "had", "does", "do", "did",
    "should", "could", "would", "must", "may", "might",
];

const PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "of", "to", "by", "for", "with", "from", "into", "about", "than",
];

const ABBREVIATIONS: &[&str] = &["mr", "mrs", "ms", "dr", "prof", "st", "vs", "etc", "e.g", "i.e", "jr", "sr"];

#[derive(Debug, Clone)]
struct Token {
    key: String,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
struct Sentence {
    position: usize,
    text: String,
    tokens: Vec<Token>,
}

impl Sentence {
    fn new(position: usize, text: String) -> Self {
        let tokens = tokenize(&text);
        Self {
            position,
            text,
            tokens,
        }
    }

    fn contains_key(&self, key: &str) -> bool {
        self.tokens.iter().any(|t| t.key == key)
    }

    fn surface(&self, token: &Token) -> &str {
        &self.text[token.start..token.end]
    }

    fn is_statement(&self) -> bool {
        !self.text.trim_end().ends_with('?')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermCategory {
    Numeric,
    Proper,
    Common,
}

#[derive(Debug, Clone)]
struct Term {
    key: String,
    display: String,
    frequency: usize,
    first_seen: usize,
    capitalized: bool,
    /// Indices into the eligible sentence list, document order, no repeats.
    sentences: Vec<usize>,
}

impl Term {
    fn category(&self) -> TermCategory {
        if self.key.chars().all(|c| c.is_ascii_digit()) {
            TermCategory::Numeric
        } else if self.capitalized {
            TermCategory::Proper
        } else {
            TermCategory::Common
        }
    }

    fn score(&self) -> usize {
        self.frequency * 10
            + self.key.chars().count().min(12)
            + if self.capitalized { 8 } else { 0 }
    }

    fn char_len(&self) -> usize {
        self.key.chars().count()
    }
}

/// Sentences and ranked terms derived from one source text.
struct Analysis {
    sentences: Vec<Sentence>,
    key_terms: Vec<Term>,
    /// Content words that did not qualify as key terms; backfill for
    /// distractors.
    vocabulary: Vec<Term>,
}

impl Analysis {
    fn new(text: &str) -> Self {
        let sentences: Vec<Sentence> = split_sentences(text)
            .into_iter()
            .filter(|s| {
                let words = tokenize(s).len();
                (MIN_SENTENCE_WORDS..=MAX_SENTENCE_WORDS).contains(&words)
            })
            .enumerate()
            .map(|(i, s)| Sentence::new(i, s))
            .collect();

        let mut terms: HashMap<String, Term> = HashMap::new();
        let mut seen = 0usize;
        for sentence in &sentences {
            for (idx, token) in sentence.tokens.iter().enumerate() {
                seen += 1;
                if token.key.chars().count() < MIN_TERM_CHARS || STOP_WORDS.contains(&token.key.as_str()) {
                    continue;
                }
                let surface = sentence.surface(token);
                let mid_capital = idx > 0 && surface.chars().next().is_some_and(char::is_uppercase);
                let term = terms.entry(token.key.clone()).or_insert_with(|| Term {
                    key: token.key.clone(),
                    display: token.key.clone(),
                    frequency: 0,
                    first_seen: seen,
                    capitalized: false,
                    sentences: Vec::new(),
                });
                term.frequency += 1;
                if mid_capital && !term.capitalized {
                    term.capitalized = true;
                    term.display = surface.to_string();
                }
                if term.sentences.last() != Some(&sentence.position) {
                    term.sentences.push(sentence.position);
                }
            }
        }

        let mut ranked: Vec<Term> = terms.into_values().collect();
        ranked.sort_by_key(|t| (Reverse(t.score()), t.first_seen));

        let (mut key_terms, vocabulary): (Vec<Term>, Vec<Term>) = ranked
            .into_iter()
            .partition(|t| t.frequency >= 2 || t.capitalized);
        key_terms.truncate(MAX_KEY_TERMS);

        Self {
            sentences,
            key_terms,
            vocabulary,
        }
    }

    /// Content words of every sentence the term appears in, minus the term.
    fn context(&self, term: &Term) -> HashSet<&str> {
        term.sentences
            .iter()
            .flat_map(|i| self.sentences[*i].tokens.iter())
            .map(|t| t.key.as_str())
            .filter(|k| *k != term.key && k.chars().count() >= MIN_TERM_CHARS && !STOP_WORDS.contains(k))
            .collect()
    }

    /// Up to `DISTRACTOR_COUNT` wrong options for `answer`, key terms first,
    /// then other content words. Ordering depends on difficulty: hard prefers
    /// same-category terms from similar contexts, easy prefers unrelated ones.
    fn distractors(&self, answer: &Term, sentence: &Sentence, difficulty: Difficulty) -> Vec<String> {
        let answer_ctx = self.context(answer);
        let answer_category = answer.category();
        let mut picked: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);

        for pool in [&self.key_terms, &self.vocabulary] {
            let mut candidates: Vec<(usize, &Term, usize)> = pool
                .iter()
                .enumerate()
                .filter(|(_, c)| {
                    c.key != answer.key
                        && !sentence.contains_key(&c.key)
                        && !similar_spelling(&c.key, &answer.key)
                })
                .map(|(rank, c)| {
                    let overlap = self.context(c).intersection(&answer_ctx).count();
                    (rank, c, overlap)
                })
                .collect();

            candidates.sort_by_key(|(rank, c, overlap)| {
                let different_category = c.category() != answer_category;
                let len_diff = c.char_len().abs_diff(answer.char_len());
                match difficulty {
                    Difficulty::Hard => (different_category as usize, usize::MAX - overlap, len_diff, *rank),
                    Difficulty::Medium => (different_category as usize, len_diff, 0, *rank),
                    Difficulty::Easy => (*overlap, !different_category as usize, 0, *rank),
                }
            });

            for (_, candidate, _) in candidates {
                if picked.len() == DISTRACTOR_COUNT {
                    return picked;
                }
                let clashes = picked
                    .iter()
                    .chain(std::iter::once(&answer.display))
                    .any(|p| p.eq_ignore_ascii_case(&candidate.display) || similar_spelling(&p.to_lowercase(), &candidate.key));
                if !clashes {
                    picked.push(candidate.display.clone());
                }
            }
        }

        picked
    }

    /// A false variant of the sentence: swap its best-ranked key term for a
    /// comparable one, otherwise flip the first auxiliary verb's negation.
    fn falsify(&self, sentence: &Sentence) -> Option<String> {
        let present = self
            .key_terms
            .iter()
            .find(|t| sentence.contains_key(&t.key));

        if let Some(term) = present {
            let replacement = self
                .key_terms
                .iter()
                .filter(|c| {
                    c.key != term.key
                        && !sentence.contains_key(&c.key)
                        && !similar_spelling(&c.key, &term.key)
                })
                .min_by_key(|c| {
                    (
                        (c.category() != term.category()) as usize,
                        c.char_len().abs_diff(term.char_len()),
                    )
                });
            if let Some(replacement) = replacement {
                return Some(replace_term(sentence, &term.key, |original| {
                    match_case(&replacement.display, original)
                }));
            }
        }

        negate(sentence)
    }
}

#[derive(Clone, Debug, Default)]
pub struct LocalSynthesizer;

impl LocalSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Produces up to the requested counts, multiple-choice first. Returns
    /// fewer (possibly none, for degenerate input) when the text runs out of
    /// usable sentences or terms.
    pub fn generate_local<R: Rng + ?Sized>(
        &self,
        text: &str,
        params: &GenerationParams,
        rng: &mut R,
    ) -> Vec<CreateQuestion> {
        let analysis = Analysis::new(text);
        let mut used_sentences: HashSet<usize> = HashSet::new();
        let mut used_answers: HashSet<&str> = HashSet::new();
        let mut questions = Vec::with_capacity(params.mc_count + params.tf_count);

        let mut mc_made = 0usize;
        for term in &analysis.key_terms {
            if mc_made == params.mc_count {
                break;
            }
            if used_answers.contains(term.key.as_str()) {
                continue;
            }
            let Some(sentence) = term
                .sentences
                .iter()
                .map(|i| &analysis.sentences[*i])
                .find(|s| !used_sentences.contains(&s.position))
            else {
                continue;
            };

            let distractors = analysis.distractors(term, sentence, params.difficulty);
            if distractors.len() < DISTRACTOR_COUNT {
                continue;
            }

            let mut options = Vec::with_capacity(DISTRACTOR_COUNT + 1);
            options.push(term.display.clone());
            options.extend(distractors);
            options.shuffle(rng);
            let correct_index = options
                .iter()
                .position(|o| *o == term.display)
                .unwrap_or_default();

            let stem = replace_term(sentence, &term.key, |_| BLANK.to_string());
            questions.push(CreateQuestion::multiple_choice(
                format!("Fill in the blank: {}", stem),
                options,
                correct_index,
                Some(format!("The source states: \"{}\"", sentence.text)),
                params.difficulty,
            ));

            used_sentences.insert(sentence.position);
            used_answers.insert(term.key.as_str());
            mc_made += 1;
        }

        let mut tf_made = 0usize;
        for sentence in &analysis.sentences {
            if tf_made == params.tf_count {
                break;
            }
            if used_sentences.contains(&sentence.position) || !sentence.is_statement() {
                continue;
            }

            let (statement, answer) = if wants_true_statement(sentence) {
                (sentence.text.clone(), true)
            } else {
                match analysis.falsify(sentence) {
                    Some(altered) => (altered, false),
                    None => (sentence.text.clone(), true),
                }
            };

            let explanation = if answer {
                format!("The source states: \"{}\"", sentence.text)
            } else {
                format!("The source actually states: \"{}\"", sentence.text)
            };

            questions.push(CreateQuestion::true_false(
                statement,
                answer,
                Some(explanation),
                params.difficulty,
            ));
            used_sentences.insert(sentence.position);
            tf_made += 1;
        }

        tracing::info!(
            sentences = analysis.sentences.len(),
            key_terms = analysis.key_terms.len(),
            multiple_choice = mc_made,
            true_false = tf_made,
            "Local synthesis finished"
        );

        questions
    }
}

/// Seeded from the sentence itself so the same input always yields the same
/// truth value.
fn wants_true_statement(sentence: &Sentence) -> bool {
    let seed = (sentence.position as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (sentence.text.len() as u64)
        ^ ((sentence.tokens.len() as u64) << 32);
    StdRng::seed_from_u64(seed).gen_bool(TRUE_STATEMENT_PROBABILITY)
}

/// Splits on blank lines, then on `.`, `!` or `?` followed by whitespace.
/// Single line breaks inside a block are folded into spaces.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for block in text.split("\n\n") {
        let block = block.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars: Vec<char> = block.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            current.push(c);
            if !matches!(c, '.' | '!' | '?') {
                continue;
            }
            let at_boundary = match chars.get(i + 1) {
                None => true,
                Some(next) => next.is_whitespace(),
            };
            if at_boundary && !(c == '.' && ends_with_abbreviation(&current)) {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                current.clear();
            }
        }

        let rest = current.trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
    }

    sentences
}

fn ends_with_abbreviation(current: &str) -> bool {
    let last_word = current
        .trim_end_matches('.')
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let single_initial = last_word.chars().count() == 1 && last_word.chars().all(char::is_alphabetic);
    single_initial || ABBREVIATIONS.contains(&last_word.as_str())
}

/// Alphanumeric runs, allowing inner apostrophes and hyphens.
fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].1.is_alphanumeric() {
            i += 1;
            continue;
        }
        let start = chars[i].0;
        let mut j = i + 1;
        while j < chars.len() {
            let c = chars[j].1;
            let joins = matches!(c, '\'' | '-' | '\u{2019}')
                && chars.get(j + 1).is_some_and(|(_, n)| n.is_alphanumeric());
            if c.is_alphanumeric() || joins {
                j += 1;
            } else {
                break;
            }
        }
        let end = chars.get(j).map(|(pos, _)| *pos).unwrap_or(text.len());
        tokens.push(Token {
            key: text[start..end].to_lowercase(),
            start,
            end,
        });
        i = j;
    }

    tokens
}

fn similar_spelling(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.chars().count() >= MIN_TERM_CHARS && long.starts_with(short) && long.len() - short.len() <= 3
}

/// Rewrites every occurrence of `key` in the sentence.
fn replace_term(sentence: &Sentence, key: &str, mut with: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(sentence.text.len());
    let mut cursor = 0;
    for token in sentence.tokens.iter().filter(|t| t.key == key) {
        out.push_str(&sentence.text[cursor..token.start]);
        out.push_str(&with(sentence.surface(token)));
        cursor = token.end;
    }
    out.push_str(&sentence.text[cursor..]);
    out
}

fn match_case(replacement: &str, original: &str) -> String {
    let starts_upper = original.chars().next().is_some_and(char::is_uppercase);
    if !starts_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Toggles "not" after the first auxiliary verb that follows a subject.
/// Capitalised words ("May", "Will") are names, not verbs.
fn negate(sentence: &Sentence) -> Option<String> {
    let tokens = &sentence.tokens;
    let aux_idx = (1..tokens.len()).find(|&i| {
        let t = &tokens[i];
        AUXILIARIES.contains(&t.key.as_str())
            && !sentence.surface(t).starts_with(char::is_uppercase)
            && !PREPOSITIONS.contains(&tokens[i - 1].key.as_str())
    })?;
    let aux = &tokens[aux_idx];

    match tokens.get(aux_idx + 1) {
        Some(next) if next.key == "not" => {
            let text = &sentence.text;
            Some(format!("{}{}", &text[..aux.end], &text[next.end..]))
        }
        _ => {
            let text = &sentence.text;
            Some(format!("{} not{}", &text[..aux.end], &text[aux.end..]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators_but_not_initials_or_decimals() {
        let text = "Pi is about 3.14 in value. J. Smith wrote it!\nIs it true? Yes";
        let sentences = split_sentences(text);
        assert_eq!(
            sentences,
            vec![
                "Pi is about 3.14 in value.",
                "J. Smith wrote it!",
                "Is it true?",
                "Yes"
            ]
        );
    }

    #[test]
    fn tokenizer_keeps_inner_hyphens_and_apostrophes() {
        let keys: Vec<String> = tokenize("Earth's well-known orbit -- fast.")
            .into_iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, vec!["earth's", "well-known", "orbit", "fast"]);
    }

    #[test]
    fn negation_toggles_first_auxiliary() {
        let s = Sentence::new(0, "The river is wide and deep.".to_string());
        assert_eq!(negate(&s).as_deref(), Some("The river is not wide and deep."));

        let s = Sentence::new(0, "The river was not always this wide.".to_string());
        assert_eq!(negate(&s).as_deref(), Some("The river was always this wide."));
    }

    #[test]
    fn negation_skips_names_that_look_like_auxiliaries() {
        let s = Sentence::new(0, "In May the heavy rains finally reach the quiet valley.".to_string());
        assert_eq!(negate(&s), None);

        let s = Sentence::new(0, "Will Smith starred in many popular films.".to_string());
        assert_eq!(negate(&s), None);

        let s = Sentence::new(0, "In May the rivers are full of fresh snowmelt.".to_string());
        assert_eq!(
            negate(&s).as_deref(),
            Some("In May the rivers are not full of fresh snowmelt.")
        );
    }

    #[test]
    fn match_case_follows_original_capitalisation() {
        assert_eq!(match_case("mitochondria", "Chloroplasts"), "Mitochondria");
        assert_eq!(match_case("mitochondria", "chloroplasts"), "mitochondria");
    }
}
