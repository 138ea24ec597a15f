//! Question shapes and the weighted generator that picks the next one.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::data::KanjiRecord;
use crate::words::WordEntry;

/// Options shown for a single-kanji question.
pub const SINGLE_OPTION_COUNT: usize = 4;
/// Tiles shown for a compound question (two correct, two decoys).
pub const COMPOUND_ANSWER_COUNT: usize = 4;

/// Named probabilities for the question mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub drag_word_probability: f64,
    pub compound_probability: f64,
    /// Chance a drag-word uses the 3-tile vertical board.
    pub vertical_layout_probability: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            drag_word_probability: 0.35,
            compound_probability: 0.35,
            vertical_layout_probability: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    Single,
    Compound,
    DragWord,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Compound => "compound",
            QuestionKind::DragWord => "dragword",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleOption {
    pub kanji: char,
    pub meaning: String,
    pub correct: bool,
}

impl SingleOption {
    /// Meaning picture shown on the choice; `meaning` is the fallback text.
    pub fn image_path(&self) -> String {
        crate::cache::meaning_image_path(self.kanji)
    }
}

/// Show a kanji, pick its meaning out of four.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleQuestion {
    pub record: KanjiRecord,
    pub options: Vec<SingleOption>,
}

impl SingleQuestion {
    pub fn correct_index(&self) -> usize {
        self.options.iter().position(|o| o.correct).unwrap_or(0)
    }
}

/// Show a two-kanji word's reading, pick both kanji.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundQuestion {
    pub word: WordEntry,
    pub answers: Vec<char>,
}

impl CompoundQuestion {
    pub fn kana(&self) -> &str {
        &self.word.reading
    }

    pub fn kanji_chars(&self) -> &[char] {
        &self.word.kanji_chars
    }

    /// Answer indices holding a correct kanji.
    pub fn correct_indices(&self) -> Vec<usize> {
        self.answers
            .iter()
            .enumerate()
            .filter(|(_, c)| self.word.kanji_chars.contains(c))
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Three tiles beside the word.
    Vertical,
    /// Four tiles under the word.
    Horizontal,
}

impl Layout {
    pub fn tile_count(self) -> usize {
        match self {
            Layout::Vertical => 3,
            Layout::Horizontal => 4,
        }
    }
}

/// A blank inside the drag-word reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropZone {
    pub id: usize,
    /// `None` marks a kana-only trap zone that accepts no kanji.
    pub expected: Option<char>,
    pub reading: String,
    pub filled: bool,
}

impl DropZone {
    pub fn is_trap(&self) -> bool {
        self.expected.is_none()
    }
}

/// Drag kanji tiles onto the blanks of a word's reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DragWordQuestion {
    pub word: WordEntry,
    pub layout: Layout,
    pub zones: Vec<DropZone>,
    pub answers: Vec<char>,
}

impl DragWordQuestion {
    pub fn kana(&self) -> &str {
        &self.word.reading
    }

    pub fn zone(&self, id: usize) -> Option<&DropZone> {
        self.zones.get(id)
    }

    /// Mark a zone filled; returns `true` when every kanji zone is filled.
    pub fn fill(&mut self, id: usize) -> bool {
        if let Some(zone) = self.zones.get_mut(id) {
            zone.filled = true;
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.zones.iter().filter(|z| !z.is_trap()).all(|z| z.filled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Question {
    Single(SingleQuestion),
    Compound(CompoundQuestion),
    DragWord(DragWordQuestion),
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::Single(_) => QuestionKind::Single,
            Question::Compound(_) => QuestionKind::Compound,
            Question::DragWord(_) => QuestionKind::DragWord,
        }
    }

    /// Label used for this question in the history list.
    pub fn display(&self) -> String {
        match self {
            Question::Single(q) => q.record.id.to_string(),
            Question::Compound(q) => q.word.reading.clone(),
            Question::DragWord(q) => q.word.reading.clone(),
        }
    }

    /// Characters the player can click or drag, in display order.
    pub fn answer_chars(&self) -> Vec<char> {
        match self {
            Question::Single(q) => q.options.iter().map(|o| o.kanji).collect(),
            Question::Compound(q) => q.answers.clone(),
            Question::DragWord(q) => q.answers.clone(),
        }
    }
}

/// What the generator may draw from.
#[derive(Debug, Clone, Copy)]
pub struct QuestionSource<'a> {
    pub pool: &'a [KanjiRecord],
    pub compounds: &'a [WordEntry],
    pub drag_words: &'a [WordEntry],
    pub compound_enabled: bool,
    pub drag_word_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionGenerator {
    config: GeneratorConfig,
}

impl QuestionGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Weighted pick: drag-word first, then compound, else single-kanji.
    ///
    /// Returns `None` only when the pool cannot fill a single-kanji question.
    pub fn pick_next<R: Rng + ?Sized>(&self, rng: &mut R, src: &QuestionSource<'_>) -> Option<Question> {
        if src.drag_word_enabled && !src.drag_words.is_empty() && rng.r#gen::<f64>() < self.config.drag_word_probability {
            if let Some(word) = src.drag_words.choose(rng) {
                let layout = if rng.r#gen::<f64>() < self.config.vertical_layout_probability {
                    Layout::Vertical
                } else {
                    Layout::Horizontal
                };
                log::debug!("picked drag-word question {}", word.surface);
                return Some(build_drag_word(rng, word, src.pool, layout));
            }
        }
        if src.compound_enabled && !src.compounds.is_empty() && rng.r#gen::<f64>() < self.config.compound_probability {
            if let Some(word) = src.compounds.choose(rng) {
                log::debug!("picked compound question {}", word.surface);
                return Some(build_compound(rng, word, src.pool));
            }
        }
        build_single(rng, src.pool)
    }
}

/// One random record plus three distinct wrong records, shuffled.
pub fn build_single<R: Rng + ?Sized>(rng: &mut R, pool: &[KanjiRecord]) -> Option<Question> {
    if pool.len() < SINGLE_OPTION_COUNT {
        return None;
    }
    let record = pool.choose(rng)?;
    let others: Vec<&KanjiRecord> = pool.iter().filter(|k| k.id != record.id).collect();
    let mut options: Vec<SingleOption> = others
        .choose_multiple(rng, SINGLE_OPTION_COUNT - 1)
        .map(|w| SingleOption { kanji: w.id, meaning: w.meaning_key.clone(), correct: false })
        .collect();
    options.push(SingleOption { kanji: record.id, meaning: record.meaning_key.clone(), correct: true });
    options.shuffle(rng);
    Some(Question::Single(SingleQuestion { record: record.clone(), options }))
}

/// Both kanji of `word` plus two decoys from the rest of the pool.
pub fn build_compound<R: Rng + ?Sized>(rng: &mut R, word: &WordEntry, pool: &[KanjiRecord]) -> Question {
    let correct = word.distinct_kanji();
    let decoys = COMPOUND_ANSWER_COUNT.saturating_sub(correct.len());
    let mut answers = correct;
    answers.extend(sample_outside(rng, pool, &answers, decoys));
    answers.shuffle(rng);
    Question::Compound(CompoundQuestion { word: word.clone(), answers })
}

/// Every distinct kanji of `word`, padded with pool kanji to the layout's tile count.
pub fn build_drag_word<R: Rng + ?Sized>(
    rng: &mut R,
    word: &WordEntry,
    pool: &[KanjiRecord],
    layout: Layout,
) -> Question {
    let zones = word
        .segments
        .iter()
        .enumerate()
        .map(|(id, seg)| DropZone { id, expected: seg.kanji_char(), reading: seg.reading.clone(), filled: false })
        .collect();

    let correct = word.distinct_kanji();
    let padding = layout.tile_count().saturating_sub(correct.len());
    let mut answers = correct;
    answers.extend(sample_outside(rng, pool, &answers, padding));
    answers.shuffle(rng);

    Question::DragWord(DragWordQuestion { word: word.clone(), layout, zones, answers })
}

/// Up to `n` distinct pool kanji not in `exclude`, sampled without replacement.
fn sample_outside<R: Rng + ?Sized>(rng: &mut R, pool: &[KanjiRecord], exclude: &[char], n: usize) -> Vec<char> {
    let candidates: Vec<char> = pool.iter().map(|k| k.id).filter(|c| !exclude.contains(c)).collect();
    candidates.choose_multiple(rng, n).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Grade, KanjiStore};
    use crate::words::{WordMeta, demo_word};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn pool(ids: &str) -> Vec<KanjiRecord> {
        let json = format!(
            "[{}]",
            ids.chars().map(|c| format!(r#"{{"kanji":"{c}","grade":1}}"#)).collect::<Vec<_>>().join(",")
        );
        let mut store = KanjiStore::new();
        store.load_grade_json(Grade::new(1).unwrap(), "test", &json).unwrap();
        store.records().to_vec()
    }

    fn compound_word() -> WordEntry {
        let mut w = demo_word();
        w.meta = WordMeta { word: "一人".into(), reading: "ひとり".into(), ..WordMeta::default() };
        w.surface = "一人".into();
        w.reading = "ひとり".into();
        w.kanji_chars = vec!['一', '人'];
        w
    }

    #[test]
    fn single_has_exactly_one_correct_option() {
        let p = pool("一二三四五六");
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let Some(Question::Single(q)) = build_single(&mut rng, &p) else { panic!("expected single") };
            assert_eq!(q.options.len(), 4);
            assert_eq!(q.options.iter().filter(|o| o.correct).count(), 1);
            assert_eq!(q.options[q.correct_index()].kanji, q.record.id);
            let distinct: HashSet<char> = q.options.iter().map(|o| o.kanji).collect();
            assert_eq!(distinct.len(), 4);
        }
    }

    #[test]
    fn single_options_point_at_their_meaning_images() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let Some(Question::Single(q)) = build_single(&mut rng, &pool("一二三四")) else { panic!("expected single") };
        for option in &q.options {
            assert_eq!(option.image_path(), format!("./images/meaning/cartoon/{}.webp", option.kanji));
            assert!(crate::cache::meaning_key(&option.image_path()).is_some());
        }
    }

    #[test]
    fn single_needs_four_records() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(build_single(&mut rng, &pool("一二三")).is_none());
    }

    #[test]
    fn compound_contains_both_kanji_once() {
        let p = pool("一二三四五六人");
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let Question::Compound(q) = build_compound(&mut rng, &compound_word(), &p) else { panic!() };
            assert_eq!(q.answers.len(), 4);
            assert_eq!(q.answers.iter().filter(|c| **c == '一').count(), 1);
            assert_eq!(q.answers.iter().filter(|c| **c == '人').count(), 1);
            assert_eq!(q.correct_indices().len(), 2);
        }
    }

    #[test]
    fn drag_word_tiles_match_layout() {
        let p = pool("女子一二三四");
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for layout in [Layout::Vertical, Layout::Horizontal] {
            let Question::DragWord(q) = build_drag_word(&mut rng, &demo_word(), &p, layout) else { panic!() };
            assert_eq!(q.answers.len(), layout.tile_count());
            assert!(q.answers.contains(&'女') && q.answers.contains(&'子'));
            let distinct: HashSet<char> = q.answers.iter().copied().collect();
            assert_eq!(distinct.len(), q.answers.len());
            assert_eq!(q.zones.len(), 3);
            assert!(q.zones[1].is_trap());
        }
    }

    #[test]
    fn drag_word_completes_when_kanji_zones_filled() {
        let p = pool("女子一二三四");
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let Question::DragWord(mut q) = build_drag_word(&mut rng, &demo_word(), &p, Layout::Horizontal) else {
            panic!()
        };
        assert!(!q.fill(0));
        assert!(q.fill(2));
    }

    #[test]
    fn generator_falls_back_to_single_when_words_disabled() {
        let p = pool("一二三四五六");
        let words = vec![demo_word()];
        let src = QuestionSource {
            pool: &p,
            compounds: &words,
            drag_words: &words,
            compound_enabled: false,
            drag_word_enabled: false,
        };
        let generator = QuestionGenerator::new(GeneratorConfig {
            drag_word_probability: 1.0,
            compound_probability: 1.0,
            vertical_layout_probability: 0.5,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..20 {
            assert_eq!(generator.pick_next(&mut rng, &src).unwrap().kind(), QuestionKind::Single);
        }
    }

    #[test]
    fn generator_honours_certain_probabilities() {
        let p = pool("女子一二三四人");
        let drag = vec![demo_word()];
        let compounds = vec![compound_word()];
        let mut src = QuestionSource {
            pool: &p,
            compounds: &compounds,
            drag_words: &drag,
            compound_enabled: true,
            drag_word_enabled: true,
        };
        let always = QuestionGenerator::new(GeneratorConfig {
            drag_word_probability: 1.0,
            compound_probability: 1.0,
            vertical_layout_probability: 1.0,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let q = always.pick_next(&mut rng, &src).unwrap();
        assert!(matches!(q, Question::DragWord(DragWordQuestion { layout: Layout::Vertical, .. })));

        src.drag_word_enabled = false;
        assert_eq!(always.pick_next(&mut rng, &src).unwrap().kind(), QuestionKind::Compound);
    }
}
