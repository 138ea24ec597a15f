//! Property tests for question generation and the session counters.
//!
//! Invariants checked:
//! - single-kanji questions have four distinct options, exactly one correct
//! - compound questions hold both kanji of the word among four distinct tiles,
//!   the other two drawn from the pool
//! - drag-word tiles fill the layout, cover every kanji segment, and zones
//!   mirror the segments
//! - history stays bounded with the newest entry first
//! - the HUD never shows negative lives

use std::collections::HashSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use kanji_snap::data::{Grade, KanjiRecord, KanjiStore, PrefetchedGrades};
use kanji_snap::question::{GeneratorConfig, Layout, Question, QuestionGenerator, QuestionSource};
use kanji_snap::view::Hud;
use kanji_snap::{GameConfig, QuizContext, RecordingView, Session, Settings, WordIndex};

const KANJI: &str = "一二三四五六七八九十人女子日月";

const WORDS: &str = "\
frequency,word,reading,reading_segments,meaning_en,meaning_en_custom,part,frequency_band,age_band,grade
1,一人,ひとり,一:ひと|人:り,one person,,noun,,,
1,二人,ふたり,二:ふた|人:り,two people,,noun,,,
1,女の子,おんなのこ,女:おんな|の|子:こ,girl,,noun,,,
1,日曜日,にちようび,日:にち|曜:よう|日:び,sunday,,noun,,,
1,三日月,みかづき,三:み|日:か|月:づき,crescent moon,,noun,,,
1,十日,とおか,十:とお|日:か,tenth day,,noun,,,
";

fn grade_one() -> Grade {
    Grade::new(1).unwrap()
}

fn store(size: usize) -> KanjiStore {
    let json = format!(
        "[{}]",
        KANJI
            .chars()
            .take(size)
            .map(|c| format!(r#"{{"kanji":"{c}","grade":1,"meaning_hira":"m{c}"}}"#))
            .collect::<Vec<_>>()
            .join(",")
    );
    let mut store = KanjiStore::new();
    store.load_grade_json(grade_one(), "grade-1.json", &json).unwrap();
    store
}

fn pool(size: usize) -> Vec<KanjiRecord> {
    store(size).records().to_vec()
}

/// Pool of the first `size` kanji and the word index built over it.
fn indexed(size: usize) -> (Vec<KanjiRecord>, WordIndex) {
    let store = store(size);
    let mut index = WordIndex::new();
    index.load_csv(WORDS).unwrap();
    index.rebuild_for_grades(&[grade_one()], &store);
    (store.records().to_vec(), index)
}

fn generator(drag: f64, compound: f64) -> QuestionGenerator {
    QuestionGenerator::new(GeneratorConfig {
        drag_word_probability: drag,
        compound_probability: compound,
        ..GeneratorConfig::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn single_questions_are_well_formed(seed in any::<u64>(), size in 4usize..=15) {
        let pool = pool(size);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let src = QuestionSource {
            pool: &pool,
            compounds: &[],
            drag_words: &[],
            compound_enabled: true,
            drag_word_enabled: true,
        };
        let Some(Question::Single(q)) = generator(0.0, 0.0).pick_next(&mut rng, &src) else {
            panic!("expected a single question");
        };
        prop_assert_eq!(q.options.len(), 4);
        prop_assert_eq!(q.options.iter().filter(|o| o.correct).count(), 1);
        let correct = &q.options[q.correct_index()];
        prop_assert_eq!(correct.kanji, q.record.id);
        prop_assert_eq!(&correct.meaning, &q.record.meaning_key);
        let distinct: HashSet<char> = q.options.iter().map(|o| o.kanji).collect();
        prop_assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn compound_questions_hold_both_kanji(seed in any::<u64>(), size in 11usize..=15) {
        let (pool, mut index) = indexed(size);
        let compounds = index.eligible_compound_words(&pool).to_vec();
        prop_assert!(!compounds.is_empty());

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let src = QuestionSource {
            pool: &pool,
            compounds: &compounds,
            drag_words: &[],
            compound_enabled: true,
            drag_word_enabled: false,
        };
        let Some(Question::Compound(q)) = generator(0.0, 1.0).pick_next(&mut rng, &src) else {
            panic!("expected a compound question");
        };
        prop_assert_eq!(q.answers.len(), 4);
        let distinct: HashSet<char> = q.answers.iter().copied().collect();
        prop_assert_eq!(distinct.len(), 4);
        prop_assert_eq!(q.correct_indices().len(), 2);
        for c in q.kanji_chars() {
            prop_assert!(q.answers.contains(c));
        }
        let ids: HashSet<char> = pool.iter().map(|k| k.id).collect();
        let decoys: Vec<char> = q.answers.iter().copied().filter(|c| !q.kanji_chars().contains(c)).collect();
        prop_assert_eq!(decoys.len(), 2);
        for c in decoys {
            prop_assert!(ids.contains(&c));
        }
    }

    #[test]
    fn drag_word_tiles_cover_every_segment(seed in any::<u64>(), size in 12usize..=15) {
        let (pool, mut index) = indexed(size);
        let drag_words = index.eligible_drag_words(&pool).to_vec();
        prop_assert!(!drag_words.is_empty());

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let src = QuestionSource {
            pool: &pool,
            compounds: &[],
            drag_words: &drag_words,
            compound_enabled: false,
            drag_word_enabled: true,
        };
        let Some(Question::DragWord(q)) = generator(1.0, 0.0).pick_next(&mut rng, &src) else {
            panic!("expected a drag-word question");
        };
        let needed = q.word.distinct_kanji();
        prop_assert_eq!(q.answers.len(), q.layout.tile_count());
        let distinct: HashSet<char> = q.answers.iter().copied().collect();
        prop_assert_eq!(distinct.len(), q.answers.len());
        for c in &needed {
            prop_assert!(q.answers.contains(c));
        }

        prop_assert_eq!(q.zones.len(), q.word.segments.len());
        for (zone, seg) in q.zones.iter().zip(&q.word.segments) {
            prop_assert_eq!(zone.expected, seg.kanji_char());
            prop_assert_eq!(zone.is_trap(), seg.is_kana());
            prop_assert!(!zone.filled);
        }
        prop_assert!(matches!(q.layout, Layout::Vertical | Layout::Horizontal));
    }

    #[test]
    fn history_is_bounded_and_newest_first(seed in any::<u64>(), answers in proptest::collection::vec(any::<bool>(), 1..30)) {
        let config = GameConfig {
            start_lives: 1000,
            generator: GeneratorConfig { drag_word_probability: 0.0, compound_probability: 0.0, ..Default::default() },
            ..GameConfig::default()
        };
        let mut ctx = QuizContext::new(config, Settings::default());
        let mut source = PrefetchedGrades::default();
        let grade_one = pool(8).iter().map(|r| r.raw.to_string()).collect::<Vec<_>>().join(",");
        source.insert(Grade::new(1).unwrap(), format!("[{grade_one}]"));
        let mut view = RecordingView::new();
        let mut session = Session::new(ChaCha8Rng::seed_from_u64(seed));
        session.start_game(&mut ctx, &mut source, &mut view).unwrap();

        for &right in &answers {
            let Some(Question::Single(q)) = session.question() else { panic!("expected single") };
            let idx = if right { q.correct_index() } else { (q.correct_index() + 1) % 4 };
            session.choose_option(idx, &mut view).unwrap();
            let history = session.history().entries();
            prop_assert!(history.len() <= 8);
            prop_assert_eq!(history[0].ok, right);
            let (timer, _) = view.last_scheduled().unwrap();
            session.on_timer(timer, &mut view);
        }
        prop_assert_eq!(session.history().len(), answers.len().min(8));
        let newest: Vec<bool> = session.history().entries().iter().map(|e| e.ok).collect();
        let expected: Vec<bool> = answers.iter().rev().take(8).copied().collect();
        prop_assert_eq!(newest, expected);
    }

    #[test]
    fn hud_never_shows_negative_lives(lives in -100i32..100, score in 0i32..1000, peek in any::<bool>()) {
        let hud = Hud::new(lives, score, peek);
        prop_assert!(hud.lives_display >= 0);
        prop_assert_eq!(hud.lives_display, lives.max(0));
        prop_assert_eq!(hud.score, score);
    }
}
