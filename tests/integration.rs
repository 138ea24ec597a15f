// Integration tests (native) for the `kanji-snap` crate.
// A full game is driven through the public API with a RecordingView standing
// in for the DOM, so everything here runs under `cargo test` on the host.

use kanji_snap::data::{Grade, PrefetchedGrades};
use kanji_snap::drag::{DropOutcome, Rect, ZoneLayout};
use kanji_snap::question::{GeneratorConfig, Question};
use kanji_snap::session::{Phase, TimerKind};
use kanji_snap::view::{Verdict, ViewCall};
use kanji_snap::{GameConfig, InputError, QuizContext, RecordingView, Session, Settings, StartError, Tab};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const NUMBERS: &str = r#"[
    {"kanji":"一","grade":1,"meaning_hira":"いち"},
    {"kanji":"二","grade":1,"meaning_hira":"に"},
    {"kanji":"三","grade":1,"meaning_hira":"さん"},
    {"kanji":"四","grade":1,"meaning_hira":"よん"},
    {"kanji":"五","grade":1,"meaning_hira":"ご"},
    {"kanji":"六","grade":1,"meaning_hira":"ろく"}
]"#;

const GIRL: &str = r#"[
    {"kanji":"女","grade":1,"meaning_hira":"おんな",
     "words":[{"word":"女の子","reading":"おんなのこ","reading_segments":"女:おんな|の|子:こ"}]},
    {"kanji":"子","grade":1,"meaning_hira":"こ"},
    {"kanji":"一","grade":1,"meaning_hira":"いち"},
    {"kanji":"二","grade":1,"meaning_hira":"に"},
    {"kanji":"三","grade":1,"meaning_hira":"さん"},
    {"kanji":"四","grade":1,"meaning_hira":"よん"}
]"#;

struct Game {
    session: Session<ChaCha8Rng>,
    view: RecordingView,
}

fn start(grade_one: &str, config: GameConfig, seed: u64) -> Result<Game, StartError> {
    let mut ctx = QuizContext::new(config, Settings::default());
    let mut source = PrefetchedGrades::default();
    source.insert(Grade::new(1).unwrap(), grade_one.to_owned());
    let mut game = Game { session: Session::new(ChaCha8Rng::seed_from_u64(seed)), view: RecordingView::new() };
    game.session.start_game(&mut ctx, &mut source, &mut game.view)?;
    Ok(game)
}

fn drag_only() -> GameConfig {
    GameConfig {
        generator: GeneratorConfig { drag_word_probability: 1.0, compound_probability: 0.0, ..Default::default() },
        ..GameConfig::default()
    }
}

impl Game {
    fn correct_index(&self) -> usize {
        match self.session.question() {
            Some(Question::Single(q)) => q.correct_index(),
            other => panic!("expected a single question, got {other:?}"),
        }
    }

    fn answer(&mut self, right: bool) {
        let correct = self.correct_index();
        let idx = if right { correct } else { (correct + 1) % 4 };
        assert_eq!(self.session.choose_option(idx, &mut self.view), Ok(right));
    }

    fn fire_last_timer(&mut self) -> bool {
        let (timer, _) = self.view.last_scheduled().expect("a timer was scheduled");
        self.session.on_timer(timer, &mut self.view)
    }

    fn tile_of(&self, kanji: char) -> usize {
        let Some(Question::DragWord(q)) = self.session.question() else { panic!("expected a drag-word") };
        q.answers.iter().position(|c| *c == kanji).expect("tile present")
    }
}

// Zones laid out left to right, 100px wide.
fn zones() -> ZoneLayout {
    (0..3).map(|i| (i, Rect::new(i as f64 * 100.0, 0.0, 100.0, 50.0))).collect()
}

// A 40x20 proxy centered over zone `i`.
fn proxy_over(i: usize) -> Rect {
    Rect::new(i as f64 * 100.0 + 30.0, 15.0, 40.0, 20.0)
}

#[test]
fn start_shows_a_single_question_from_the_pool() {
    let game = start(NUMBERS, GameConfig::default(), 1).unwrap();
    let Some(Question::Single(q)) = game.session.question() else { panic!("expected single") };
    assert!("一二三四五六".contains(q.record.id));
    assert_eq!(q.options.len(), 4);
    assert_eq!(q.options.iter().filter(|o| o.correct).count(), 1);

    assert_eq!(game.view.active_tab(), Some(Tab::Game));
    assert_eq!(game.view.last_hud().map(|h| (h.lives_display, h.score)), Some((10, 0)));
    assert!(matches!(game.view.last_question(), Some(Question::Single(_))));
}

#[test]
fn correct_answer_scores_a_point() {
    let mut game = start(NUMBERS, GameConfig::default(), 2).unwrap();
    game.answer(true);
    assert_eq!(game.session.score(), 1);
    assert_eq!(game.session.lives(), 10);
    assert!(game.session.history().entries()[0].ok);
}

#[test]
fn wrong_answer_costs_lives_and_marks_the_correct_option() {
    let mut game = start(NUMBERS, GameConfig::default(), 3).unwrap();
    let correct = game.correct_index();
    game.answer(false);
    assert_eq!(game.session.lives(), 7);
    assert!(!game.session.history().entries()[0].ok);
    match game.view.last_verdict() {
        Some(Verdict::Choice { ok: false, chosen, correct: marked }) => {
            assert_eq!(marked, &vec![correct]);
            assert!(!chosen.contains(&correct));
        }
        other => panic!("unexpected verdict {other:?}"),
    }
}

#[test]
fn running_out_of_lives_ends_the_game() {
    let mut game = start(NUMBERS, GameConfig::default(), 4).unwrap();
    game.answer(true);
    game.fire_last_timer();
    for _ in 0..3 {
        game.answer(false);
        game.fire_last_timer();
    }
    game.answer(false);
    assert_eq!(game.session.lives(), -2);
    assert_eq!(game.view.last_hud().unwrap().lives_display, 0);

    let (timer, delay) = game.view.last_scheduled().unwrap();
    assert_eq!(timer.kind, TimerKind::GameOver);
    assert_eq!(delay, 1600);
    assert!(game.session.on_timer(timer, &mut game.view));

    assert_eq!(game.session.phase(), Phase::GameOver);
    assert_eq!(game.view.game_over_score(), Some(1));
    assert_eq!(game.session.choose_option(0, &mut game.view), Err(InputError::NotActive));
    assert_eq!(game.session.skip(&mut game.view), Err(InputError::NotActive));
}

#[test]
fn trap_zone_drop_fails_the_question_immediately() {
    let mut game = start(GIRL, drag_only(), 5).unwrap();
    let Some(Question::DragWord(q)) = game.session.question() else { panic!("expected drag-word") };
    let trap = q.zones.iter().position(|z| z.expected.is_none()).unwrap();
    assert_eq!(trap, 1);

    let tile = game.tile_of('女');
    game.session.begin_drag(7, tile).unwrap();
    let outcome = game.session.drag_release(7, proxy_over(trap), &zones(), &mut game.view).unwrap();

    assert_eq!(outcome, DropOutcome::Wrong { zone: trap });
    assert_eq!(game.session.phase(), Phase::Locked);
    assert_eq!(game.session.lives(), 7);
    assert!(!game.session.history().entries()[0].ok);
    assert_eq!(game.view.count(|c| matches!(c, ViewCall::FillZone(..))), 0);
    assert!(!game.session.drag().is_active());
}

#[test]
fn filling_every_kanji_zone_answers_the_drag_word() {
    let mut game = start(GIRL, drag_only(), 6).unwrap();

    game.session.begin_drag(1, game.tile_of('女')).unwrap();
    let first = game.session.drag_release(1, proxy_over(0), &zones(), &mut game.view).unwrap();
    assert_eq!(first, DropOutcome::Placed { zone: 0, complete: false });
    assert_eq!(game.session.phase(), Phase::AwaitingAnswer);

    game.session.begin_drag(1, game.tile_of('子')).unwrap();
    let hovered = game.session.drag_move(1, proxy_over(2), &zones(), &mut game.view).unwrap();
    assert_eq!(hovered, Some(2));
    let second = game.session.drag_release(1, proxy_over(2), &zones(), &mut game.view).unwrap();
    assert_eq!(second, DropOutcome::Placed { zone: 2, complete: true });

    assert_eq!(game.session.score(), 1);
    assert!(game.view.calls.contains(&ViewCall::FillZone(0, '女')));
    assert!(game.view.calls.contains(&ViewCall::FillZone(2, '子')));
    assert_eq!(game.view.last_verdict(), Some(&Verdict::Drop { ok: true, zone: 2 }));
    assert_eq!(game.session.history().entries()[0].display, "おんなのこ");
}

#[test]
fn dropping_outside_returns_the_tile() {
    let mut game = start(GIRL, drag_only(), 7).unwrap();
    game.session.begin_drag(3, game.tile_of('子')).unwrap();
    let outside = Rect::new(500.0, 500.0, 40.0, 20.0);
    let outcome = game.session.drag_release(3, outside, &zones(), &mut game.view).unwrap();
    assert_eq!(outcome, DropOutcome::Outside);
    assert_eq!(game.session.phase(), Phase::AwaitingAnswer);
    assert!(game.view.calls.contains(&ViewCall::ClearDragProxy));
}

#[test]
fn peek_is_refused_on_drag_words() {
    let mut game = start(GIRL, drag_only(), 8).unwrap();
    assert_eq!(game.session.toggle_peek(&mut game.view), Err(InputError::PeekUnsupported));
    assert_eq!(game.session.lives(), 10);
}

#[test]
fn skipping_cancels_an_active_drag() {
    let mut game = start(GIRL, drag_only(), 9).unwrap();
    game.session.begin_drag(2, 0).unwrap();
    assert_eq!(game.session.begin_drag(4, 1), Err(InputError::DragInProgress));
    game.session.skip(&mut game.view).unwrap();
    assert!(!game.session.drag().is_active());
    assert!(game.view.calls.contains(&ViewCall::ClearDragProxy));
}

#[test]
fn small_pool_is_rejected_before_any_state_changes() {
    let five = r#"[{"kanji":"一"},{"kanji":"二"},{"kanji":"三"},{"kanji":"四"},{"kanji":"五"}]"#;
    let mut ctx = QuizContext::new(GameConfig::default(), Settings::default());
    let mut source = PrefetchedGrades::default();
    source.insert(Grade::new(1).unwrap(), five.to_owned());
    let mut session = Session::new(ChaCha8Rng::seed_from_u64(0));
    let mut view = RecordingView::new();

    let err = session.start_game(&mut ctx, &mut source, &mut view).unwrap_err();
    assert!(matches!(err, StartError::PoolTooSmall { size: 5, required: 6 }));
    assert_eq!(view.active_tab(), Some(Tab::Settings));
    assert_eq!(view.alerts().len(), 1);
    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.question().is_none());
}
