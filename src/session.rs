//! The quiz session: question flow, scoring, peek, history and timers.
//!
//! `Session` is a plain state machine:
//!
//! ```text
//! Idle -> AwaitingAnswer -> Locked -> AwaitingAnswer | GameOver
//! ```
//!
//! Every input goes through a method that either applies it or returns an
//! [`InputError`] explaining why it was refused. Timed transitions are
//! requested from the view as [`Timer`] values and come back through
//! [`Session::on_timer`]; a timer minted for an earlier question is ignored.

use rand::Rng;

use crate::config::{GameConfig, Settings};
use crate::data::{GradeSource, KanjiRecord, KanjiStore};
use crate::drag::{DragLayer, DropOutcome, Rect, ZoneHitTest, resolve_drop};
use crate::error::{InputError, StartError};
use crate::question::{Question, QuestionGenerator, QuestionKind, QuestionSource};
use crate::view::{DetailHooks, Hud, PeekContent, QuizView, Tab, Verdict};
use crate::words::{WordEntry, WordIndex, WordMeta};

/// Everything the session reads from outside: tunables, user settings and
/// the loaded data.
#[derive(Debug, Default)]
pub struct QuizContext {
    pub config: GameConfig,
    pub settings: Settings,
    pub kanji: KanjiStore,
    pub words: WordIndex,
}

/// Counters shown on the debug screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugTotals {
    pub kanji_loaded: usize,
    pub words_loaded: usize,
    pub pool_size: usize,
    pub overrides: usize,
}

impl QuizContext {
    pub fn new(config: GameConfig, settings: Settings) -> Self {
        Self { config, settings, ..Self::default() }
    }

    /// Load what the enabled grades need and build the candidate pool.
    pub fn prepare_pool(&mut self, source: &mut impl GradeSource) -> Result<Vec<KanjiRecord>, StartError> {
        let grades = self.settings.enabled_grades();
        if grades.is_empty() {
            return Err(StartError::NoGradesEnabled);
        }
        self.kanji.ensure_grades_loaded(&grades, source)?;
        self.words.rebuild_for_grades(&grades, &self.kanji);

        let pool = self.kanji.build_pool_for_grades(&grades, &self.settings);
        if pool.len() < self.config.min_pool {
            return Err(StartError::PoolTooSmall { size: pool.len(), required: self.config.min_pool });
        }
        Ok(pool)
    }

    pub fn debug_totals(&self) -> DebugTotals {
        let grades = self.settings.enabled_grades();
        DebugTotals {
            kanji_loaded: self.kanji.len(),
            words_loaded: self.words.all().len(),
            pool_size: self.kanji.build_pool_for_grades(&grades, &self.settings).len(),
            overrides: self.settings.override_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingAnswer,
    /// Between a resolved answer and the next question.
    Locked,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Advance,
    GameOver,
}

/// A one-shot timer request. `seq` ties it to the question it was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub seq: u64,
    pub kind: TimerKind,
}

/// What a history row opens when clicked.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryDetail {
    Dictionary { query: String },
    Word(WordMeta),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub kind: QuestionKind,
    pub display: String,
    pub ok: bool,
    pub detail: HistoryDetail,
}

impl HistoryEntry {
    fn for_question(question: &Question, ok: bool) -> Self {
        let detail = match question {
            Question::Single(q) => HistoryDetail::Dictionary { query: q.record.id.to_string() },
            Question::Compound(q) => HistoryDetail::Word(q.word.meta.clone()),
            Question::DragWord(q) => HistoryDetail::Word(q.word.meta.clone()),
        };
        Self { kind: question.kind(), display: question.display(), ok, detail }
    }

    /// Show the dictionary or word detail behind this row.
    pub fn open(&self, hooks: &mut impl DetailHooks) {
        match &self.detail {
            HistoryDetail::Dictionary { query } => hooks.open_dictionary(query, true),
            HistoryDetail::Word(meta) => hooks.open_word_detail(meta),
        }
    }
}

/// Bounded, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(GameConfig::default().history_capacity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub score: i32,
    /// May go negative; only the HUD clamps it.
    pub lives: i32,
    pub phase: Phase,
    pub peek: bool,
    /// Whether the current question has already been charged for a peek.
    pub peek_charged: bool,
    pub history: History,
    pub question: Option<Question>,
    /// Answer indices picked so far on a compound question.
    pub compound_picks: Vec<usize>,
}

/// Result of one compound tile pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundPick {
    /// First tile held, waiting for the second.
    Pending,
    /// Tile was already picked.
    Ignored,
    Resolved { ok: bool },
}

pub struct Session<R: Rng> {
    config: GameConfig,
    generator: QuestionGenerator,
    rng: R,
    state: SessionState,
    drag: DragLayer,
    pool: Vec<KanjiRecord>,
    compounds: Vec<WordEntry>,
    drag_words: Vec<WordEntry>,
    compound_enabled: bool,
    drag_word_enabled: bool,
    seq: u64,
}

impl<R: Rng> Session<R> {
    pub fn new(rng: R) -> Self {
        Self {
            config: GameConfig::default(),
            generator: QuestionGenerator::default(),
            rng,
            state: SessionState::default(),
            drag: DragLayer::new(),
            pool: Vec::new(),
            compounds: Vec::new(),
            drag_words: Vec::new(),
            compound_enabled: false,
            drag_word_enabled: false,
            seq: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn score(&self) -> i32 {
        self.state.score
    }

    pub fn lives(&self) -> i32 {
        self.state.lives
    }

    pub fn question(&self) -> Option<&Question> {
        self.state.question.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.state.history
    }

    pub fn drag(&self) -> &DragLayer {
        &self.drag
    }

    pub fn pool(&self) -> &[KanjiRecord] {
        &self.pool
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state.phase, Phase::AwaitingAnswer | Phase::Locked)
    }

    pub fn hud(&self) -> Hud {
        Hud::new(self.state.lives, self.state.score, self.state.peek)
    }

    /// Check preconditions, reset the state and show the first question.
    ///
    /// On failure the user is alerted and nothing in the session changes.
    /// Precondition failures also send the user to the settings tab.
    pub fn start_game(
        &mut self,
        ctx: &mut QuizContext,
        source: &mut impl GradeSource,
        view: &mut impl QuizView,
    ) -> Result<(), StartError> {
        let pool = match ctx.prepare_pool(source) {
            Ok(pool) => pool,
            Err(err) => {
                log::warn!("cannot start game: {err}");
                view.alert(&err.to_string());
                if matches!(err, StartError::NoGradesEnabled | StartError::PoolTooSmall { .. }) {
                    view.set_active_tab(Tab::Settings);
                }
                return Err(err);
            }
        };

        self.compounds = ctx.words.eligible_compound_words(&pool).to_vec();
        self.drag_words = ctx.words.eligible_drag_words(&pool).to_vec();
        self.pool = pool;
        self.compound_enabled = ctx.settings.is_compound_enabled();
        self.drag_word_enabled = ctx.settings.is_drag_word_enabled();
        self.config = ctx.config.clone();
        self.generator = QuestionGenerator::new(self.config.generator);

        self.cancel_drag(view);
        self.state = SessionState {
            score: 0,
            lives: self.config.start_lives,
            phase: Phase::AwaitingAnswer,
            history: History::new(self.config.history_capacity),
            ..SessionState::default()
        };
        log::info!(
            "game started: pool {}, compounds {}, drag-words {}",
            self.pool.len(),
            self.compounds.len(),
            self.drag_words.len()
        );

        view.hide_game_over();
        view.set_active_tab(Tab::Game);
        view.render_history(self.state.history.entries());
        self.next_question(view)
            .map_err(|_| StartError::PoolTooSmall { size: self.pool.len(), required: self.config.min_pool })
    }

    /// Replace the current question with a fresh one.
    pub fn next_question(&mut self, view: &mut impl QuizView) -> Result<(), InputError> {
        if !self.is_active() {
            return Err(InputError::NotActive);
        }
        self.cancel_drag(view);
        self.seq += 1;
        self.state.peek = false;
        self.state.peek_charged = false;
        self.state.compound_picks.clear();

        let src = QuestionSource {
            pool: &self.pool,
            compounds: &self.compounds,
            drag_words: &self.drag_words,
            compound_enabled: self.compound_enabled,
            drag_word_enabled: self.drag_word_enabled,
        };
        let Some(question) = self.generator.pick_next(&mut self.rng, &src) else {
            log::error!("pool of {} cannot produce a question", self.pool.len());
            self.end_game(view);
            return Err(InputError::NotActive);
        };
        view.render_question(&question);
        self.state.question = Some(question);
        self.state.phase = Phase::AwaitingAnswer;
        view.update_hud(&self.hud());
        Ok(())
    }

    /// Answer a single-kanji question. Returns whether it was correct.
    pub fn choose_option(&mut self, index: usize, view: &mut impl QuizView) -> Result<bool, InputError> {
        self.ensure_answerable()?;
        let Some(Question::Single(q)) = &self.state.question else {
            return Err(InputError::WrongQuestionKind);
        };
        let option = q.options.get(index).ok_or(InputError::OutOfRange(index))?;
        let ok = option.correct;
        let verdict = Verdict::Choice { ok, chosen: vec![index], correct: vec![q.correct_index()] };
        self.resolve(ok, verdict, view);
        Ok(ok)
    }

    /// Pick one tile of a compound question. The second distinct pick
    /// resolves it; both kanji must be right.
    pub fn pick_compound(&mut self, index: usize, view: &mut impl QuizView) -> Result<CompoundPick, InputError> {
        self.ensure_answerable()?;
        let Some(Question::Compound(q)) = &self.state.question else {
            return Err(InputError::WrongQuestionKind);
        };
        if index >= q.answers.len() {
            return Err(InputError::OutOfRange(index));
        }
        if self.state.compound_picks.contains(&index) {
            return Ok(CompoundPick::Ignored);
        }
        self.state.compound_picks.push(index);
        if self.state.compound_picks.len() < 2 {
            return Ok(CompoundPick::Pending);
        }

        let correct = q.correct_indices();
        let ok = self.state.compound_picks.iter().all(|i| correct.contains(i));
        let verdict = Verdict::Choice { ok, chosen: self.state.compound_picks.clone(), correct };
        self.resolve(ok, verdict, view);
        Ok(CompoundPick::Resolved { ok })
    }

    /// Switch between the choices and the answer detail. Returns the new
    /// peek state. Only the first peek of a question costs lives.
    pub fn toggle_peek(&mut self, view: &mut impl QuizView) -> Result<bool, InputError> {
        match self.state.phase {
            Phase::Idle | Phase::GameOver => return Err(InputError::NotActive),
            Phase::Locked => return Err(InputError::Locked),
            Phase::AwaitingAnswer => {}
        }
        let question = self.state.question.as_ref().ok_or(InputError::NotActive)?;
        if question.kind() == QuestionKind::DragWord {
            return Err(InputError::PeekUnsupported);
        }

        if self.state.peek {
            self.state.peek = false;
            view.render_question(question);
            view.update_hud(&self.hud());
            return Ok(false);
        }

        // The choices are rebuilt on return, so earlier picks are dropped.
        self.state.compound_picks.clear();
        match question {
            Question::Single(q) => view.render_peek(PeekContent::Kanji(&q.record)),
            Question::Compound(q) => view.render_peek(PeekContent::Word(&q.word.meta)),
            Question::DragWord(_) => {}
        }
        self.state.peek = true;
        if !self.state.peek_charged {
            self.state.peek_charged = true;
            self.state.lives -= self.config.peek_cost;
        }
        view.update_hud(&self.hud());
        if self.state.lives <= 0 {
            self.end_game(view);
        }
        Ok(true)
    }

    /// Move on without answering. Free, but only when an answer would be accepted.
    pub fn skip(&mut self, view: &mut impl QuizView) -> Result<(), InputError> {
        self.ensure_answerable()?;
        log::debug!("question skipped");
        self.next_question(view)
    }

    /// Pick up answer tile `tile` with pointer `pointer_id`.
    pub fn begin_drag(&mut self, pointer_id: i32, tile: usize) -> Result<char, InputError> {
        self.ensure_answerable()?;
        let Some(Question::DragWord(q)) = &self.state.question else {
            return Err(InputError::WrongQuestionKind);
        };
        let kanji = *q.answers.get(tile).ok_or(InputError::OutOfRange(tile))?;
        self.drag.begin(pointer_id, tile, kanji)?;
        Ok(kanji)
    }

    /// Track the drag proxy and highlight the unfilled zone under its center.
    pub fn drag_move(
        &mut self,
        pointer_id: i32,
        proxy: Rect,
        hit: &impl ZoneHitTest,
        view: &mut impl QuizView,
    ) -> Result<Option<usize>, InputError> {
        let Some(Question::DragWord(q)) = &self.state.question else {
            return Err(InputError::WrongQuestionKind);
        };
        let before = self.drag.active().and_then(|g| g.hovered_zone);
        let zone = self.drag.hover(pointer_id, proxy, hit, q)?;
        if zone != before {
            view.set_zone_hover(zone);
        }
        Ok(zone)
    }

    /// Drop the dragged tile on whatever zone is under the proxy's center.
    pub fn drag_release(
        &mut self,
        pointer_id: i32,
        proxy: Rect,
        hit: &impl ZoneHitTest,
        view: &mut impl QuizView,
    ) -> Result<DropOutcome, InputError> {
        let (gesture, zone) = self.drag.release(pointer_id, proxy, hit)?;
        view.clear_drag_proxy();
        view.set_zone_hover(None);
        self.ensure_answerable()?;
        let Some(Question::DragWord(q)) = self.state.question.as_mut() else {
            return Err(InputError::WrongQuestionKind);
        };

        let outcome = resolve_drop(q, zone, gesture.kanji);
        log::debug!("drop of {} resolved as {outcome:?}", gesture.kanji);
        match outcome {
            DropOutcome::Placed { zone, complete } => {
                view.fill_zone(zone, gesture.kanji);
                if complete {
                    self.resolve(true, Verdict::Drop { ok: true, zone }, view);
                }
            }
            DropOutcome::Wrong { zone } => self.resolve(false, Verdict::Drop { ok: false, zone }, view),
            DropOutcome::Outside | DropOutcome::AlreadyFilled => {}
        }
        Ok(outcome)
    }

    /// Abort an in-flight drag; the tile goes back to its slot.
    pub fn cancel_drag(&mut self, view: &mut impl QuizView) {
        if self.drag.cancel().is_some() {
            view.clear_drag_proxy();
            view.set_zone_hover(None);
        }
    }

    /// Handle a timer requested through [`QuizView::schedule`]. Returns
    /// `false` for stale timers, which are dropped.
    pub fn on_timer(&mut self, timer: Timer, view: &mut impl QuizView) -> bool {
        if timer.seq != self.seq || self.state.phase != Phase::Locked {
            log::debug!("stale timer {timer:?} ignored");
            return false;
        }
        match timer.kind {
            TimerKind::Advance if self.state.lives > 0 => self.next_question(view).is_ok(),
            TimerKind::Advance | TimerKind::GameOver => {
                self.end_game(view);
                true
            }
        }
    }

    pub fn end_game(&mut self, view: &mut impl QuizView) {
        self.cancel_drag(view);
        self.seq += 1;
        self.state.phase = Phase::GameOver;
        self.state.peek = false;
        view.update_hud(&self.hud());
        view.show_game_over(self.state.score);
        log::info!("game over, final score {}", self.state.score);
    }

    /// Leave the game screen and drop the session.
    pub fn exit(&mut self, view: &mut impl QuizView) {
        self.cancel_drag(view);
        self.seq += 1;
        self.state.phase = Phase::Idle;
        self.state.peek = false;
        self.state.question = None;
        view.hide_game_over();
        view.set_active_tab(Tab::Home);
    }

    /// Open the detail behind history row `index`.
    pub fn open_history(&self, index: usize, hooks: &mut impl DetailHooks) -> Result<(), InputError> {
        let entry = self.state.history.get(index).ok_or(InputError::NoHistoryEntry(index))?;
        entry.open(hooks);
        Ok(())
    }

    fn ensure_answerable(&self) -> Result<(), InputError> {
        match self.state.phase {
            Phase::Idle | Phase::GameOver => Err(InputError::NotActive),
            Phase::Locked => Err(InputError::Locked),
            Phase::AwaitingAnswer if self.state.peek => Err(InputError::PeekActive),
            Phase::AwaitingAnswer => Ok(()),
        }
    }

    fn resolve(&mut self, ok: bool, verdict: Verdict, view: &mut impl QuizView) {
        self.state.phase = Phase::Locked;
        self.state.peek = false;
        if ok {
            self.state.score += 1;
        } else {
            self.state.lives -= self.config.wrong_cost;
        }
        if let Some(question) = &self.state.question {
            self.state.history.push(HistoryEntry::for_question(question, ok));
            log::debug!("{} answered, ok={ok}", question.kind().as_str());
        }

        view.show_verdict(&verdict);
        view.update_hud(&self.hud());
        view.render_history(self.state.history.entries());

        let (kind, delay) = if self.state.lives <= 0 {
            (TimerKind::GameOver, self.config.pause_game_over_ms)
        } else {
            (TimerKind::Advance, self.config.pause_after_answer_ms)
        };
        view.schedule(Timer { seq: self.seq, kind }, delay);
    }
}
