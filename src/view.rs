//! The UI capability the quiz core renders through.
//!
//! The core never touches the DOM. Everything it wants shown goes through
//! [`QuizView`]; history click-through goes through [`DetailHooks`]. The
//! browser implements both in `web`, tests use [`RecordingView`].

use std::fmt;

use crate::data::KanjiRecord;
use crate::question::Question;
use crate::session::{HistoryEntry, Timer};
use crate::words::WordMeta;

/// Top-level screens of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Home,
    Settings,
    Dictionary,
    Kanji,
    Game,
    Word,
    Demo,
    Debug,
}

impl Tab {
    pub const ALL: [Tab; 8] = [
        Tab::Home,
        Tab::Settings,
        Tab::Dictionary,
        Tab::Kanji,
        Tab::Game,
        Tab::Word,
        Tab::Demo,
        Tab::Debug,
    ];

    /// Lenient: accepts `#game`, ` Game ` and the like. Unknown names map to `Home`.
    pub fn parse(name: &str) -> Tab {
        let name = name.trim().trim_start_matches('#').to_ascii_lowercase();
        Tab::ALL.into_iter().find(|t| t.as_str() == name).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Home => "home",
            Tab::Settings => "settings",
            Tab::Dictionary => "dictionary",
            Tab::Kanji => "kanji",
            Tab::Game => "game",
            Tab::Word => "word",
            Tab::Demo => "demo",
            Tab::Debug => "debug",
        }
    }
}

/// Whether `key` skips the current question. Only on the game screen, so
/// space keeps its usual meaning in the other tabs' inputs.
pub fn skip_shortcut(key: &str, active: Tab) -> bool {
    key == " " && active == Tab::Game
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heads-up display values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hud {
    /// Never negative, whatever the internal counter says.
    pub lives_display: i32,
    pub score: i32,
    pub peek: bool,
}

impl Hud {
    pub fn new(lives: i32, score: i32, peek: bool) -> Self {
        Self { lives_display: lives.max(0), score, peek }
    }
}

/// How a resolved question should be marked on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Clickable answers. `correct` is always highlighted, chosen or not.
    Choice { ok: bool, chosen: Vec<usize>, correct: Vec<usize> },
    /// Drag-word. `zone` is the zone that decided the outcome.
    Drop { ok: bool, zone: usize },
}

impl Verdict {
    pub fn ok(&self) -> bool {
        match self {
            Verdict::Choice { ok, .. } | Verdict::Drop { ok, .. } => *ok,
        }
    }
}

/// Detail shown instead of the choices while peeking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeekContent<'a> {
    Kanji(&'a KanjiRecord),
    Word(&'a WordMeta),
}

pub trait QuizView {
    fn set_active_tab(&mut self, tab: Tab);
    fn alert(&mut self, message: &str);
    fn render_question(&mut self, question: &Question);
    fn render_peek(&mut self, content: PeekContent<'_>);
    fn update_hud(&mut self, hud: &Hud);
    /// Newest entry first.
    fn render_history(&mut self, entries: &[HistoryEntry]);
    fn show_verdict(&mut self, verdict: &Verdict);
    fn fill_zone(&mut self, zone: usize, kanji: char);
    fn set_zone_hover(&mut self, zone: Option<usize>);
    fn clear_drag_proxy(&mut self);
    fn show_game_over(&mut self, final_score: i32);
    fn hide_game_over(&mut self);
    /// Call back into `Session::on_timer` with `timer` after `delay_ms`.
    fn schedule(&mut self, timer: Timer, delay_ms: u32);
}

/// Externally registered detail views opened from history entries.
pub trait DetailHooks {
    fn open_dictionary(&mut self, query: &str, return_to_game: bool);
    fn open_word_detail(&mut self, meta: &WordMeta);
}

/// One recorded [`QuizView`] or [`DetailHooks`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    SetActiveTab(Tab),
    Alert(String),
    RenderQuestion(Question),
    RenderPeekKanji(char),
    RenderPeekWord(String),
    UpdateHud(Hud),
    RenderHistory(Vec<HistoryEntry>),
    ShowVerdict(Verdict),
    FillZone(usize, char),
    SetZoneHover(Option<usize>),
    ClearDragProxy,
    ShowGameOver(i32),
    HideGameOver,
    Schedule(Timer, u32),
    OpenDictionary(String, bool),
    OpenWordDetail(String),
}

/// Headless view that records every call, for tests and native hosts.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub calls: Vec<ViewCall>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn last_hud(&self) -> Option<Hud> {
        self.calls.iter().rev().find_map(|c| match c {
            ViewCall::UpdateHud(h) => Some(*h),
            _ => None,
        })
    }

    pub fn last_question(&self) -> Option<&Question> {
        self.calls.iter().rev().find_map(|c| match c {
            ViewCall::RenderQuestion(q) => Some(q),
            _ => None,
        })
    }

    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.calls.iter().rev().find_map(|c| match c {
            ViewCall::ShowVerdict(v) => Some(v),
            _ => None,
        })
    }

    pub fn last_scheduled(&self) -> Option<(Timer, u32)> {
        self.calls.iter().rev().find_map(|c| match c {
            ViewCall::Schedule(t, ms) => Some((*t, *ms)),
            _ => None,
        })
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.calls.iter().rev().find_map(|c| match c {
            ViewCall::SetActiveTab(t) => Some(*t),
            _ => None,
        })
    }

    pub fn alerts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ViewCall::Alert(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn game_over_score(&self) -> Option<i32> {
        self.calls.iter().rev().find_map(|c| match c {
            ViewCall::ShowGameOver(s) => Some(*s),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&ViewCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl QuizView for RecordingView {
    fn set_active_tab(&mut self, tab: Tab) {
        self.calls.push(ViewCall::SetActiveTab(tab));
    }

    fn alert(&mut self, message: &str) {
        self.calls.push(ViewCall::Alert(message.to_owned()));
    }

    fn render_question(&mut self, question: &Question) {
        self.calls.push(ViewCall::RenderQuestion(question.clone()));
    }

    fn render_peek(&mut self, content: PeekContent<'_>) {
        self.calls.push(match content {
            PeekContent::Kanji(k) => ViewCall::RenderPeekKanji(k.id),
            PeekContent::Word(w) => ViewCall::RenderPeekWord(w.word.clone()),
        });
    }

    fn update_hud(&mut self, hud: &Hud) {
        self.calls.push(ViewCall::UpdateHud(*hud));
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.calls.push(ViewCall::RenderHistory(entries.to_vec()));
    }

    fn show_verdict(&mut self, verdict: &Verdict) {
        self.calls.push(ViewCall::ShowVerdict(verdict.clone()));
    }

    fn fill_zone(&mut self, zone: usize, kanji: char) {
        self.calls.push(ViewCall::FillZone(zone, kanji));
    }

    fn set_zone_hover(&mut self, zone: Option<usize>) {
        self.calls.push(ViewCall::SetZoneHover(zone));
    }

    fn clear_drag_proxy(&mut self) {
        self.calls.push(ViewCall::ClearDragProxy);
    }

    fn show_game_over(&mut self, final_score: i32) {
        self.calls.push(ViewCall::ShowGameOver(final_score));
    }

    fn hide_game_over(&mut self) {
        self.calls.push(ViewCall::HideGameOver);
    }

    fn schedule(&mut self, timer: Timer, delay_ms: u32) {
        self.calls.push(ViewCall::Schedule(timer, delay_ms));
    }
}

impl DetailHooks for RecordingView {
    fn open_dictionary(&mut self, query: &str, return_to_game: bool) {
        self.calls.push(ViewCall::OpenDictionary(query.to_owned(), return_to_game));
    }

    fn open_word_detail(&mut self, meta: &WordMeta) {
        self.calls.push(ViewCall::OpenWordDetail(meta.word.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_parsing_is_lenient() {
        assert_eq!(Tab::parse("#game"), Tab::Game);
        assert_eq!(Tab::parse("  Settings "), Tab::Settings);
        assert_eq!(Tab::parse("nowhere"), Tab::Home);
        assert_eq!(Tab::parse(""), Tab::Home);
    }

    #[test]
    fn space_skips_only_on_the_game_tab() {
        assert!(skip_shortcut(" ", Tab::Game));
        assert!(!skip_shortcut(" ", Tab::Dictionary));
        assert!(!skip_shortcut(" ", Tab::Home));
        assert!(!skip_shortcut("Enter", Tab::Game));
    }

    #[test]
    fn hud_clamps_lives() {
        assert_eq!(Hud::new(-2, 4, false).lives_display, 0);
        assert_eq!(Hud::new(7, 4, true).lives_display, 7);
    }

    #[test]
    fn recording_view_finds_latest_calls() {
        let mut v = RecordingView::new();
        v.update_hud(&Hud::new(10, 0, false));
        v.update_hud(&Hud::new(7, 0, false));
        v.alert("hello");
        v.open_dictionary("一", true);
        assert_eq!(v.last_hud().map(|h| h.lives_display), Some(7));
        assert_eq!(v.alerts(), vec!["hello"]);
        assert_eq!(v.count(|c| matches!(c, ViewCall::OpenDictionary(_, true))), 1);
    }
}
