//! Tunable game constants and the persisted user settings.
//!
//! `GameConfig` carries the numbers that drive a session (lives, costs,
//! pauses, question mix). `Settings` is the object the settings screen
//! stores under [`SETTINGS_KEY`]; the quiz core only ever reads it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::Grade;
use crate::question::GeneratorConfig;

/// localStorage key holding the serialized [`Settings`].
pub const SETTINGS_KEY: &str = "kanjiSnap.settings.v7";

/// Directory holding one `grade-<n>.json` file per school grade.
pub const GRADE_DATA_DIR: &str = "./data";

/// External word dataset.
pub const WORDS_CSV_URL: &str = "./data/words.v2.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub start_lives: i32,
    /// Lives lost on any incorrect answer.
    pub wrong_cost: i32,
    /// Lives lost on the first peek of a question.
    pub peek_cost: i32,
    pub pause_after_answer_ms: u32,
    /// Pause between the final wrong answer and the game-over modal.
    pub pause_game_over_ms: u32,
    pub history_capacity: usize,
    /// Pool size required before a game may start.
    pub min_pool: usize,
    pub generator: GeneratorConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_lives: 10,
            wrong_cost: 3,
            peek_cost: 1,
            pause_after_answer_ms: 1100,
            pause_game_over_ms: 1600,
            history_capacity: 8,
            min_pool: 6,
            generator: GeneratorConfig::default(),
        }
    }
}

impl GameConfig {
    /// Overlay a (possibly partial) JSON object on top of the defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enabled_grades: BTreeMap<u8, bool>,
    /// Per-kanji enable/disable that wins over the grade checkbox.
    pub kanji_overrides: BTreeMap<String, bool>,
    pub compound_enabled: bool,
    pub drag_word_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let enabled_grades = Grade::ALL.iter().map(|g| (g.get(), g.get() == 1)).collect();
        Self {
            enabled_grades,
            kanji_overrides: BTreeMap::new(),
            compound_enabled: true,
            drag_word_enabled: true,
        }
    }
}

impl Settings {
    /// Parse the stored settings object.
    ///
    /// Never fails: anything unreadable falls back to the defaults field by
    /// field, so a corrupted entry cannot lock the user out of the game.
    pub fn from_json(text: &str) -> Self {
        let mut settings = Self::default();
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text) else {
            log::warn!("stored settings unreadable, using defaults");
            return settings;
        };

        if let Some(Value::Object(grades)) = obj.get("enabledGrades") {
            for grade in Grade::ALL {
                if let Some(Value::Bool(on)) = grades.get(&grade.get().to_string()) {
                    settings.enabled_grades.insert(grade.get(), *on);
                }
            }
        }
        if let Some(Value::Object(overrides)) = obj.get("kanjiOverrides") {
            settings.kanji_overrides = overrides
                .iter()
                .filter_map(|(k, v)| v.as_bool().map(|on| (k.clone(), on)))
                .collect();
        }
        if let Some(Value::Bool(on)) = obj.get("compoundEnabled") {
            settings.compound_enabled = *on;
        }
        if let Some(Value::Bool(on)) = obj.get("dragWordEnabled") {
            settings.drag_word_enabled = *on;
        }
        settings
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Enabled grades in ascending order.
    pub fn enabled_grades(&self) -> Vec<Grade> {
        self.enabled_grades
            .iter()
            .filter(|(_, on)| **on)
            .filter_map(|(g, _)| Grade::new(*g))
            .collect()
    }

    pub fn is_grade_enabled(&self, grade: Grade) -> bool {
        self.enabled_grades.get(&grade.get()).copied().unwrap_or(false)
    }

    /// Effective state of one kanji: an override wins over its grade.
    pub fn is_kanji_enabled(&self, id: char, grade: Grade) -> bool {
        match self.kanji_overrides.get(id.to_string().as_str()) {
            Some(on) => *on,
            None => self.is_grade_enabled(grade),
        }
    }

    pub fn is_compound_enabled(&self) -> bool {
        self.compound_enabled
    }

    pub fn is_drag_word_enabled(&self) -> bool {
        self.drag_word_enabled
    }

    pub fn override_count(&self) -> usize {
        self.kanji_overrides.len()
    }
}
