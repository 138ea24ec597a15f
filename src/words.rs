//! Vocabulary index feeding compound and drag-word questions.
//!
//! Words come from two places: `words` arrays embedded in grade files and
//! the external CSV dataset. Both are merged into one index, deduplicated by
//! (surface form, reading), and filtered per pool when a question is built.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::data::{Grade, KanjiRecord, KanjiStore};
use crate::error::LoadError;

/// Header columns the words CSV must provide.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "frequency",
    "word",
    "reading",
    "reading_segments",
    "meaning_en",
    "meaning_en_custom",
    "part",
    "frequency_band",
    "age_band",
    "grade",
];

/// Largest number of distinct kanji a drag-word may need; the vertical
/// layout only has three tiles.
pub const MAX_DRAG_KANJI: usize = 3;

/// Built-in drag-word used by the demo screen.
pub const DEMO_WORD: (&str, &str, &str) = ("女の子", "おんなのこ", "女:おんな|の|子:こ");

/// CJK Unified Ideographs plus Extension A.
pub fn is_kanji(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF)
}

pub fn extract_kanji_chars(word: &str) -> Vec<char> {
    word.chars().filter(|c| is_kanji(*c)).collect()
}

/// One piece of a segmented reading: `日:に` or a bare kana tail like `え`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Empty for kana-only segments.
    pub kanji: String,
    pub reading: String,
}

impl Segment {
    /// The single kanji this segment expects, if it expects exactly one.
    pub fn kanji_char(&self) -> Option<char> {
        let mut chars = self.kanji.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    pub fn is_kana(&self) -> bool {
        self.kanji.is_empty()
    }
}

/// Parse `女:おんな|の|子:こ` into segments. Empty tokens are dropped.
pub fn parse_reading_segments(s: &str) -> Vec<Segment> {
    s.split('|')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once(':') {
            Some((k, r)) => Segment { kanji: k.trim().to_owned(), reading: r.trim().to_owned() },
            None => Segment { kanji: String::new(), reading: t.to_owned() },
        })
        .collect()
}

/// Everything the word detail view needs to show a word.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WordMeta {
    pub word: String,
    pub reading: String,
    pub reading_segments: String,
    pub meaning: String,
    pub meaning_en: String,
    pub meaning_en_custom: String,
    pub part: String,
    pub frequency: i64,
    pub frequency_band: Option<f64>,
    pub age_band: Option<f64>,
    pub grade: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordEntry {
    pub surface: String,
    pub reading: String,
    pub kanji_chars: Vec<char>,
    pub segments: Vec<Segment>,
    /// Word-level grade, else the grade of the kanji that embeds it.
    pub effective_grade: Option<Grade>,
    pub meta: WordMeta,
}

impl WordEntry {
    fn new(meta: WordMeta, effective_grade: Option<Grade>) -> Self {
        Self {
            surface: meta.word.clone(),
            reading: meta.reading.clone(),
            kanji_chars: extract_kanji_chars(&meta.word),
            segments: parse_reading_segments(&meta.reading_segments),
            effective_grade,
            meta,
        }
    }

    /// Distinct kanji in first-seen order.
    pub fn distinct_kanji(&self) -> Vec<char> {
        let mut seen = HashSet::new();
        self.kanji_chars.iter().copied().filter(|c| seen.insert(*c)).collect()
    }

    fn grade_allowed(&self, grades: &BTreeSet<Grade>) -> bool {
        self.effective_grade.is_none_or(|g| grades.contains(&g))
    }

    fn is_compound_for(&self, allowed: &HashSet<char>, grades: &BTreeSet<Grade>) -> bool {
        matches!(self.kanji_chars.as_slice(), [a, b] if a != b && allowed.contains(a) && allowed.contains(b))
            && self.grade_allowed(grades)
    }

    fn is_drag_word_for(&self, allowed: &HashSet<char>, grades: &BTreeSet<Grade>) -> bool {
        if self.segments.is_empty() || !self.grade_allowed(grades) {
            return false;
        }
        let mut kanji = BTreeSet::new();
        for seg in self.segments.iter().filter(|s| !s.is_kana()) {
            match seg.kanji_char() {
                Some(c) if allowed.contains(&c) => {
                    kanji.insert(c);
                }
                _ => return false,
            }
        }
        !kanji.is_empty() && kanji.len() <= MAX_DRAG_KANJI
    }
}

/// The built-in demo word.
pub fn demo_word() -> WordEntry {
    let (word, reading, segments) = DEMO_WORD;
    WordEntry::new(
        WordMeta {
            word: word.into(),
            reading: reading.into(),
            reading_segments: segments.into(),
            meaning: "girl".into(),
            ..WordMeta::default()
        },
        Grade::new(1),
    )
}

/// Parse the words CSV. All [`REQUIRED_COLUMNS`] must be present; rows
/// without a word or reading are skipped.
pub fn parse_words_csv(text: &str) -> Result<Vec<WordEntry>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut col = HashMap::new();
    for (i, name) in headers.iter().enumerate() {
        col.insert(name.to_owned(), i);
    }
    for column in REQUIRED_COLUMNS {
        if !col.contains_key(column) {
            return Err(LoadError::MissingColumn {
                column,
                found: headers.iter().collect::<Vec<_>>().join(", "),
            });
        }
    }

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |name: &str| col.get(name).and_then(|&i| row.get(i)).unwrap_or("").to_owned();

        let word = cell("word");
        let reading = cell("reading");
        if word.is_empty() || reading.is_empty() {
            continue;
        }
        let meaning_en = cell("meaning_en");
        let meaning_en_custom = cell("meaning_en_custom");
        let meaning = if meaning_en_custom.is_empty() { meaning_en.clone() } else { meaning_en_custom.clone() };
        let grade = cell("grade").parse::<u8>().ok();

        let meta = WordMeta {
            word,
            reading,
            reading_segments: cell("reading_segments"),
            meaning,
            meaning_en,
            meaning_en_custom,
            part: cell("part"),
            frequency: cell("frequency").parse().unwrap_or(0),
            frequency_band: cell("frequency_band").parse().ok(),
            age_band: cell("age_band").parse().ok(),
            grade,
        };
        out.push(WordEntry::new(meta, grade.and_then(Grade::new)));
    }
    Ok(out)
}

/// Words embedded in a kanji record's `words` array.
fn embedded_words(record: &KanjiRecord) -> Vec<WordEntry> {
    let Some(Value::Array(items)) = record.raw.get("words") else {
        return Vec::new();
    };
    let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or("").trim().to_owned();
    items
        .iter()
        .filter_map(|w| {
            let word = text(w, "word");
            let reading = text(w, "reading");
            if word.is_empty() || reading.is_empty() {
                return None;
            }
            let grade = w.get("grade").and_then(Grade::from_value);
            let meta = WordMeta {
                word,
                reading,
                reading_segments: text(w, "reading_segments"),
                meaning: text(w, "meaning"),
                grade: grade.map(Grade::get),
                ..WordMeta::default()
            };
            let effective = grade.or(Some(record.grade));
            Some(WordEntry::new(meta, effective))
        })
        .collect()
}

fn grades_key(grades: &BTreeSet<Grade>) -> String {
    grades.iter().map(|g| g.get().to_string()).collect::<Vec<_>>().join(",")
}

#[derive(Debug, Default)]
struct EligibleCache {
    key: Option<String>,
    words: Vec<WordEntry>,
}

#[derive(Debug, Default)]
pub struct WordIndex {
    dataset: Vec<WordEntry>,
    entries: Vec<WordEntry>,
    by_surface: HashMap<String, usize>,
    by_kanji: HashMap<char, Vec<usize>>,
    by_grade: HashMap<Grade, Vec<usize>>,
    enabled_grades: BTreeSet<Grade>,
    built_for: Option<String>,
    compounds: EligibleCache,
    drag_words: EligibleCache,
}

impl WordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_dataset(&self) -> bool {
        !self.dataset.is_empty()
    }

    /// Replace the external dataset. The next rebuild always rescans.
    pub fn load_csv(&mut self, text: &str) -> Result<usize, LoadError> {
        self.dataset = parse_words_csv(text)?;
        self.built_for = None;
        log::info!("loaded {} words from CSV", self.dataset.len());
        Ok(self.dataset.len())
    }

    /// Rebuild the index for an enabled-grade set. Returns `false` when the
    /// index was already built for exactly this set.
    pub fn rebuild_for_grades(&mut self, enabled: &[Grade], store: &KanjiStore) -> bool {
        let grades: BTreeSet<Grade> = enabled.iter().copied().collect();
        let key = grades_key(&grades);
        if self.built_for.as_deref() == Some(key.as_str()) {
            return false;
        }

        let mut seen = HashSet::new();
        let candidates = self
            .dataset
            .iter()
            .cloned()
            .chain(store.records().iter().flat_map(embedded_words));
        self.entries = candidates
            .filter(|w| seen.insert((w.surface.clone(), w.reading.clone())))
            .collect();

        self.by_surface.clear();
        self.by_kanji.clear();
        self.by_grade.clear();
        for (i, w) in self.entries.iter().enumerate() {
            self.by_surface.entry(w.surface.clone()).or_insert(i);
            for k in w.distinct_kanji() {
                self.by_kanji.entry(k).or_default().push(i);
            }
            if let Some(g) = w.effective_grade {
                self.by_grade.entry(g).or_default().push(i);
            }
        }

        self.enabled_grades = grades;
        self.built_for = Some(key);
        self.compounds = EligibleCache::default();
        self.drag_words = EligibleCache::default();
        log::debug!("word index rebuilt: {} entries", self.entries.len());
        true
    }

    pub fn all(&self) -> &[WordEntry] {
        &self.entries
    }

    pub fn word_by_surface(&self, surface: &str) -> Option<&WordEntry> {
        self.by_surface.get(surface).map(|&i| &self.entries[i])
    }

    pub fn words_for_kanji(&self, kanji: char) -> Vec<&WordEntry> {
        self.lookup(self.by_kanji.get(&kanji))
    }

    pub fn words_for_grade(&self, grade: Grade) -> Vec<&WordEntry> {
        self.lookup(self.by_grade.get(&grade))
    }

    fn lookup(&self, ids: Option<&Vec<usize>>) -> Vec<&WordEntry> {
        ids.map(|ids| ids.iter().map(|&i| &self.entries[i]).collect()).unwrap_or_default()
    }

    /// Two-kanji words whose kanji are both in `pool`.
    pub fn eligible_compound_words(&mut self, pool: &[KanjiRecord]) -> &[WordEntry] {
        let (allowed, key) = self.pool_key(pool);
        if self.compounds.key.as_deref() != Some(key.as_str()) {
            self.compounds.words = self
                .entries
                .iter()
                .filter(|w| w.is_compound_for(&allowed, &self.enabled_grades))
                .cloned()
                .collect();
            self.compounds.key = Some(key);
        }
        &self.compounds.words
    }

    /// Segmented words whose every kanji segment is in `pool`.
    pub fn eligible_drag_words(&mut self, pool: &[KanjiRecord]) -> &[WordEntry] {
        let (allowed, key) = self.pool_key(pool);
        if self.drag_words.key.as_deref() != Some(key.as_str()) {
            self.drag_words.words = self
                .entries
                .iter()
                .filter(|w| w.is_drag_word_for(&allowed, &self.enabled_grades))
                .cloned()
                .collect();
            self.drag_words.key = Some(key);
        }
        &self.drag_words.words
    }

    fn pool_key(&self, pool: &[KanjiRecord]) -> (HashSet<char>, String) {
        let ids: BTreeSet<char> = pool.iter().map(|r| r.id).collect();
        let key = format!("{}::{}", ids.iter().collect::<String>(), grades_key(&self.enabled_grades));
        (ids.into_iter().collect(), key)
    }
}
