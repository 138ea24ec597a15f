//! Grade-partitioned kanji records and the candidate pool.
//!
//! Each school grade ships as a JSON array of raw kanji objects. Records are
//! normalized once at load time and kept for the lifetime of the page; a grade
//! that has been loaded is never fetched again.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde_json::Value;

use crate::config::{GRADE_DATA_DIR, Settings};
use crate::error::LoadError;

/// Literal shown when a kanji has no meaning, label or kun reading.
pub const MEANING_PLACEHOLDER: &str = "みてい";

/// School-year curriculum bucket, 1 through 6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Grade(u8);

impl Grade {
    pub const ALL: [Grade; 6] = [Grade(1), Grade(2), Grade(3), Grade(4), Grade(5), Grade(6)];

    pub fn new(n: u8) -> Option<Self> {
        (1..=6).contains(&n).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Location of this grade's data file.
    pub fn data_path(self) -> String {
        format!("{GRADE_DATA_DIR}/grade-{}.json", self.0)
    }

    /// Numeric or numeric-string grade, as grade files and word records carry it.
    pub(crate) fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()).and_then(Self::new),
            Value::String(s) => s.trim().parse().ok().and_then(Self::new),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// One normalized kanji.
#[derive(Debug, Clone, PartialEq)]
pub struct KanjiRecord {
    pub id: char,
    pub grade: Grade,
    pub onyomi: Vec<String>,
    pub kunyomi: Vec<String>,
    /// Display meaning, resolved through the fallback chain in [`normalize_kanji_entry`].
    pub meaning_key: String,
    /// Untouched source object (embedded words, labels, extra fields).
    pub raw: Value,
}

/// Normalize one raw grade-file entry.
///
/// Meaning fallback: `meaning_hira` > `label` > first kun reading with
/// brackets and dots removed > [`MEANING_PLACEHOLDER`]. Entries without a
/// single-character `kanji` field are rejected. A missing or invalid
/// `grade` field falls back to the grade of the file being loaded.
pub fn normalize_kanji_entry(raw: Value, file_grade: Grade) -> Option<KanjiRecord> {
    let id = {
        let s = raw.get("kanji")?.as_str()?.trim();
        let mut chars = s.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        c
    };
    let grade = raw.get("grade").and_then(Grade::from_value).unwrap_or(file_grade);
    let onyomi = string_list(raw.get("onyomi"));
    let kunyomi = string_list(raw.get("kunyomi"));

    let text = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    let meaning_key = text("meaning_hira")
        .or_else(|| text("label"))
        .or_else(|| {
            kunyomi
                .first()
                .map(|k| k.chars().filter(|c| !matches!(c, '[' | ']' | '.')).collect::<String>())
                .map(|k| k.trim().to_owned())
                .filter(|k| !k.is_empty())
        })
        .unwrap_or_else(|| MEANING_PLACEHOLDER.to_owned());

    Some(KanjiRecord { id, grade, onyomi, kunyomi, meaning_key, raw })
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}

/// Where grade files come from.
///
/// The browser prefetches asynchronously and hands the text over through
/// [`PrefetchedGrades`]; headless hosts may read files directly. Any
/// `FnMut(Grade, &str) -> Result<String, LoadError>` is a source.
pub trait GradeSource {
    fn fetch_grade(&mut self, grade: Grade, url: &str) -> Result<String, LoadError>;
}

impl<F> GradeSource for F
where
    F: FnMut(Grade, &str) -> Result<String, LoadError>,
{
    fn fetch_grade(&mut self, grade: Grade, url: &str) -> Result<String, LoadError> {
        self(grade, url)
    }
}

/// Grade files already downloaded (or failed to download) by the caller.
#[derive(Debug, Default)]
pub struct PrefetchedGrades(HashMap<Grade, Result<String, LoadError>>);

impl PrefetchedGrades {
    pub fn insert(&mut self, grade: Grade, text: String) {
        self.0.insert(grade, Ok(text));
    }

    /// Record a failed download so the load reports the real cause.
    pub fn insert_failure(&mut self, grade: Grade, err: LoadError) {
        self.0.insert(grade, Err(err));
    }
}

impl GradeSource for PrefetchedGrades {
    fn fetch_grade(&mut self, grade: Grade, _url: &str) -> Result<String, LoadError> {
        self.0.remove(&grade).unwrap_or(Err(LoadError::UnknownGrade(grade.get())))
    }
}

/// Every loaded kanji, keyed by character, in load order.
#[derive(Debug, Default)]
pub struct KanjiStore {
    records: Vec<KanjiRecord>,
    index: HashMap<char, usize>,
    loaded: BTreeSet<Grade>,
}

impl KanjiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, grade: Grade) -> bool {
        self.loaded.contains(&grade)
    }

    /// Grades from `grades` that still need fetching, without duplicates.
    pub fn missing_grades(&self, grades: &[Grade]) -> Vec<Grade> {
        let mut seen = BTreeSet::new();
        grades
            .iter()
            .copied()
            .filter(|g| !self.loaded.contains(g) && seen.insert(*g))
            .collect()
    }

    /// Load every grade not loaded yet. Stops at the first failure; grades
    /// loaded before the failure stay loaded.
    pub fn ensure_grades_loaded(
        &mut self,
        grades: &[Grade],
        source: &mut impl GradeSource,
    ) -> Result<(), LoadError> {
        for grade in self.missing_grades(grades) {
            let url = grade.data_path();
            let text = source.fetch_grade(grade, &url)?;
            self.load_grade_json(grade, &url, &text)?;
        }
        Ok(())
    }

    /// Parse one grade file and merge its records. The whole payload is
    /// validated before anything is inserted.
    pub fn load_grade_json(&mut self, grade: Grade, url: &str, text: &str) -> Result<usize, LoadError> {
        let value: Value = serde_json::from_str(text).map_err(|source| LoadError::Json {
            url: url.to_owned(),
            source,
        })?;
        let Value::Array(entries) = value else {
            return Err(LoadError::NotJsonArray { url: url.to_owned() });
        };

        let total = entries.len();
        let records: Vec<KanjiRecord> = entries
            .into_iter()
            .filter_map(|raw| normalize_kanji_entry(raw, grade))
            .collect();
        if records.len() < total {
            log::warn!("{url}: skipped {} entries without a usable kanji", total - records.len());
        }

        let count = records.len();
        for record in records {
            self.insert(record);
        }
        self.loaded.insert(grade);
        log::info!("loaded {count} kanji for {grade} from {url}");
        Ok(count)
    }

    fn insert(&mut self, record: KanjiRecord) {
        match self.index.get(&record.id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.id, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, id: char) -> Option<&KanjiRecord> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[KanjiRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loaded records whose grade is requested and which are effectively
    /// enabled (override first, grade checkbox second).
    pub fn build_pool_for_grades(&self, grades: &[Grade], settings: &Settings) -> Vec<KanjiRecord> {
        self.records
            .iter()
            .filter(|r| grades.contains(&r.grade) && settings.is_kanji_enabled(r.id, r.grade))
            .cloned()
            .collect()
    }
}
