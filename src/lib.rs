//! Kanji Snap core crate.
//!
//! A kanji quiz played in the browser. The quiz core (data loading, word
//! index, question generation, session state machine, drag layer and the
//! offline cache policy) is plain Rust and runs natively under `cargo test`.
//! Rendering and browser APIs are reached only through the capability
//! traits in [`view`] and [`cache`]; `web` implements them for the DOM and
//! the service worker.

use wasm_bindgen::prelude::*;

pub mod cache;
pub mod config;
pub mod data;
pub mod drag;
pub mod error;
pub mod question;
pub mod session;
pub mod view;
pub mod words;

#[cfg(target_arch = "wasm32")]
pub mod web;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

pub use config::{GameConfig, Settings};
pub use data::{Grade, KanjiRecord, KanjiStore};
pub use error::{CacheError, InputError, LoadError, StartError};
pub use question::{Question, QuestionGenerator};
pub use session::{QuizContext, Session};
pub use view::{QuizView, RecordingView, Tab};
pub use words::{WordEntry, WordIndex};

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) { log::Level::Debug } else { log::Level::Info };
    wasm_logger::init(wasm_logger::Config::new(level));
}
