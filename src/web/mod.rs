//! Browser glue: DOM view, event wiring and the `#[wasm_bindgen]` exports.
//!
//! All quiz state lives in one thread-local [`App`]. Event handlers borrow
//! it for the duration of a single session call; nothing holds the borrow
//! across an `await`.

pub mod service_worker;

use std::cell::RefCell;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, Event, HtmlElement, KeyboardEvent, PointerEvent, Response};

use crate::cache::{DOWNLOAD_PARAM, DownloadOutcome, DownloadReport, RUNTIME_CACHE, count_meaning_images, meaning_image_path};
use crate::config::{SETTINGS_KEY, Settings, WORDS_CSV_URL};
use crate::data::PrefetchedGrades;
use crate::drag::{Rect, ZoneLayout};
use crate::error::{CacheError, InputError, LoadError};
use crate::question::{Layout, Question, QuestionKind};
use crate::session::{CompoundPick, HistoryEntry, QuizContext, Session, Timer};
use crate::view::{DetailHooks, Hud, PeekContent, QuizView, Tab, Verdict, skip_shortcut};
use crate::words::WordMeta;

struct App {
    ctx: QuizContext,
    session: Session<StdRng>,
    view: DomView,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

fn with_app<T>(f: impl FnOnce(&mut App) -> T) -> Option<T> {
    APP.with(|cell| cell.borrow_mut().as_mut().map(f))
}

fn document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

/// Create the app state and wire the game screen once.
fn ensure_app() -> Result<(), JsValue> {
    if APP.with(|cell| cell.borrow().is_some()) {
        return Ok(());
    }
    let document = document().ok_or_else(|| JsValue::from_str("no document"))?;
    wire_game_ui(&document)?;
    let app = App {
        ctx: QuizContext::default(),
        session: Session::new(StdRng::from_entropy()),
        view: DomView { document },
    };
    APP.with(|cell| cell.replace(Some(app)));
    Ok(())
}

fn load_settings() -> Settings {
    web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .and_then(|s| s.get_item(SETTINGS_KEY).ok().flatten())
        .map(|text| Settings::from_json(&text))
        .unwrap_or_default()
}

async fn fetch_response(url: &str) -> Result<Response, LoadError> {
    let network = |message: String| LoadError::Network { url: url.to_owned(), message };
    let window = web_sys::window().ok_or_else(|| network("no window".into()))?;
    let value = JsFuture::from(window.fetch_with_str(url)).await.map_err(|e| network(format!("{e:?}")))?;
    let response: Response = value.dyn_into().map_err(|e| network(format!("{e:?}")))?;
    if !response.ok() {
        return Err(LoadError::Http { url: url.to_owned(), status: response.status() });
    }
    Ok(response)
}

async fn fetch_text(url: &str) -> Result<String, LoadError> {
    let network = |message: String| LoadError::Network { url: url.to_owned(), message };
    let response = fetch_response(url).await?;
    let promise = response.text().map_err(|e| network(format!("{e:?}")))?;
    let text = JsFuture::from(promise).await.map_err(|e| network(format!("{e:?}")))?;
    text.as_string().ok_or_else(|| network("body is not text".into()))
}

/// Download the grade files `settings` needs and are not loaded yet. Stops
/// at the first failure, which is kept for the load step to report.
async fn prefetch_grades(settings: &Settings) -> PrefetchedGrades {
    let missing = with_app(|app| app.ctx.kanji.missing_grades(&settings.enabled_grades())).unwrap_or_default();
    let mut fetched = PrefetchedGrades::default();
    for grade in missing {
        match fetch_text(&grade.data_path()).await {
            Ok(text) => fetched.insert(grade, text),
            Err(err) => {
                fetched.insert_failure(grade, err);
                break;
            }
        }
    }
    fetched
}

fn to_js(value: &serde_json::Value) -> JsValue {
    js_sys::JSON::parse(&value.to_string()).unwrap_or(JsValue::NULL)
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub async fn start_quiz_game() -> Result<(), JsValue> {
    ensure_app()?;
    let settings = load_settings();
    let mut grades = prefetch_grades(&settings).await;

    let need_words = with_app(|app| !app.ctx.words.has_dataset()).unwrap_or(false);
    let words = if need_words {
        match fetch_text(WORDS_CSV_URL).await {
            Ok(text) => Some(text),
            Err(err) => {
                log::warn!("word dataset unavailable: {err}");
                None
            }
        }
    } else {
        None
    };

    with_app(|app| {
        if let Some(text) = words {
            if let Err(err) = app.ctx.words.load_csv(&text) {
                log::warn!("{err}");
            }
        }
        app.ctx.settings = settings;
        app.session.start_game(&mut app.ctx, &mut grades, &mut app.view)
    })
    .ok_or_else(|| JsValue::from_str("app not initialised"))?
    .map_err(js_err)
}

#[wasm_bindgen]
pub fn toggle_peek() -> Result<bool, JsValue> {
    with_app(|app| app.session.toggle_peek(&mut app.view))
        .unwrap_or(Ok(false))
        .map_err(js_err)
}

#[wasm_bindgen]
pub fn skip_question() -> Result<(), JsValue> {
    with_app(|app| app.session.skip(&mut app.view)).unwrap_or(Ok(())).map_err(js_err)
}

#[wasm_bindgen]
pub fn exit_game() {
    with_app(|app| app.session.exit(&mut app.view));
}

/// Open the detail behind history row `index`. The hooks run after the app
/// borrow is released since they may call back into these exports.
#[wasm_bindgen]
pub fn open_history_entry(index: usize) -> Result<(), JsValue> {
    let entry = with_app(|app| app.session.history().get(index).cloned())
        .flatten()
        .ok_or_else(|| js_err(InputError::NoHistoryEntry(index)))?;
    entry.open(&mut GlobalHooks);
    Ok(())
}

/// Switch screens by name; unknown names land on home.
#[wasm_bindgen]
pub fn set_active_tab(name: &str) -> Result<(), JsValue> {
    let document = document().ok_or_else(|| JsValue::from_str("no document"))?;
    DomView { document }.set_active_tab(Tab::parse(name));
    Ok(())
}

/// The built-in drag-word shown on the demo screen.
#[wasm_bindgen]
pub fn demo_word() -> JsValue {
    let word = crate::words::demo_word();
    to_js(&json!({
        "word": word.meta,
        "segments": word.segments,
        "kanji": word.distinct_kanji().iter().map(char::to_string).collect::<Vec<_>>(),
    }))
}

/// Fetch every meaning image of the enabled pool through the service
/// worker's download route. No retries; the caller may run it again.
#[wasm_bindgen]
pub async fn download_meaning_images() -> Result<JsValue, JsValue> {
    ensure_app()?;
    let settings = load_settings();
    let mut grades = prefetch_grades(&settings).await;
    let pool = with_app(|app| {
        app.ctx.settings = settings;
        app.ctx.prepare_pool(&mut grades)
    })
    .ok_or_else(|| JsValue::from_str("app not initialised"))?
    .map_err(js_err)?;

    let runtime = runtime_cache().await?;
    let mut report = DownloadReport::default();
    for kanji in pool.iter().map(|k| k.id) {
        let path = meaning_image_path(kanji);
        let outcome = match JsFuture::from(runtime.match_with_str(&path)).await {
            Ok(hit) if hit.is_instance_of::<Response>() => DownloadOutcome::AlreadyCached,
            Ok(_) => fetch_meaning_image(&path).await,
            Err(err) => DownloadOutcome::Failed(CacheError::Storage(format!("{err:?}"))),
        };
        report.record(kanji, outcome);
    }
    log::info!(
        "meaning image download: {} stored, {} cached, {} failed",
        report.stored,
        report.already_cached,
        report.failed.len()
    );
    let failed: Vec<String> = report.failed_kanji().iter().map(char::to_string).collect();
    Ok(to_js(&json!({
        "stored": report.stored,
        "alreadyCached": report.already_cached,
        "failed": failed,
    })))
}

async fn fetch_meaning_image(path: &str) -> DownloadOutcome {
    match fetch_response(&format!("{path}?{DOWNLOAD_PARAM}=1")).await {
        Ok(_) => DownloadOutcome::Stored,
        Err(LoadError::Http { status, .. }) => DownloadOutcome::Failed(CacheError::Status { key: path.to_owned(), status }),
        Err(err) => DownloadOutcome::Failed(CacheError::Network { key: path.to_owned(), message: err.to_string() }),
    }
}

async fn runtime_cache() -> Result<web_sys::Cache, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    JsFuture::from(window.caches()?.open(RUNTIME_CACHE)).await?.dyn_into()
}

/// Totals for the debug screen.
#[wasm_bindgen]
pub async fn debug_totals() -> Result<JsValue, JsValue> {
    ensure_app()?;
    let totals = with_app(|app| app.ctx.debug_totals()).unwrap_or_default();
    let images = count_cached_meaning_images().await;
    if let Err(err) = &images {
        log::warn!("cache read failed: {err:?}");
    }
    Ok(to_js(&json!({
        "kanjiLoaded": totals.kanji_loaded,
        "wordsLoaded": totals.words_loaded,
        "poolSize": totals.pool_size,
        "overrides": totals.overrides,
        "cachedMeaningImages": images.ok(),
    })))
}

async fn count_cached_meaning_images() -> Result<usize, JsValue> {
    let keys: js_sys::Array = JsFuture::from(runtime_cache().await?.keys()).await?.dyn_into()?;
    let urls: Vec<String> =
        keys.iter().filter_map(|k| k.dyn_into::<web_sys::Request>().ok()).map(|r| r.url()).collect();
    Ok(count_meaning_images(urls.iter().map(String::as_str)))
}

// --- Event wiring -----------------------------------------------------------

fn listen(target: &web_sys::EventTarget, kind: &str, handler: fn(Event)) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn listen_capture(target: &web_sys::EventTarget, kind: &str, handler: fn(Event)) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback_and_bool(kind, closure.as_ref().unchecked_ref(), true)?;
    closure.forget();
    Ok(())
}

fn wire_game_ui(document: &Document) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    if let Some(choices) = document.get_element_by_id("choices") {
        listen(&choices, "click", on_choice_click)?;
        listen(&choices, "pointerdown", on_pointer_down)?;
        listen_capture(&choices, "error", on_meaning_image_error)?;
    }
    if let Some(prompt) = document.get_element_by_id("prompt") {
        listen(&prompt, "click", |_| {
            if let Err(err) = toggle_peek() {
                log::debug!("peek refused: {err:?}");
            }
        })?;
    }
    if let Some(history) = document.get_element_by_id("historyList") {
        listen(&history, "click", on_history_click)?;
    }
    listen(&window, "pointermove", on_pointer_move)?;
    listen(&window, "pointerup", on_pointer_up)?;
    listen(&window, "pointercancel", |_| {
        with_app(|app| app.session.cancel_drag(&mut app.view));
    })?;
    listen(document, "keydown", on_key_down)?;
    Ok(())
}

/// The element matching `selector` at or above the event target.
fn event_element(evt: &Event, selector: &str) -> Option<Element> {
    evt.target()?.dyn_into::<Element>().ok()?.closest(selector).ok().flatten()
}

fn data_index(el: &Element, attr: &str) -> Option<usize> {
    el.get_attribute(attr)?.parse().ok()
}

fn on_choice_click(evt: Event) {
    let Some(button) = event_element(&evt, "button[data-idx]") else { return };
    let Some(idx) = data_index(&button, "data-idx") else { return };
    with_app(|app| {
        let result = match app.session.question().map(Question::kind) {
            Some(QuestionKind::Single) => app.session.choose_option(idx, &mut app.view).map(drop),
            Some(QuestionKind::Compound) => app.session.pick_compound(idx, &mut app.view).map(|pick| {
                if pick == CompoundPick::Pending {
                    button.class_list().add_1("picked").ok();
                }
            }),
            _ => Ok(()),
        };
        if let Err(err) = result {
            log::debug!("choice ignored: {err}");
        }
    });
}

/// `error` does not bubble, so this runs in the capture phase on `#choices`.
fn on_meaning_image_error(evt: Event) {
    let Some(img) = evt.target().and_then(|t| t.dyn_into::<Element>().ok()) else { return };
    if !img.class_list().contains("meaningImg") {
        return;
    }
    let Some(button) = img.closest("button[data-text]").ok().flatten() else { return };
    let text = button.get_attribute("data-text").unwrap_or_default();
    button.set_text_content(Some(&text));
}

fn on_history_click(evt: Event) {
    let Some(row) = event_element(&evt, ".historyRow") else { return };
    if let Some(idx) = data_index(&row, "data-hist") {
        if let Err(err) = open_history_entry(idx) {
            log::warn!("history entry: {err:?}");
        }
    }
}

fn on_key_down(evt: Event) {
    let Ok(evt) = evt.dyn_into::<KeyboardEvent>() else { return };
    let active = with_app(|app| app.view.active_tab()).flatten().unwrap_or_default();
    if !skip_shortcut(&evt.key(), active) {
        return;
    }
    evt.prevent_default();
    if let Err(err) = skip_question() {
        log::debug!("skip refused: {err:?}");
    }
}

fn on_pointer_down(evt: Event) {
    let Ok(evt) = evt.dyn_into::<PointerEvent>() else { return };
    let Some(tile) = event_element(&evt, ".dd-tile") else { return };
    let Some(idx) = data_index(&tile, "data-idx") else { return };
    match with_app(|app| app.session.begin_drag(evt.pointer_id(), idx)) {
        Some(Ok(kanji)) => {
            evt.prevent_default();
            tile.class_list().add_1("dragging").ok();
            spawn_drag_proxy(kanji, evt.client_x(), evt.client_y());
        }
        Some(Err(err)) => log::debug!("drag refused: {err}"),
        None => {}
    }
}

fn on_pointer_move(evt: Event) {
    let Ok(evt) = evt.dyn_into::<PointerEvent>() else { return };
    let Some(proxy) = drag_proxy() else { return };
    place_proxy(&proxy, evt.client_x(), evt.client_y());
    let rect = element_rect(&proxy);
    let zones = zone_layout();
    with_app(|app| {
        if let Err(err) = app.session.drag_move(evt.pointer_id(), rect, &zones, &mut app.view) {
            log::debug!("drag move ignored: {err}");
        }
    });
}

fn on_pointer_up(evt: Event) {
    let Ok(evt) = evt.dyn_into::<PointerEvent>() else { return };
    let Some(proxy) = drag_proxy() else { return };
    place_proxy(&proxy, evt.client_x(), evt.client_y());
    let rect = element_rect(&proxy);
    let zones = zone_layout();
    with_app(|app| match app.session.drag_release(evt.pointer_id(), rect, &zones, &mut app.view) {
        Ok(outcome) => log::debug!("drop: {outcome:?}"),
        Err(err) => log::debug!("drop ignored: {err}"),
    });
}

// --- Drag proxy ---------------------------------------------------------------

const PROXY_STYLE: &str = "position:fixed; transform:translate(-50%,-50%); pointer-events:none; z-index:60;";

fn drag_proxy() -> Option<Element> {
    document()?.query_selector(".dd-drag").ok().flatten()
}

fn spawn_drag_proxy(kanji: char, x: i32, y: i32) {
    let Some(document) = document() else { return };
    let (Ok(proxy), Some(body)) = (document.create_element("div"), document.body()) else { return };
    proxy.set_class_name("dd-drag");
    proxy.set_text_content(Some(&kanji.to_string()));
    proxy.set_attribute("style", PROXY_STYLE).ok();
    place_proxy(&proxy, x, y);
    body.append_child(&proxy).ok();
}

fn place_proxy(proxy: &Element, x: i32, y: i32) {
    if let Some(el) = proxy.dyn_ref::<HtmlElement>() {
        let style = el.style();
        style.set_property("left", &format!("{x}px")).ok();
        style.set_property("top", &format!("{y}px")).ok();
    }
}

fn element_rect(el: &Element) -> Rect {
    let r = el.get_bounding_client_rect();
    Rect::new(r.left(), r.top(), r.width(), r.height())
}

/// Current on-screen drop zones.
fn zone_layout() -> ZoneLayout {
    let Some(root) = document().and_then(|d| d.document_element()) else { return ZoneLayout::new() };
    select_all(&root, ".dd-zone")
        .iter()
        .filter_map(|el| Some((data_index(el, "data-zone")?, element_rect(el))))
        .collect()
}

fn select_all(root: &Element, selector: &str) -> Vec<Element> {
    let Ok(list) = root.query_selector_all(selector) else { return Vec::new() };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}

// --- Timers -------------------------------------------------------------------

fn fire_timer(timer: Timer) {
    with_app(|app| app.session.on_timer(timer, &mut app.view));
}

// --- History click-through -------------------------------------------------------

/// Detail views registered on `window` by the dictionary and word screens.
struct GlobalHooks;

fn call_global(name: &str, args: &[JsValue]) {
    let Some(window) = web_sys::window() else { return };
    let func = js_sys::Reflect::get(&window, &JsValue::from_str(name))
        .and_then(|v| v.dyn_into::<js_sys::Function>());
    let Ok(func) = func else {
        log::warn!("{name} is not registered");
        return;
    };
    let args: js_sys::Array = args.iter().collect();
    if let Err(err) = func.apply(&JsValue::NULL, &args) {
        log::warn!("{name} failed: {err:?}");
    }
}

impl DetailHooks for GlobalHooks {
    fn open_dictionary(&mut self, query: &str, return_to_game: bool) {
        call_global("__openDictionaryWithQuery", &[JsValue::from_str(query), JsValue::from_bool(return_to_game)]);
    }

    fn open_word_detail(&mut self, meta: &WordMeta) {
        let value = serde_json::to_value(meta).map(|v| to_js(&v)).unwrap_or(JsValue::NULL);
        call_global("__openWordDetail", &[value]);
    }
}

// --- DOM view -------------------------------------------------------------------

struct DomView {
    document: Document,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map(|c| c.to_ascii_uppercase().to_string() + chars.as_str()).unwrap_or_default()
}

fn set_display(el: &Element, value: &str) {
    if let Some(el) = el.dyn_ref::<HtmlElement>() {
        el.style().set_property("display", value).ok();
    }
}

impl DomView {
    fn el(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn root(&self) -> Option<Element> {
        self.document.document_element()
    }

    fn select_all(&self, selector: &str) -> Vec<Element> {
        self.root().map(|r| select_all(&r, selector)).unwrap_or_default()
    }

    fn append(&self, parent: &Element, tag: &str, class: &str, text: &str) -> Option<Element> {
        let el = self.document.create_element(tag).ok()?;
        el.set_class_name(class);
        el.set_text_content(Some(text));
        parent.append_child(&el).ok()?;
        Some(el)
    }

    fn choice_button(&self, parent: &Element, idx: usize, text: &str, class: &str) -> Option<Element> {
        let button = self.append(parent, "button", class, text)?;
        button.set_attribute("type", "button").ok();
        button.set_attribute("data-idx", &idx.to_string()).ok();
        Some(button)
    }

    /// Choice button showing the meaning picture. A picture that fails to
    /// load is swapped for `text` by [`on_meaning_image_error`].
    fn meaning_choice(&self, parent: &Element, idx: usize, src: &str, text: &str) {
        let Some(button) = self.choice_button(parent, idx, "", "choice meaningChoice") else { return };
        button.set_attribute("data-text", text).ok();
        let Some(img) = self.append(&button, "img", "meaningImg", "") else {
            button.set_text_content(Some(text));
            return;
        };
        img.set_attribute("alt", text).ok();
        img.set_attribute("draggable", "false").ok();
        img.set_attribute("src", src).ok();
    }

    fn zone(&self, zone: usize) -> Option<Element> {
        self.document.query_selector(&format!(".dd-zone[data-zone=\"{zone}\"]")).ok().flatten()
    }

    fn view_for(&self, tab: Tab) -> Option<Element> {
        let name = tab.as_str();
        self.select_all(&format!(".view[data-view=\"{name}\"]"))
            .into_iter()
            .next()
            .or_else(|| self.el(&format!("view{}", capitalize(name))))
    }

    fn buttons_for(&self, tab: Tab) -> Vec<Element> {
        let name = tab.as_str();
        let buttons = self.select_all(&format!(".tabs [data-tab=\"{name}\"]"));
        if !buttons.is_empty() {
            return buttons;
        }
        self.el(&format!("tab{}", capitalize(name))).into_iter().collect()
    }

    /// Tab of the `.view` currently marked active.
    fn active_tab(&self) -> Option<Tab> {
        let view = self.select_all(".view.active").into_iter().next()?;
        let name = view.get_attribute("data-view").or_else(|| view.id().strip_prefix("view").map(str::to_owned))?;
        Some(Tab::parse(&name))
    }

    fn mark_prompt(&self, ok: bool) {
        if let Some(prompt) = self.el("prompt") {
            let cl = prompt.class_list();
            cl.remove_1("drag-idle").ok();
            cl.add_1(if ok { "correct" } else { "wrong" }).ok();
        }
    }
}

impl QuizView for DomView {
    fn set_active_tab(&mut self, tab: Tab) {
        for view in self.select_all(".view") {
            view.class_list().remove_1("active").ok();
            set_display(&view, "none");
        }
        for button in self.select_all(".tabs .tab") {
            button.class_list().remove_1("active").ok();
        }
        let (tab, view) = match self.view_for(tab) {
            Some(view) => (tab, Some(view)),
            None => {
                log::warn!("missing view for tab {tab}, showing home");
                (Tab::Home, self.view_for(Tab::Home))
            }
        };
        if let Some(view) = view {
            view.class_list().add_1("active").ok();
            set_display(&view, "block");
        }
        for button in self.buttons_for(tab) {
            button.class_list().add_1("active").ok();
        }
    }

    fn alert(&mut self, message: &str) {
        if let Some(window) = web_sys::window() {
            window.alert_with_message(message).ok();
        }
    }

    fn render_question(&mut self, question: &Question) {
        if let Some(prompt) = self.el("prompt") {
            prompt.class_list().remove_3("correct", "wrong", "drag-idle").ok();
        }
        if let Some(grid) = self.el("qaGrid") {
            let cl = grid.class_list();
            cl.remove_3("drag-board", "drag-h", "drag-v").ok();
            if let Question::DragWord(q) = question {
                let layout = match q.layout {
                    Layout::Vertical => "drag-v",
                    Layout::Horizontal => "drag-h",
                };
                cl.add_2("drag-board", layout).ok();
            }
        }
        let (Some(inner), Some(choices)) = (self.el("promptInner"), self.el("choices")) else { return };
        inner.set_inner_html("");
        choices.set_inner_html("");

        match question {
            Question::Single(q) => {
                self.append(&inner, "div", "kanjiText", &q.record.id.to_string());
                for (i, option) in q.options.iter().enumerate() {
                    self.meaning_choice(&choices, i, &option.image_path(), &option.meaning);
                }
            }
            Question::Compound(q) => {
                self.append(&inner, "div", "kanaText", q.kana());
                for (i, kanji) in q.answers.iter().enumerate() {
                    self.choice_button(&choices, i, &kanji.to_string(), "choice kanjiChoice");
                }
            }
            Question::DragWord(q) => {
                let Some(word) = self.append(&inner, "div", "dd-word", "") else { return };
                for zone in &q.zones {
                    let class = if zone.is_trap() { "dd-zone trap" } else { "dd-zone" };
                    if let Some(el) = self.append(&word, "span", class, &zone.reading) {
                        el.set_attribute("data-zone", &zone.id.to_string()).ok();
                    }
                }
                for (i, kanji) in q.answers.iter().enumerate() {
                    if let Some(tile) = self.append(&choices, "div", "dd-tile", &kanji.to_string()) {
                        tile.set_attribute("data-idx", &i.to_string()).ok();
                    }
                }
                if let Some(prompt) = self.el("prompt") {
                    prompt.class_list().add_1("drag-idle").ok();
                }
            }
        }
    }

    fn render_peek(&mut self, content: PeekContent<'_>) {
        let Some(choices) = self.el("choices") else { return };
        choices.set_inner_html("");
        let Some(card) = self.append(&choices, "div", "peekCard", "") else { return };
        match content {
            PeekContent::Kanji(record) => {
                self.append(&card, "div", "peekKanji", &record.id.to_string());
                self.append(&card, "div", "peekMeaning", &record.meaning_key);
                self.append(&card, "div", "peekReadings", &record.onyomi.join("、"));
                self.append(&card, "div", "peekReadings", &record.kunyomi.join("、"));
            }
            PeekContent::Word(meta) => {
                self.append(&card, "div", "peekKanji", &meta.word);
                self.append(&card, "div", "peekReadings", &meta.reading);
                self.append(&card, "div", "peekMeaning", &meta.meaning);
            }
        }
    }

    fn update_hud(&mut self, hud: &Hud) {
        if let Some(el) = self.el("hudLives") {
            el.set_text_content(Some(&format!("❤️ {}", hud.lives_display)));
        }
        if let Some(el) = self.el("hudScore") {
            el.set_text_content(Some(&hud.score.to_string()));
        }
        if let Some(el) = self.el("hudPeek") {
            el.class_list().toggle_with_force("active", hud.peek).ok();
        }
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        let Some(host) = self.el("historyList") else { return };
        host.set_inner_html("");
        for (i, entry) in entries.iter().enumerate() {
            let Some(row) = self.append(&host, "button", "historyRow", "") else { continue };
            row.set_attribute("type", "button").ok();
            row.set_attribute("data-hist", &i.to_string()).ok();
            if let Some(left) = self.append(&row, "div", "historyLeft", "") {
                let (class, mark) = if entry.ok { ("historyMark ok", "✓") } else { ("historyMark bad", "✕") };
                self.append(&left, "div", class, mark);
                self.append(&left, "div", "historyQ", &entry.display);
            }
        }
    }

    fn show_verdict(&mut self, verdict: &Verdict) {
        self.mark_prompt(verdict.ok());
        match verdict {
            Verdict::Choice { chosen, correct, .. } => {
                for button in self.select_all("#choices [data-idx]") {
                    let Some(idx) = data_index(&button, "data-idx") else { continue };
                    if correct.contains(&idx) {
                        button.class_list().add_1("correct").ok();
                    } else if chosen.contains(&idx) {
                        button.class_list().add_1("wrong").ok();
                    }
                    button.set_attribute("disabled", "").ok();
                }
            }
            Verdict::Drop { ok, zone } => {
                if let Some(el) = self.zone(*zone) {
                    el.class_list().add_1(if *ok { "correct" } else { "wrong" }).ok();
                }
            }
        }
    }

    fn fill_zone(&mut self, zone: usize, kanji: char) {
        if let Some(el) = self.zone(zone) {
            el.set_text_content(Some(&kanji.to_string()));
            el.class_list().add_1("filled").ok();
        }
    }

    fn set_zone_hover(&mut self, zone: Option<usize>) {
        for el in self.select_all(".dd-zone.hover") {
            el.class_list().remove_1("hover").ok();
        }
        if let Some(el) = zone.and_then(|z| self.zone(z)) {
            el.class_list().add_1("hover").ok();
        }
    }

    fn clear_drag_proxy(&mut self) {
        for proxy in self.select_all(".dd-drag") {
            proxy.remove();
        }
        for tile in self.select_all(".dd-tile.dragging") {
            tile.class_list().remove_1("dragging").ok();
        }
    }

    fn show_game_over(&mut self, final_score: i32) {
        if let Some(el) = self.el("finalScore") {
            el.set_text_content(Some(&final_score.to_string()));
        }
        if let Some(overlay) = self.el("overlay") {
            overlay.class_list().remove_1("hidden").ok();
        }
    }

    fn hide_game_over(&mut self) {
        if let Some(overlay) = self.el("overlay") {
            overlay.class_list().add_1("hidden").ok();
        }
    }

    fn schedule(&mut self, timer: Timer, delay_ms: u32) {
        let Some(window) = web_sys::window() else { return };
        let callback = Closure::once_into_js(move || fire_timer(timer));
        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        if let Err(err) = window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay) {
            log::warn!("setTimeout failed: {err:?}");
        }
    }
}
