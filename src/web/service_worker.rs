//! Service worker entry points over the browser Cache API.
//!
//! The JS shim forwards lifecycle events:
//!
//! ```js
//! self.addEventListener("install", (e) => e.waitUntil(wasm.sw_install()));
//! self.addEventListener("activate", (e) => e.waitUntil(wasm.sw_activate()));
//! self.addEventListener("fetch", (e) => wasm.sw_handle_fetch(e));
//! ```

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{Cache, CacheStorage, FetchEvent, Request, RequestMode, Response, ServiceWorkerGlobalScope};

use crate::cache::{APP_SHELL, FetchRequest, PRECACHE_URLS, RUNTIME_CACHE, Route, SHELL_CACHE, stale_caches};

fn scope() -> Result<ServiceWorkerGlobalScope, JsValue> {
    js_sys::global().dyn_into::<ServiceWorkerGlobalScope>().map_err(JsValue::from)
}

fn caches() -> Result<CacheStorage, JsValue> {
    scope()?.caches()
}

async fn open(name: &str) -> Result<Cache, JsValue> {
    JsFuture::from(caches()?.open(name)).await?.dyn_into()
}

/// `Some` when a cache lookup promise resolved to a response.
async fn matched(promise: js_sys::Promise) -> Result<Option<Response>, JsValue> {
    let value = JsFuture::from(promise).await?;
    Ok(value.dyn_into::<Response>().ok())
}

async fn network(request: &Request) -> Result<Response, JsValue> {
    JsFuture::from(scope()?.fetch_with_request(request)).await?.dyn_into()
}

/// Precache the app shell. A URL that fails is logged and skipped.
#[wasm_bindgen]
pub async fn sw_install() -> Result<(), JsValue> {
    let cache = open(SHELL_CACHE).await?;
    for url in PRECACHE_URLS {
        if let Err(err) = JsFuture::from(cache.add_with_str(url)).await {
            log::warn!("precache failed: {url}: {err:?}");
        }
    }
    JsFuture::from(scope()?.skip_waiting()?).await?;
    Ok(())
}

/// Delete caches left behind by older versions and take over open pages.
#[wasm_bindgen]
pub async fn sw_activate() -> Result<(), JsValue> {
    let storage = caches()?;
    let names: js_sys::Array = JsFuture::from(storage.keys()).await?.dyn_into()?;
    let names: Vec<String> = names.iter().filter_map(|n| n.as_string()).collect();
    for name in stale_caches(names.iter().map(String::as_str)) {
        JsFuture::from(storage.delete(&name)).await?;
        log::info!("deleted stale cache {name}");
    }
    JsFuture::from(scope()?.clients().claim()).await?;
    Ok(())
}

/// Runtime cache lookup by key. Resolves to `undefined` on a miss.
#[wasm_bindgen]
pub async fn sw_read_cached(key: String) -> Result<JsValue, JsValue> {
    let cache = open(RUNTIME_CACHE).await?;
    Ok(matched(cache.match_with_str(&key)).await?.map(JsValue::from).unwrap_or(JsValue::UNDEFINED))
}

/// Fetch `key` and store a successful response under it. Offline, an
/// existing cached copy answers instead.
#[wasm_bindgen]
pub async fn sw_fetch_and_store(key: String) -> Result<Response, JsValue> {
    let cache = open(RUNTIME_CACHE).await?;
    let fetched = JsFuture::from(scope()?.fetch_with_str(&key)).await;
    match fetched.and_then(|v| v.dyn_into::<Response>()) {
        Ok(response) => {
            if response.ok() {
                JsFuture::from(cache.put_with_str(&key, &response.clone()?)).await?;
            }
            Ok(response)
        }
        Err(err) => matched(cache.match_with_str(&key)).await?.ok_or(err),
    }
}

async fn cache_first(request: Request, navigate: bool) -> Result<Response, JsValue> {
    if let Some(hit) = matched(caches()?.match_with_request(&request)).await? {
        return Ok(hit);
    }
    match network(&request).await {
        Ok(response) => {
            if response.ok() {
                let cache = open(RUNTIME_CACHE).await?;
                JsFuture::from(cache.put_with_request(&request, &response.clone()?)).await?;
            }
            Ok(response)
        }
        Err(err) if navigate => matched(caches()?.match_with_str(APP_SHELL)).await?.ok_or(err),
        Err(err) => Err(err),
    }
}

async fn respond(route: Route, request: Request) -> Result<JsValue, JsValue> {
    let response = match route {
        Route::MeaningDownload { key } => sw_fetch_and_store(key).await?,
        Route::MeaningCacheOnly { key, .. } => {
            let cache = open(RUNTIME_CACHE).await?;
            match matched(cache.match_with_str(&key)).await? {
                Some(hit) => hit,
                None => cache_first(request, false).await?,
            }
        }
        Route::CacheFirst { navigate, .. } => cache_first(request, navigate).await?,
        Route::Passthrough => network(&request).await?,
    };
    Ok(response.into())
}

/// Answer a fetch event according to its [`Route`]. Passthrough requests
/// are left to the browser.
#[wasm_bindgen]
pub fn sw_handle_fetch(event: FetchEvent) -> Result<(), JsValue> {
    let request = event.request();
    let origin = scope()?.location().origin();
    let method = request.method();
    let url = request.url();
    let route = Route::classify(&FetchRequest {
        method: &method,
        url: &url,
        origin: &origin,
        navigate: request.mode() == RequestMode::Navigate,
    });
    if route == Route::Passthrough {
        return Ok(());
    }
    event.respond_with(&future_to_promise(respond(route, request)))
}
