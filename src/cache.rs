//! Offline cache policy for the service worker and the meaning-image download.
//!
//! Two caches are kept: the versioned app shell filled on install, and a
//! runtime cache that collects everything fetched later, including meaning
//! images. Meaning images are only ever read from the runtime cache at play
//! time; they reach it through an explicit download.
//!
//! The decisions live here as plain functions; `web::service_worker` and
//! the page's download action apply them over the browser Cache API.

use std::collections::BTreeSet;

use crate::error::CacheError;

/// Versioned app-shell cache. Bump to force a reinstall.
pub const SHELL_CACHE: &str = "kanji-snap-cache-v1.87";
/// Cache for everything fetched after install.
pub const RUNTIME_CACHE: &str = "kanji-snap-runtime-v1";

pub const APP_SHELL: &str = "./index.html";

/// Precached on install, relative to the app's base path.
pub const PRECACHE_URLS: &[&str] = &[
    "./",
    "./index.html",
    "./styles.css",
    "./manifest.webmanifest",
    "./sw.js",
    "./pkg/kanji_snap.js",
    "./pkg/kanji_snap_bg.wasm",
    "./data/grade-1.json",
    "./data/grade-2.json",
    "./data/grade-3.json",
    "./data/words.v2.csv",
];

pub const MEANING_IMAGE_DIR: &str = "./images/meaning/cartoon/";
const MEANING_PATH_MARKER: &str = "/images/meaning/cartoon/";
const MEANING_EXT: &str = ".webp";

/// Query parameter marking a meaning image request as a download.
pub const DOWNLOAD_PARAM: &str = "dl";

/// Relative path of the meaning image for `kanji`.
pub fn meaning_image_path(kanji: char) -> String {
    format!("{MEANING_IMAGE_DIR}{kanji}{MEANING_EXT}")
}

pub fn is_meaning_image_path(path: &str) -> bool {
    path.contains(MEANING_PATH_MARKER) && path.ends_with(MEANING_EXT)
}

/// Decode `%XX` escapes. Malformed escapes are kept as is.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// An intercepted request.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub method: &'a str,
    /// Absolute URL.
    pub url: &'a str,
    /// Origin the worker runs on, e.g. `https://example.org`.
    pub origin: &'a str,
    pub navigate: bool,
}

/// How the worker treats a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Meaning image with the download marker: network, then store under `key`.
    MeaningDownload { key: String },
    /// Meaning image read: runtime cache by `key`, then the `CacheFirst` path.
    MeaningCacheOnly { key: String, url: String },
    CacheFirst { key: String, navigate: bool },
    /// Not ours to answer.
    Passthrough,
}

impl Route {
    pub fn classify(req: &FetchRequest<'_>) -> Route {
        if !req.method.eq_ignore_ascii_case("GET") {
            return Route::Passthrough;
        }
        let Some(rest) = req.url.strip_prefix(req.origin) else {
            return Route::Passthrough;
        };
        if !(rest.is_empty() || rest.starts_with('/')) {
            return Route::Passthrough;
        }

        if let Some(key) = meaning_key(rest) {
            let rest = rest.split('#').next().unwrap_or_default();
            let query = rest.split_once('?').map_or("", |(_, q)| q);
            let download = query.split('&').any(|p| p.split('=').next() == Some(DOWNLOAD_PARAM));
            if download {
                return Route::MeaningDownload { key };
            }
            return Route::MeaningCacheOnly { key, url: req.url.to_owned() };
        }
        Route::CacheFirst { key: req.url.to_owned(), navigate: req.navigate }
    }
}

/// Caches left behind by older versions, to delete on activate.
pub fn stale_caches<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    names
        .into_iter()
        .filter(|n| *n != SHELL_CACHE && *n != RUNTIME_CACHE)
        .map(str::to_owned)
        .collect()
}

/// Cache key of a meaning image URL or pathname: the decoded pathname
/// without query or fragment. `None` for anything else.
pub fn meaning_key(url: &str) -> Option<String> {
    let path = match url.split_once("://") {
        Some((_, rest)) => &rest[rest.find('/')?..],
        None => url,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    is_meaning_image_path(path).then(|| percent_decode(path))
}

/// Distinct meaning images among cached request URLs.
pub fn count_meaning_images<'a>(urls: impl IntoIterator<Item = &'a str>) -> usize {
    urls.into_iter().filter_map(meaning_key).collect::<BTreeSet<_>>().len()
}

/// Result of downloading one meaning image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Stored,
    AlreadyCached,
    Failed(CacheError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub stored: usize,
    pub already_cached: usize,
    pub failed: Vec<(char, CacheError)>,
}

impl DownloadReport {
    pub fn record(&mut self, kanji: char, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Stored => self.stored += 1,
            DownloadOutcome::AlreadyCached => self.already_cached += 1,
            DownloadOutcome::Failed(err) => {
                log::warn!("meaning image for {kanji}: {err}");
                self.failed.push((kanji, err));
            }
        }
    }

    pub fn failed_kanji(&self) -> Vec<char> {
        self.failed.iter().map(|(k, _)| *k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://kanji.test";

    fn get(url: &str) -> FetchRequest<'_> {
        FetchRequest { method: "GET", url, origin: ORIGIN, navigate: false }
    }

    #[test]
    fn routes() {
        assert_eq!(
            Route::classify(&get("https://kanji.test/app/images/meaning/cartoon/%E5%B1%B1.webp?dl=1")),
            Route::MeaningDownload { key: "/app/images/meaning/cartoon/山.webp".into() }
        );
        assert_eq!(
            Route::classify(&get("https://kanji.test/images/meaning/cartoon/山.webp#x")),
            Route::MeaningCacheOnly {
                key: "/images/meaning/cartoon/山.webp".into(),
                url: "https://kanji.test/images/meaning/cartoon/山.webp#x".into()
            }
        );
        assert!(matches!(Route::classify(&get("https://kanji.test/data/grade-1.json")), Route::CacheFirst { .. }));
        let nav = FetchRequest { navigate: true, ..get("https://kanji.test/app/kanji") };
        assert!(matches!(Route::classify(&nav), Route::CacheFirst { navigate: true, .. }));
        assert_eq!(Route::classify(&get("https://cdn.test/x.js")), Route::Passthrough);
        assert_eq!(Route::classify(&get("https://kanji.test.evil/x.js")), Route::Passthrough);
        let post = FetchRequest { method: "POST", ..get("https://kanji.test/x") };
        assert_eq!(Route::classify(&post), Route::Passthrough);
    }

    #[test]
    fn percent_decoding_keeps_malformed_escapes() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn meaning_keys_match_for_urls_and_paths() {
        let stored = meaning_key("/app/images/meaning/cartoon/山.webp");
        assert_eq!(stored.as_deref(), Some("/app/images/meaning/cartoon/山.webp"));
        assert_eq!(meaning_key("https://kanji.test/app/images/meaning/cartoon/%E5%B1%B1.webp?dl=1"), stored);
        assert_eq!(meaning_key("https://kanji.test/data/grade-1.json"), None);
        assert_eq!(meaning_key("https://kanji.test"), None);
        assert!(meaning_key(&meaning_image_path('川')).is_some());
    }

    #[test]
    fn only_current_caches_survive_activation() {
        let names = ["kanji-snap-cache-v1.80", SHELL_CACHE, RUNTIME_CACHE, "other"];
        assert_eq!(stale_caches(names), vec!["kanji-snap-cache-v1.80".to_owned(), "other".to_owned()]);
    }

    #[test]
    fn cached_meaning_images_are_counted_once_per_key() {
        let keys = [
            "https://kanji.test/images/meaning/cartoon/%E5%B1%B1.webp",
            "https://kanji.test/images/meaning/cartoon/山.webp",
            "https://kanji.test/images/meaning/cartoon/%E5%B7%9D.webp",
            "https://kanji.test/data/grade-1.json",
        ];
        assert_eq!(count_meaning_images(keys), 2);
    }

    #[test]
    fn download_report_tallies_outcomes() {
        let mut report = DownloadReport::default();
        report.record('山', DownloadOutcome::Stored);
        report.record('川', DownloadOutcome::AlreadyCached);
        report.record('田', DownloadOutcome::Failed(CacheError::Status { key: "k".into(), status: 404 }));
        assert_eq!((report.stored, report.already_cached), (1, 1));
        assert_eq!(report.failed_kanji(), vec!['田']);
    }
}
