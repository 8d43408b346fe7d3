use reqwest::Method;

use crate::config::Config;
use crate::swagent::http::Request;

/// How a request is served. Decided per request, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted: other origins and anything that isn't a GET.
    Passthrough,
    /// Network first; any failure or non-2xx falls back to the cached copy.
    ApiNetworkFirst,
    /// Cached copy right away, refreshed in the background.
    ShellStaleWhileRevalidate,
    /// Network first; only a failed request falls back to cache.
    NetworkFirst,
}

pub fn route(config: &Config, request: &Request) -> Route {
    if request.url.origin() != config.origin.origin() {
        return Route::Passthrough;
    }
    // The cache only ever holds GET responses.
    if request.method != Method::GET {
        return Route::Passthrough;
    }

    let path = request.url.path();
    if config.api_pattern.is_match(path) {
        Route::ApiNetworkFirst
    } else if under_prefix(path, &config.shell_prefix) {
        Route::ShellStaleWhileRevalidate
    } else {
        Route::NetworkFirst
    }
}

pub(crate) fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
