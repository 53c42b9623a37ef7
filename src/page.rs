//! Host-page seam: where a pass reads its inputs and writes the address bar.

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

#[async_trait]
pub trait PageHost: Send + Sync {
    /// Resolve once the host considers its content loaded. The pipeline
    /// defers everything until this returns.
    async fn wait_content_loaded(&self);

    /// Full page URL at the start of the pass.
    fn current_url(&self) -> Url;

    /// Raw `Cookie`-header text, if the host has one.
    fn raw_cookies(&self) -> Option<String>;

    /// Swap the address-bar URL in place. Must never navigate or grow the
    /// history stack.
    fn replace_url(&self, url: &Url);
}

/// Fixed snapshot of a page. Backs the CLI harness and doubles as the test
/// page: content is loaded immediately and the sanitized URL is recorded
/// instead of shown.
pub struct StaticPage {
    url: Url,
    cookies: Option<String>,
    replaced: Mutex<Option<Url>>,
}

impl StaticPage {
    pub fn new(url: Url, cookies: Option<String>) -> Self {
        Self {
            url,
            cookies,
            replaced: Mutex::new(None),
        }
    }

    /// URL the pass wrote back, if it rewrote anything.
    pub fn replaced_url(&self) -> Option<Url> {
        self.replaced.lock().clone()
    }
}

#[async_trait]
impl PageHost for StaticPage {
    async fn wait_content_loaded(&self) {}

    fn current_url(&self) -> Url {
        self.url.clone()
    }

    fn raw_cookies(&self) -> Option<String> {
        self.cookies.clone()
    }

    fn replace_url(&self, url: &Url) {
        *self.replaced.lock() = Some(url.clone());
    }
}
