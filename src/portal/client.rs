// src/portal/client.rs
use crate::portal::page::{Form, Method, Page};
use crate::utils::error::TransportError;
use crate::utils::page_dump::PageDump;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

const PORTAL_USER_AGENT: &str = concat!("timetable-extractor/", env!("CARGO_PKG_VERSION"));

/// A browser-like session: one current page, a history, and form submission.
///
/// Every call is a blocking round-trip and replaces the current page.
pub trait Browser {
    /// Navigates to `url` with `params` appended to its query string.
    fn open(&mut self, url: &str, params: &[(&str, &str)]) -> Result<&Page, TransportError>;

    /// Submits `form`, optionally through the named submit control.
    fn submit_form(&mut self, form: &Form, control: Option<&str>) -> Result<&Page, TransportError>;

    /// Returns to the previous page in history.
    fn back(&mut self) -> Result<&Page, TransportError>;

    fn current(&self) -> Option<&Page>;
}

/// Cookie-keeping HTTP session with an in-memory page history.
pub struct HttpBrowser {
    client: Client,
    history: Vec<Page>,
    dump: Option<PageDump>,
}

impl HttpBrowser {
    /// Builds a session. `session_cookie` is sent verbatim as the `Cookie`
    /// header on every request, for portals that were logged into elsewhere.
    pub fn new(session_cookie: Option<&str>) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*"),
        );
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
            headers.insert(header::COOKIE, value);
        }

        let client = Client::builder()
            .user_agent(PORTAL_USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            history: Vec::new(),
            dump: None,
        })
    }

    /// Saves every loaded page through `dump`.
    pub fn with_page_dump(mut self, dump: PageDump) -> Self {
        self.dump = Some(dump);
        self
    }

    fn load(&mut self, request: RequestBuilder) -> Result<&Page, TransportError> {
        let response = request.send()?; // Propagates reqwest::Error as TransportError::Network

        let status = response.status();
        let url = response.url().clone();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            return Err(TransportError::Http(status, url.to_string()));
        }

        let body = response.text()?;
        tracing::debug!("Loaded {} bytes from {}", body.len(), url);

        if let Some(dump) = self.dump.as_mut() {
            dump.save(url.as_str(), &body)?;
        }

        self.history.push(Page::parse(url, &body));
        self.history.last().ok_or(TransportError::NoPage)
    }
}

impl Browser for HttpBrowser {
    fn open(&mut self, url: &str, params: &[(&str, &str)]) -> Result<&Page, TransportError> {
        let url = Url::parse(url)?;
        tracing::debug!("Opening {}", url);
        let request = self.client.get(url).query(params);
        self.load(request)
    }

    fn submit_form(&mut self, form: &Form, control: Option<&str>) -> Result<&Page, TransportError> {
        let current = self.current().ok_or(TransportError::NoPage)?;
        // An empty action posts back to the page itself
        let target = if form.action().is_empty() {
            current.url().clone()
        } else {
            current.url().join(form.action())?
        };

        let payload = form.payload(control);
        tracing::debug!(
            "Submitting {} fields to {} via {:?}",
            payload.len(),
            target,
            control.unwrap_or("<none>")
        );

        let request = match form.method() {
            Method::Post => self.client.post(target).form(&payload),
            Method::Get => self.client.get(target).query(&payload),
        };
        self.load(request)
    }

    fn back(&mut self) -> Result<&Page, TransportError> {
        if self.history.len() < 2 {
            return Err(TransportError::NoHistory);
        }
        self.history.pop();
        let page = self.history.last().ok_or(TransportError::NoPage)?;
        tracing::debug!("Back to {}", page.url());
        Ok(page)
    }

    fn current(&self) -> Option<&Page> {
        self.history.last()
    }
}
