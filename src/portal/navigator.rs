// src/portal/navigator.rs
use crate::portal::client::Browser;
use crate::portal::page::{Form, Page};
use crate::utils::error::{PortalError, TransportError};

/// Form state saved when drilling into a page, restored on the way back.
#[derive(Debug)]
struct Frame {
    control: String,
    form: Option<Form>,
}

/// Sole owner of a browser session and of the form state on its current page.
///
/// Drilling into a page with [`Navigator::submit`] returns a [`Scope`]; the
/// session goes back to the submitting page when that scope ends, whether the
/// work done inside it succeeded or not. Scopes borrow the navigator mutably,
/// so nested drill-downs are released in reverse order by construction.
pub struct Navigator<B: Browser> {
    browser: B,
    form: Option<Form>,
    frames: Vec<Frame>,
}

impl<B: Browser> Navigator<B> {
    pub fn new(browser: B) -> Self {
        Self {
            browser,
            form: None,
            frames: Vec::new(),
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Number of drill-downs not yet navigated back from.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn page(&self) -> Result<&Page, PortalError> {
        self.browser
            .current()
            .ok_or(PortalError::Transport(TransportError::NoPage))
    }

    pub fn form(&self) -> Result<&Form, PortalError> {
        self.form.as_ref().ok_or(PortalError::FormNotFound)
    }

    pub fn form_mut(&mut self) -> Result<&mut Form, PortalError> {
        self.form.as_mut().ok_or(PortalError::FormNotFound)
    }

    /// Loads a page and takes its first form as the current form state.
    pub fn open(&mut self, url: &str, params: &[(&str, &str)]) -> Result<&Page, PortalError> {
        debug_assert!(self.frames.is_empty(), "open() while a drill-down is active");
        let page = self.browser.open(url, params)?;
        self.form = page.form().ok();
        Ok(page)
    }

    /// Submits the current form without a control and without a way back.
    pub fn post_form(&mut self) -> Result<&Page, PortalError> {
        debug_assert!(self.frames.is_empty(), "post_form() while a drill-down is active");
        let form = self.form.as_ref().ok_or(PortalError::FormNotFound)?;
        let page = self.browser.submit_form(form, None)?;
        self.form = page.form().ok();
        Ok(page)
    }

    /// Submits the current form through `control` and returns the resulting page as a scope.
    ///
    /// Fails with [`PortalError::FormControlNotFound`] before any navigation
    /// when the form has no such control.
    pub fn submit(&mut self, control: &str) -> Result<Scope<'_, B>, PortalError> {
        self.push_frame(control)?;
        let depth = self.frames.len();
        Ok(Scope {
            navigator: self,
            depth,
            open: true,
        })
    }

    pub(crate) fn push_frame(&mut self, control: &str) -> Result<(), PortalError> {
        let form = self.form.as_ref().ok_or(PortalError::FormNotFound)?;
        if !form.has_control(control) {
            return Err(PortalError::FormControlNotFound {
                requested: control.to_string(),
                available: form.controls().map(str::to_string).collect(),
            });
        }

        tracing::debug!("Submitting through '{}' (depth {})", control, self.frames.len() + 1);
        let page = self.browser.submit_form(form, Some(control))?;
        let next = page.form().ok();

        let previous = std::mem::replace(&mut self.form, next);
        self.frames.push(Frame {
            control: control.to_string(),
            form: previous,
        });
        Ok(())
    }

    pub(crate) fn pop_frame(&mut self) -> Result<(), PortalError> {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => panic!("navigated back with no open frame"),
        };

        tracing::debug!("Navigating back from '{}' (depth {})", frame.control, self.frames.len());
        // On failure the browser stays on this page, so its form stays current
        self.browser.back()?;
        self.form = frame.form;
        Ok(())
    }
}

/// The page reached by one [`Navigator::submit`], valid until the scope ends.
///
/// Ending the scope (by [`Scope::close`] or by dropping it, including during
/// an early return or unwind) navigates back exactly once.
pub struct Scope<'n, B: Browser> {
    navigator: &'n mut Navigator<B>,
    depth: usize,
    open: bool,
}

impl<'n, B: Browser> Scope<'n, B> {
    pub fn page(&self) -> Result<&Page, PortalError> {
        self.navigator.page()
    }

    pub fn form(&self) -> Result<&Form, PortalError> {
        self.navigator.form()
    }

    pub fn form_mut(&mut self) -> Result<&mut Form, PortalError> {
        self.navigator.form_mut()
    }

    /// Drills one level deeper from this page.
    pub fn submit(&mut self, control: &str) -> Result<Scope<'_, B>, PortalError> {
        self.navigator.submit(control)
    }

    /// Navigates back now, reporting a failed back-navigation to the caller.
    pub fn close(mut self) -> Result<(), PortalError> {
        self.exit()
    }

    fn exit(&mut self) -> Result<(), PortalError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        debug_assert_eq!(self.navigator.depth(), self.depth, "frames released out of order");
        self.navigator.pop_frame()
    }
}

impl<B: Browser> Drop for Scope<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.exit() {
            tracing::error!("Failed to navigate back: {}", e);
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::client::testing::{Call, ScriptedBrowser};
    use crate::utils::error::ExtractError;

    const LIST: &str = r#"
        <form method="post">
          <input type="hidden" name="State" value="list" />
          <select name="Filter"><option>A</option><option>B</option></select>
          <input type="submit" name="Open" value="Open" />
        </form>
    "#;

    const DETAIL: &str = r#"
        <form method="post">
          <input type="hidden" name="State" value="detail" />
          <input type="submit" name="Deeper" value="Deeper" />
        </form>
    "#;

    const DEEPEST: &str = "<p>leaf</p>";

    fn navigator() -> Navigator<ScriptedBrowser> {
        let browser = ScriptedBrowser::new()
            .on_open("https://portal.test/list", LIST)
            .on_submit("Open", DETAIL)
            .on_submit("Deeper", DEEPEST);
        let mut nav = Navigator::new(browser);
        nav.open("https://portal.test/list", &[]).unwrap();
        nav
    }

    #[test]
    fn test_scope_returns_to_prior_form_state() {
        let mut nav = navigator();
        nav.form_mut().unwrap().set("Filter", "B").unwrap();
        let before = nav.form().unwrap().clone();

        {
            let scope = nav.submit("Open").unwrap();
            assert_eq!(scope.form().unwrap().get("State"), Some("detail"));
        }

        assert_eq!(nav.depth(), 0);
        assert_eq!(nav.form().unwrap(), &before);
        assert_eq!(nav.page().unwrap().url().path(), "/list");
        assert_eq!(nav.browser().back_count(), 1);
    }

    #[test]
    fn test_scope_goes_back_when_work_fails() {
        let mut nav = navigator();
        let before = nav.form().unwrap().clone();

        let result = (|| -> Result<(), PortalError> {
            let scope = nav.submit("Open")?;
            let _ = scope.page()?;
            Err(ExtractError::MissingStructure("detail table".to_string()).into())
        })();

        assert!(matches!(result, Err(PortalError::Extract(_))));
        assert_eq!(nav.depth(), 0);
        assert_eq!(nav.form().unwrap(), &before);
        assert_eq!(nav.browser().back_count(), 1);
    }

    #[test]
    fn test_close_navigates_back_exactly_once() {
        let mut nav = navigator();

        let scope = nav.submit("Open").unwrap();
        scope.close().unwrap();

        assert_eq!(nav.browser().back_count(), 1);
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn test_nested_scopes_unwind_in_reverse_order() {
        let mut nav = navigator();

        {
            let mut outer = nav.submit("Open").unwrap();
            {
                let inner = outer.submit("Deeper").unwrap();
                assert_eq!(inner.page().unwrap().url().path(), "/submit/Deeper");
                assert!(inner.form().is_err(), "Leaf page has no form");
            }
            assert_eq!(outer.form().unwrap().get("State"), Some("detail"));
            assert_eq!(outer.page().unwrap().url().path(), "/submit/Open");
        }

        assert_eq!(nav.form().unwrap().get("State"), Some("list"));
        assert_eq!(nav.browser().back_count(), 2);
    }

    #[test]
    fn test_unknown_control_fails_without_navigating() {
        let mut nav = navigator();

        let err = nav.submit("Missing").err().unwrap();
        match err {
            PortalError::FormControlNotFound { requested, available } => {
                assert_eq!(requested, "Missing");
                assert_eq!(available, vec!["Open".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(nav.browser().submit_count(), 0);
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn test_failed_submit_leaves_no_frame() {
        let browser = ScriptedBrowser::new()
            .on_open("https://portal.test/list", LIST)
            .failing_on("Open");
        let mut nav = Navigator::new(browser);
        nav.open("https://portal.test/list", &[]).unwrap();

        assert!(matches!(nav.submit("Open"), Err(PortalError::Transport(_))));
        assert_eq!(nav.depth(), 0);
        assert_eq!(nav.browser().back_count(), 0);
        assert_eq!(nav.form().unwrap().get("State"), Some("list"));
    }

    #[test]
    fn test_failed_back_keeps_form_of_current_page() {
        let browser = ScriptedBrowser::new()
            .on_open("https://portal.test/list", LIST)
            .on_submit("Open", DETAIL)
            .failing_back();
        let mut nav = Navigator::new(browser);
        nav.open("https://portal.test/list", &[]).unwrap();

        let scope = nav.submit("Open").unwrap();
        assert!(matches!(scope.close(), Err(PortalError::Transport(_))));

        assert_eq!(nav.depth(), 0);
        assert_eq!(nav.browser().back_count(), 1);
        assert_eq!(nav.page().unwrap().url().path(), "/submit/Open");
        assert_eq!(nav.form().unwrap().get("State"), Some("detail"));
    }

    #[test]
    fn test_post_form_moves_forward_only() {
        let mut nav = navigator();

        nav.post_form().unwrap();

        assert_eq!(nav.depth(), 0);
        assert!(matches!(
            nav.browser().calls.last(),
            Some(Call::Submit { control: None, .. })
        ));
    }
}
