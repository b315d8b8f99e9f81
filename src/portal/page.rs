// src/portal/page.rs

// --- Imports ---
use crate::utils::error::PortalError;
use once_cell::sync::Lazy;
use scraper::{html::Select, ElementRef, Html, Selector};
use url::Url;

// --- CSS Selectors (Lazy Static) ---
static FORM_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("form").expect("Failed to compile FORM_SELECTOR")
});

// Every element that can contribute to a form submission
static CONTROL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("input, select, textarea, button").expect("Failed to compile CONTROL_SELECTOR")
});

static OPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("option").expect("Failed to compile OPTION_SELECTOR")
});

// --- Data Structures ---

/// A loaded document together with the URL it was served from.
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    html: Html,
}

impl Page {
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> Select<'a, 'b> {
        self.html.select(selector)
    }

    /// Returns the state of the first `<form>` on the page.
    pub fn form(&self) -> Result<Form, PortalError> {
        self.html
            .select(&FORM_SELECTOR)
            .next()
            .map(Form::from_element)
            .ok_or(PortalError::FormNotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One named value the form sends on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    value: String,
    /// Enumerated values when the field is a `<select>`.
    options: Option<Vec<String>>,
}

/// Assignable form state plus the controls that can submit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    action: String,
    method: Method,
    fields: Vec<Field>,
    controls: Vec<(String, String)>,
}

impl Form {
    pub fn from_element(form: ElementRef) -> Self {
        let action = form.value().attr("action").unwrap_or_default().trim().to_string();
        let method = match form.value().attr("method") {
            Some(m) if m.eq_ignore_ascii_case("post") => Method::Post,
            _ => Method::Get,
        };

        let mut fields = Vec::new();
        let mut controls = Vec::new();

        for element in form.select(&CONTROL_SELECTOR) {
            let name = match element.value().attr("name") {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => continue,
            };
            let value = element.value().attr("value").unwrap_or_default().to_string();

            match element.value().name() {
                "input" => {
                    let input_type = element.value().attr("type").unwrap_or("text").to_lowercase();
                    match input_type.as_str() {
                        // Only sent when clicked
                        "submit" | "image" => controls.push((name, value)),
                        "button" | "reset" | "file" => {}
                        "checkbox" | "radio" => {
                            if element.value().attr("checked").is_some() {
                                let value = if value.is_empty() { "on".to_string() } else { value };
                                fields.push(Field { name, value, options: None });
                            }
                        }
                        _ => fields.push(Field { name, value, options: None }),
                    }
                }
                "button" => {
                    let button_type = element.value().attr("type").unwrap_or("submit");
                    if button_type.eq_ignore_ascii_case("submit") {
                        controls.push((name, value));
                    }
                }
                "select" => fields.push(Self::parse_select(element, name)),
                "textarea" => {
                    let text = element.text().collect::<String>();
                    fields.push(Field { name, value: text, options: None });
                }
                _ => {}
            }
        }

        tracing::trace!(
            "Parsed form: {} fields, {} submit controls, action '{}'",
            fields.len(),
            controls.len(),
            action
        );

        Self { action, method, fields, controls }
    }

    fn parse_select(select: ElementRef, name: String) -> Field {
        let mut options = Vec::new();
        let mut selected = None;

        for option in select.select(&OPTION_SELECTOR) {
            let value = match option.value().attr("value") {
                Some(v) => v.to_string(),
                None => option.text().collect::<String>().trim().to_string(),
            };
            if selected.is_none() && option.value().attr("selected").is_some() {
                selected = Some(value.clone());
            }
            options.push(value);
        }

        let value = selected.or_else(|| options.first().cloned()).unwrap_or_default();
        Field { name, value, options: Some(options) }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.value.as_str())
    }

    /// Assigns a field. A `<select>` only accepts one of its enumerated options.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), PortalError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| PortalError::UnknownField(name.to_string()))?;

        if let Some(options) = &field.options {
            if !options.iter().any(|o| o == value) {
                return Err(PortalError::InvalidOption {
                    field: name.to_string(),
                    value: value.to_string(),
                    options: options.clone(),
                });
            }
        }

        field.value = value.to_string();
        Ok(())
    }

    /// Enumerated options of a field; empty for free-text fields.
    pub fn options(&self, name: &str) -> Result<&[String], PortalError> {
        let field = self
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| PortalError::UnknownField(name.to_string()))?;
        Ok(field.options.as_deref().unwrap_or_default())
    }

    pub fn controls(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_control(&self, name: &str) -> bool {
        self.controls.iter().any(|(n, _)| n == name)
    }

    /// Name/value pairs sent when the form is submitted through `control`.
    pub fn payload(&self, control: Option<&str>) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect();

        if let Some(control) = control {
            if let Some(pair) = self.controls.iter().find(|(n, _)| n == control) {
                params.push(pair.clone());
            }
        }

        params
    }
}
