use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::errors::FlowError;

static FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form\s*>").expect("form pattern is valid")
});

static INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("input pattern is valid"));

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

static AUTO_SUBMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(onload\s*=\s*["'][^"']*\.submit\(\)|<script\b[^>]*>.*?\.submit\(\).*?</script>)"#)
        .expect("auto-submit pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// An HTML form with its current field values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub id: Option<String>,
    /// Absolute submission URL
    pub action: Url,
    pub method: FormMethod,
    /// Field names and values in document order
    pub fields: Vec<(String, String)>,
}

impl Form {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Update the first field called `name`, or append it
    pub fn set(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// All forms of `html`, with actions resolved against `page_url`
pub fn extract_forms(html: &str, page_url: &Url) -> Result<Vec<Form>, FlowError> {
    FORM_RE
        .captures_iter(html)
        .map(|caps| -> Result<Form, FlowError> {
            let attrs = &caps[1];
            let body = &caps[2];

            let action = match attribute(attrs, "action").filter(|a| !a.is_empty()) {
                Some(action) => page_url.join(&action)?,
                None => page_url.clone(),
            };
            let method = match attribute(attrs, "method") {
                Some(m) if m.eq_ignore_ascii_case("get") => FormMethod::Get,
                _ => FormMethod::Post,
            };

            Ok(Form {
                id: attribute(attrs, "id"),
                action,
                method,
                fields: fields(body),
            })
        })
        .collect()
}

/// The form selected by `selector`: `form` for the first form, `#id` or
/// `form#id` for a form by id.
pub fn extract_form(html: &str, selector: &str, page_url: &Url) -> Result<Form, FlowError> {
    let forms = extract_forms(html, page_url)?;
    let wanted_id = selector
        .strip_prefix("form")
        .unwrap_or(selector)
        .strip_prefix('#');

    let found = match (selector, wanted_id) {
        ("form", _) => forms.into_iter().next(),
        (_, Some(id)) => forms.into_iter().find(|f| f.id.as_deref() == Some(id)),
        _ => None,
    };

    found.ok_or_else(|| FlowError::FormNotFound {
        hop: 0,
        selector: selector.to_string(),
    })
}

/// True when the page submits a form by itself, through `onload` or a script
pub(crate) fn is_auto_submitting(html: &str) -> bool {
    AUTO_SUBMIT_RE.is_match(html)
}

fn fields(body: &str) -> Vec<(String, String)> {
    INPUT_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let attrs = &caps[1];
            let name = attribute(attrs, "name").filter(|n| !n.is_empty())?;
            let kind = attribute(attrs, "type").unwrap_or_default().to_lowercase();

            match kind.as_str() {
                "submit" | "button" | "reset" | "image" | "file" => None,
                "checkbox" | "radio" if !has_attribute(attrs, "checked") => None,
                _ => Some((name, attribute(attrs, "value").unwrap_or_default())),
            }
        })
        .collect()
}

fn attribute(attrs: &str, wanted: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(wanted))
        .map(|caps| {
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            decode_entities(raw)
        })
}

fn has_attribute(attrs: &str, wanted: &str) -> bool {
    ATTR_RE
        .captures_iter(attrs)
        .any(|caps| caps[1].eq_ignore_ascii_case(wanted))
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
