use regex::Regex;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("form has no action attribute")]
    MissingAction,
    #[error("form has no method attribute")]
    MissingMethod,
    #[error("form has no named, typed inputs")]
    NoInputs,
}

/// One `<input>` that carries both a `name` and a `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormInput {
    pub name: String,
    pub kind: String,
    pub value: String,
}

impl FormInput {
    /// Submit buttons and hidden fields keep their value; everything else is fuzzed.
    pub fn is_fixed(&self) -> bool {
        self.kind == "submit" || self.kind == "hidden"
    }
}

/// A parsed form, ready to be filled with a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FormTemplate {
    pub action: String,
    pub method: String,
    pub inputs: Vec<FormInput>,
}

impl FormTemplate {
    /// Builds the submission map in one pass. A repeated name overwrites the
    /// earlier entry in place, so field order is first-seen order.
    pub fn fill(&self, payload: &str) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let value = if input.is_fixed() {
                input.value.clone()
            } else {
                payload.to_string()
            };
            match fields.iter_mut().find(|(name, _)| *name == input.name) {
                Some(existing) => existing.1 = value,
                None => fields.push((input.name.clone(), value)),
            }
        }
        fields
    }
}

/// Renders submitted fields as `{'name': 'value', ...}` for hit lines.
/// Values go in verbatim, so the line shows exactly what was sent.
pub fn describe_fields(fields: &[(String, String)]) -> String {
    let body = fields
        .iter()
        .map(|(k, v)| format!("'{}': '{}'", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

/// Regex-based form scraper. Pages are matched as flat text, so the
/// extractor tolerates broken markup rather than building a DOM.
pub struct FormExtractor {
    form_block: Regex,
    form_open: Regex,
    input_tag: Regex,
    attribute: Regex,
}

impl FormExtractor {
    pub fn new() -> Self {
        Self {
            form_block: Regex::new(r"(?is)<form\b.*?</form\s*>").expect("static regex"),
            form_open: Regex::new(r"(?is)<form\b[^>]*>").expect("static regex"),
            input_tag: Regex::new(r"(?is)<input\b[^>]*>").expect("static regex"),
            attribute: Regex::new(
                r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )
            .expect("static regex"),
        }
    }

    /// Pulls every `<form>...</form>` block out of a page, newlines removed.
    pub fn extract_forms(&self, body: &str) -> Vec<String> {
        let flat: String = body.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        self.form_block
            .find_iter(&flat)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Parses one form block found on `page_url`.
    pub fn parse_form(&self, form: &str, page_url: &str) -> Result<FormTemplate, FormError> {
        let open_tag = self
            .form_open
            .find(form)
            .map(|m| m.as_str())
            .ok_or(FormError::MissingAction)?;

        let action = self
            .attr(open_tag, "action")
            .filter(|a| !a.is_empty())
            .ok_or(FormError::MissingAction)?;
        let method = self
            .attr(open_tag, "method")
            .filter(|m| !m.is_empty())
            .ok_or(FormError::MissingMethod)?
            .to_uppercase();

        let inputs: Vec<FormInput> = self
            .input_tag
            .find_iter(form)
            .filter_map(|tag| {
                let tag = tag.as_str();
                let name = self.attr(tag, "name")?;
                let kind = self.attr(tag, "type")?.to_lowercase();
                let value = self.attr(tag, "value").unwrap_or_default();
                Some(FormInput { name, kind, value })
            })
            .collect();

        if inputs.is_empty() {
            return Err(FormError::NoInputs);
        }

        Ok(FormTemplate {
            action: resolve_action(page_url, &action),
            method,
            inputs,
        })
    }

    fn attr(&self, tag: &str, wanted: &str) -> Option<String> {
        self.attribute.captures_iter(tag).find_map(|caps| {
            let name = caps.get(1)?.as_str();
            if !name.eq_ignore_ascii_case(wanted) {
                return None;
            }
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|v| v.as_str().to_string())
        })
    }
}

impl Default for FormExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves a form action against the page it was found on.
///
/// Absolute URLs are kept, root-relative paths land on the page's origin,
/// and bare names are appended to the page URL as a child path.
pub fn resolve_action(page_url: &str, action: &str) -> String {
    let lower = action.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return action.to_string();
    }

    if action.starts_with('/') {
        if let Ok(joined) = Url::parse(page_url).and_then(|base| base.join(action)) {
            return joined.to_string();
        }
        return format!("{}{}", page_url.trim_end_matches('/'), action);
    }

    format!("{}/{}", page_url.trim_end_matches('/'), action)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<form action="/search" method="get">
  <input type="text" name="q">
  <input type="hidden" name="csrf" value="tok123">
  <input type="submit" name="go" value="Search">
  <input name="untyped">
</form>
<p>between</p>
<form action='login.php' method='post'><input type='password' name='pw'></form>
</body></html>"#;

    #[test]
    fn test_extract_forms_splits_blocks() {
        let extractor = FormExtractor::new();
        let forms = extractor.extract_forms(PAGE);
        assert_eq!(forms.len(), 2);
        assert!(forms.iter().all(|f| !f.contains('\n')));
        assert!(forms[0].starts_with("<form action=\"/search\""));
        assert!(forms[1].contains("login.php"));
    }

    #[test]
    fn test_parse_form_fields_and_method() {
        let extractor = FormExtractor::new();
        let forms = extractor.extract_forms(PAGE);
        let form = extractor.parse_form(&forms[0], "http://shop.example.com/catalog").unwrap();
        assert_eq!(form.action, "http://shop.example.com/search");
        assert_eq!(form.method, "GET");
        assert_eq!(form.inputs.len(), 3);
        assert_eq!(form.inputs[1].value, "tok123");
    }

    #[test]
    fn test_fill_keeps_hidden_and_submit() {
        let extractor = FormExtractor::new();
        let forms = extractor.extract_forms(PAGE);
        let form = extractor.parse_form(&forms[0], "http://shop.example.com/").unwrap();
        let fields = form.fill("PAYLOAD");
        assert_eq!(
            fields,
            vec![
                ("q".to_string(), "PAYLOAD".to_string()),
                ("csrf".to_string(), "tok123".to_string()),
                ("go".to_string(), "Search".to_string()),
            ]
        );
    }

    #[test]
    fn test_fill_repeated_name_overwrites_in_place() {
        let form = FormTemplate {
            action: "http://h/a".to_string(),
            method: "POST".to_string(),
            inputs: vec![
                FormInput { name: "x".into(), kind: "hidden".into(), value: "keep".into() },
                FormInput { name: "y".into(), kind: "text".into(), value: String::new() },
                FormInput { name: "x".into(), kind: "text".into(), value: String::new() },
            ],
        };
        let fields = form.fill("P");
        assert_eq!(fields, vec![("x".to_string(), "P".to_string()), ("y".to_string(), "P".to_string())]);
    }

    #[test]
    fn test_relative_action_is_child_path() {
        let extractor = FormExtractor::new();
        let forms = extractor.extract_forms(PAGE);
        let form = extractor.parse_form(&forms[1], "http://shop.example.com/account/").unwrap();
        assert_eq!(form.action, "http://shop.example.com/account/login.php");
        assert_eq!(form.method, "POST");
    }

    #[test]
    fn test_absolute_action_kept() {
        assert_eq!(
            resolve_action("http://a.example.com/x", "https://b.example.com/submit"),
            "https://b.example.com/submit"
        );
    }

    #[test]
    fn test_missing_attributes_are_errors() {
        let extractor = FormExtractor::new();
        let no_action = r#"<form method="post"><input type="text" name="a"></form>"#;
        let no_method = r#"<form action="/x"><input type="text" name="a"></form>"#;
        let no_inputs = r#"<form action="/x" method="post"><textarea name="a"></textarea></form>"#;
        assert_eq!(extractor.parse_form(no_action, "http://h/"), Err(FormError::MissingAction));
        assert_eq!(extractor.parse_form(no_method, "http://h/"), Err(FormError::MissingMethod));
        assert_eq!(extractor.parse_form(no_inputs, "http://h/"), Err(FormError::NoInputs));
    }

    #[test]
    fn test_describe_fields() {
        let fields = vec![("q".to_string(), "a'b".to_string()), ("go".to_string(), "Go".to_string())];
        assert_eq!(describe_fields(&fields), "{'q': 'a'b', 'go': 'Go'}");
    }

    #[test]
    fn test_describe_fields_keeps_payload_bytes() {
        let payload = "eval(compile('for x in range(1):\\n import time\\n time.sleep(30)','a','single'))";
        let fields = vec![("q".to_string(), payload.to_string()), ("emoji".to_string(), "\u{1F525}".to_string())];
        let rendered = describe_fields(&fields);
        assert!(rendered.contains(payload));
        assert!(rendered.contains("'emoji': '\u{1F525}'"));
    }
}
