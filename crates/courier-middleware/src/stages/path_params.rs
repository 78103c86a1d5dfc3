//! Path parameter substitution.
//!
//! Replaces placeholders in the request URL with fields of the parsed input:
//!
//! | Style     | Template        | Input        | URL          |
//! |-----------|-----------------|--------------|--------------|
//! | `Colon`   | `/users/:id`    | `{"id": 7}`  | `/users/7`   |
//! | `Bracket` | `/users/[id]`   | `{"id": 7}`  | `/users/7`   |
//!
//! Substituted values must be strings or numbers. Whitespace is removed from
//! string values. With stripping enabled (the default), consumed fields are
//! removed from the input so they are not sent again as query or body.
//!
//! A scalar input (a bare string or number) fills the first placeholder and
//! leaves the input `null`.
//!
//! The untouched template is kept in the [`RawUrl`] context extension.

use crate::middleware::{Middleware, Next};
use courier_core::{ApiError, BoxFuture, ExecutionContext, PathParamStyle, RawUrl};
use serde_json::Value;
use std::ops::Range;

/// Path parameter substitution middleware.
///
/// # Example
///
/// ```
/// use courier_core::PathParamStyle;
/// use courier_middleware::stages::PathParamsMiddleware;
///
/// let stage = PathParamsMiddleware::new()
///     .style(PathParamStyle::Bracket)
///     .strip(false)
///     .base_url("https://api.example.com");
/// # let _ = stage;
/// ```
#[derive(Debug, Clone)]
pub struct PathParamsMiddleware {
    style: PathParamStyle,
    strip: bool,
    base_url: Option<String>,
}

impl Default for PathParamsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl PathParamsMiddleware {
    /// Creates the stage with `:name` placeholders and stripping enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: PathParamStyle::Colon,
            strip: true,
            base_url: None,
        }
    }

    /// Sets the placeholder style.
    #[must_use]
    pub const fn style(mut self, style: PathParamStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets whether consumed fields are removed from the input.
    #[must_use]
    pub const fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    /// Sets a prefix for URLs that start with `/`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Substitutes placeholders in the context's URL.
    pub fn apply(&self, ctx: &mut ExecutionContext) -> Result<(), ApiError> {
        let template = ctx.config().url.clone();
        let placeholders = find_placeholders(&template, self.style);

        let mut url = if placeholders.is_empty() {
            template.clone()
        } else {
            let mut url = String::with_capacity(template.len());
            let mut last = 0;
            for placeholder in &placeholders {
                url.push_str(&template[last..placeholder.span.start]);
                let value = self.take_value(ctx.parsed_input_mut(), placeholder.name)?;
                url.push_str(&value);
                last = placeholder.span.end;
            }
            url.push_str(&template[last..]);
            url
        };

        if let Some(base) = &self.base_url {
            if url.starts_with('/') {
                url = format!("{}{url}", base.trim_end_matches('/'));
            }
        }

        if url != template {
            tracing::trace!(execution_id = %ctx.id(), from = %template, to = %url, "resolved url");
            ctx.set_extension(RawUrl(template));
            ctx.config_mut().url = url;
        }
        Ok(())
    }

    fn take_value(&self, input: &mut Value, name: &str) -> Result<String, ApiError> {
        if let Value::Object(fields) = input {
            let value = if self.strip {
                fields.remove(name)
            } else {
                fields.get(name).cloned()
            };
            return value
                .as_ref()
                .and_then(render)
                .ok_or_else(|| ApiError::bad_path_param(name));
        }
        if matches!(input, Value::String(_) | Value::Number(_)) {
            let value = std::mem::take(input);
            return render(&value).ok_or_else(|| ApiError::bad_path_param(name));
        }
        Err(ApiError::bad_path_param(name))
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.chars().filter(|c| !c.is_whitespace()).collect()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

struct Placeholder<'t> {
    name: &'t str,
    span: Range<usize>,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_placeholders(template: &str, style: PathParamStyle) -> Vec<Placeholder<'_>> {
    let bytes = template.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let opener = match style {
            PathParamStyle::Colon => b':',
            PathParamStyle::Bracket => b'[',
        };
        if bytes[i] != opener {
            i += 1;
            continue;
        }
        let start = i;
        let name_start = i + 1;
        let mut end = name_start;
        while end < bytes.len() && is_name_byte(bytes[end]) {
            end += 1;
        }
        if end == name_start {
            i += 1;
            continue;
        }
        let span_end = match style {
            PathParamStyle::Colon => end,
            PathParamStyle::Bracket if bytes.get(end) == Some(&b']') => end + 1,
            PathParamStyle::Bracket => {
                i = end;
                continue;
            }
        };
        // A `:` inside the authority is a port separator.
        if style == PathParamStyle::Colon && is_port(template, start) {
            i = end;
            continue;
        }
        found.push(Placeholder {
            name: &template[name_start..end],
            span: start..span_end,
        });
        i = span_end;
    }
    found
}

/// Returns `true` if the `:` at `index` is the port separator of an authority.
///
/// The authority is whatever follows `scheme://`, or for scheme-less URLs
/// such as `localhost:3000/users`, everything before the first `/`.
fn is_port(template: &str, index: usize) -> bool {
    let before = &template[..index];
    let host = match before.find("://") {
        Some(pos) => &before[pos + 3..],
        None => before,
    };
    !host.is_empty()
        && !host.contains('/')
        && template[index + 1..]
            .bytes()
            .take_while(|b| *b != b'/')
            .all(|b| b.is_ascii_digit())
}

impl Middleware for PathParamsMiddleware {
    fn name(&self) -> &'static str {
        "path_params"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            self.apply(ctx)?;
            next.run(ctx).await
        })
    }
}
