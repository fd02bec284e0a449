//! HTML rendering for result pages and streamed prime listings.
//!
//! Streamed listings are written in three parts: a header opening the page,
//! the primes themselves, and a footer closing it. A stream that fails after
//! the header appends a complete error page to what was already sent.

use bytes::Bytes;
use primestream::{Error, Render};
use std::borrow::Cow;

const STREAM_FOOTER: &str = r#"
    </div>
    <p><div><a href="/">Back home</a></div></p>

  </body>
</html>
"#;

/// The content of a result page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Results {
    /// `Success` or `Error`.
    pub title: &'static str,
    pub message: String,
    pub details: Option<String>,
}

impl Results {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            title: "Success",
            message: message.into(),
            details: None,
        }
    }

    pub fn error(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            title: "Error",
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

/// Renders a complete result page.
pub fn results_page(results: &Results) -> String {
    let mut page = page_head(results.title, &results.message);
    if let Some(details) = &results.details {
        page.push_str(&format!("    <div>{}</div>\n", escape(details)));
    }
    page.push_str(STREAM_FOOTER);
    page
}

fn page_head(title: &str, message: &str) -> String {
    let title = escape(title);
    format!(
        r#"
<html>
  <head>
    <title>Prime Stream - {title}</title>
    <link rel="stylesheet" href="/stylesheets/style.css">
  </head>

  <body>

    <h1>{title}</h1>
    <p><div>{message}</div></p>
    <div>
"#,
        message = escape(message),
    )
}

/// Escapes the characters that are significant in HTML text and attributes.
pub fn escape(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Renders streamed primes as an HTML page, one [`Bytes`] chunk per segment.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRender;

impl Render for HtmlRender {
    type Output = Bytes;

    fn header(&mut self, count: usize) -> Bytes {
        Bytes::from(page_head(
            "Success",
            &format!("First {count} prime numbers:"),
        ))
    }

    fn value(&mut self, value: u64) -> Bytes {
        Bytes::from(format!("{value}  "))
    }

    fn line_break(&mut self) -> Bytes {
        Bytes::from_static(b"<br>\n")
    }

    fn footer(&mut self) -> Bytes {
        Bytes::from_static(STREAM_FOOTER.as_bytes())
    }

    fn failure(&mut self, count: usize, error: &Error) -> Bytes {
        Bytes::from(results_page(&Results::error(
            format!("Cannot calculate first {count} prime numbers"),
            error.to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("plain"), "plain");
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
        assert_eq!(
            escape(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn success_page_has_no_details() {
        let page = results_page(&Results::success("Prime Factors of 4 = 2^2"));
        assert!(page.contains("<h1>Success</h1>"));
        assert!(page.contains("Prime Factors of 4 = 2^2"));
        assert!(page.contains("Back home"));
    }

    #[test]
    fn error_page_escapes_details() {
        let page = results_page(&Results::error("Invalid number", "<script>"));
        assert!(page.contains("<h1>Error</h1>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn html_render_segments() {
        let mut render = HtmlRender;
        let header = render.header(10);
        assert!(
            core::str::from_utf8(&header)
                .unwrap()
                .contains("First 10 prime numbers:")
        );
        assert_eq!(render.value(17), Bytes::from_static(b"17  "));
        assert_eq!(render.line_break(), Bytes::from_static(b"<br>\n"));
        assert!(
            core::str::from_utf8(&render.footer())
                .unwrap()
                .contains("</html>")
        );

        let failure = render.failure(1, &Error::InvalidArgument(1));
        let failure = core::str::from_utf8(&failure).unwrap().to_owned();
        assert!(failure.contains("Cannot calculate first 1 prime numbers"));
        assert!(failure.contains("Invalid argument number 1"));
    }
}
