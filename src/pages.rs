//! HTML pages for browsing the root and viewing a live file.

use url::form_urlencoded;

/// Kind of a listed directory entry. Other entry types are not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

impl EntryKind {
    fn route(self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::File => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

fn query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Lists `entries` of the root-relative directory `dir`.
pub fn render_listing(dir: &str, entries: &[Entry]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n    <head>\n        <title>WebTail</title>\n    </head>\n<body>\n",
    );
    html.push_str(&format!("<h1>{}</h1>\n<p>\n<ul>\n", html_escape::encode_text(dir)));

    for entry in entries {
        let target = join(dir, &entry.name);
        html.push_str(&format!(
            "<li><a href=\"./{}?{}\">{}</a></li>\n",
            entry.kind.route(),
            html_escape::encode_double_quoted_attribute(&query(&[("path", target.as_str())])),
            html_escape::encode_text(&entry.name),
        ));
    }

    html.push_str("</ul></p>\n</body>\n</html>\n");
    html
}

/// Viewer page for `file`; htmx opens an SSE connection to `/tail` and
/// inserts every line above the stream anchor.
pub fn render_file_page(file: &str) -> String {
    let tail_url = format!("/tail?{}", query(&[("left", ""), ("right", "<br>"), ("file", file)]));

    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <title>WebTail</title>

        <script src="https://unpkg.com/htmx.org@2.0.1" integrity="sha384-QWGpdj554B4ETpJJC9z+ZHJcA/i59TyjxEPXiiUgN2WmTyV5OEZWCD6gQhgkdpB/" crossorigin="anonymous"></script>
        <script src="https://unpkg.com/htmx-ext-sse@2.2.1/sse.js"></script>
    </head>
    <body>
        <h1>{title}</h1>
        <pre hx-ext="sse" sse-connect="{tail_url}" sse-swap="message" hx-swap="beforebegin swap:1s">
        </pre>
    </body>
</html>
"#,
        title = html_escape::encode_text(file),
        tail_url = html_escape::encode_double_quoted_attribute(&tail_url),
    )
}
