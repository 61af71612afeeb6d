//! Streaming markup tokenizer
//!
//! Turns a raw document into a forward-only sequence of start-tag and text
//! events. This is deliberately not an HTML parser: no tree is built, end
//! tags are discarded, and malformed fragments degrade to literal text so a
//! broken page never aborts a scan. Source state machines consume the events
//! in document order.

/// Attribute list of a start tag, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the tag carries `name="value"` (or the unquoted equivalent).
    pub fn contains(&self, name: &str, value: &str) -> bool {
        self.get(name) == Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }
}

/// One event produced while scanning a document left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent {
    /// A start tag with its (lowercased) name and attribute list.
    Start { name: String, attrs: Attributes },
    /// A run of character data between tags, delivered verbatim.
    Text(String),
}

/// Elements whose content is raw text: no tag scanning until the matching
/// end tag.
const RAW_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "textarea"];

/// Lazy single-pass scanner over one document.
pub struct TagStream<'a> {
    input: &'a str,
    pos: usize,
    raw_until: Option<String>,
}

impl<'a> TagStream<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_until: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Consume the body of a raw-text element up to (and including) its end
    /// tag, returning the body.
    fn take_raw_text(&mut self, name: &str) -> String {
        let closer = format!("</{}", name);
        let rest = self.rest();
        match find_ascii_ci(rest, &closer) {
            Some(idx) => {
                let text = rest[..idx].to_string();
                let after = idx + closer.len();
                self.pos += match rest[after..].find('>') {
                    Some(gt) => after + gt + 1,
                    None => rest.len(),
                };
                text
            }
            None => {
                self.pos = self.input.len();
                rest.to_string()
            }
        }
    }

    /// Collect a text run up to the next construct that looks like markup.
    /// A `<` not followed by a name, `/`, `!` or `?` stays literal text.
    fn take_text(&mut self) -> String {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut i = self.pos;
        while i < bytes.len() {
            if bytes[i] == b'<' {
                if let Some(&c) = bytes.get(i + 1) {
                    if c.is_ascii_alphabetic() || c == b'/' || c == b'!' || c == b'?' {
                        break;
                    }
                }
            }
            i += 1;
        }
        self.pos = i;
        self.input[start..i].to_string()
    }

    /// Handle a construct starting with `<`. Returns an event for start
    /// tags, `None` for discarded constructs (end tags, comments, doctype).
    /// An unterminated construct is degraded to a literal text event.
    fn take_markup(&mut self) -> Option<TagEvent> {
        let rest = self.rest();
        let bytes = rest.as_bytes();

        if rest.starts_with("</") {
            match rest.find('>') {
                Some(gt) => {
                    self.pos += gt + 1;
                    None
                }
                None => Some(self.degrade_rest()),
            }
        } else if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => {
                    self.pos += end + 3;
                    None
                }
                None => Some(self.degrade_rest()),
            }
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            match rest.find('>') {
                Some(gt) => {
                    self.pos += gt + 1;
                    None
                }
                None => Some(self.degrade_rest()),
            }
        } else {
            debug_assert!(bytes.len() > 1 && bytes[1].is_ascii_alphabetic());
            self.take_start_tag()
        }
    }

    fn take_start_tag(&mut self) -> Option<TagEvent> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut i = 1;

        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
            i += 1;
        }
        let name = rest[1..i].to_ascii_lowercase();

        let mut attrs = Attributes::default();
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                return Some(self.degrade_rest());
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    i += 1;
                }
                _ => {
                    let attr_start = i;
                    while i < bytes.len()
                        && !bytes[i].is_ascii_whitespace()
                        && bytes[i] != b'='
                        && bytes[i] != b'>'
                        && bytes[i] != b'/'
                    {
                        i += 1;
                    }
                    let attr_name = rest[attr_start..i].to_ascii_lowercase();
                    let mut value = String::new();
                    if bytes.get(i) == Some(&b'=') {
                        i += 1;
                        match bytes.get(i) {
                            Some(&q) if q == b'"' || q == b'\'' => {
                                i += 1;
                                let value_start = i;
                                while i < bytes.len() && bytes[i] != q {
                                    i += 1;
                                }
                                if i >= bytes.len() {
                                    return Some(self.degrade_rest());
                                }
                                value = rest[value_start..i].to_string();
                                i += 1;
                            }
                            _ => {
                                let value_start = i;
                                while i < bytes.len()
                                    && !bytes[i].is_ascii_whitespace()
                                    && bytes[i] != b'>'
                                {
                                    i += 1;
                                }
                                value = rest[value_start..i].to_string();
                            }
                        }
                    }
                    if !attr_name.is_empty() {
                        attrs.push(attr_name, value);
                    }
                }
            }
        }

        self.pos += i;
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_until = Some(name.clone());
        }
        Some(TagEvent::Start { name, attrs })
    }

    /// Emit everything from the current position as literal text.
    fn degrade_rest(&mut self) -> TagEvent {
        let text = self.rest().to_string();
        self.pos = self.input.len();
        TagEvent::Text(text)
    }
}

impl Iterator for TagStream<'_> {
    type Item = TagEvent;

    fn next(&mut self) -> Option<TagEvent> {
        loop {
            if let Some(name) = self.raw_until.take() {
                let text = self.take_raw_text(&name);
                if !text.is_empty() {
                    return Some(TagEvent::Text(text));
                }
                continue;
            }

            if self.pos >= self.input.len() {
                return None;
            }

            let bytes = self.input.as_bytes();
            let at_markup = bytes[self.pos] == b'<'
                && bytes.get(self.pos + 1).is_some_and(|&c| {
                    c.is_ascii_alphabetic() || c == b'/' || c == b'!' || c == b'?'
                });

            if at_markup {
                if let Some(event) = self.take_markup() {
                    return Some(event);
                }
                continue;
            }

            let text = self.take_text();
            if !text.is_empty() {
                return Some(TagEvent::Text(text));
            }
        }
    }
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Vec<TagEvent> {
        TagStream::new(input).collect()
    }

    #[test]
    fn test_simple_document() {
        let evs = events(r#"<table id="list">hello<span class="fport">8080</span>"#);
        assert_eq!(evs.len(), 4);
        match &evs[0] {
            TagEvent::Start { name, attrs } => {
                assert_eq!(name, "table");
                assert!(attrs.contains("id", "list"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(evs[1], TagEvent::Text("hello".to_string()));
        match &evs[2] {
            TagEvent::Start { name, attrs } => {
                assert_eq!(name, "span");
                assert!(attrs.contains("class", "fport"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(evs[3], TagEvent::Text("8080".to_string()));
    }

    #[test]
    fn test_names_are_lowercased() {
        let evs = events(r#"<SPAN CLASS="Fport">"#);
        match &evs[0] {
            TagEvent::Start { name, attrs } => {
                assert_eq!(name, "span");
                // value case is preserved
                assert_eq!(attrs.get("class"), Some("Fport"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unquoted_attributes() {
        let evs = events("<tr class=spy1xx onmouseover=this.style.background='#002424'>");
        match &evs[0] {
            TagEvent::Start { name, attrs } => {
                assert_eq!(name, "tr");
                assert!(attrs.contains("class", "spy1xx"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_end_tags_and_comments_discarded() {
        let evs = events("<td>a</td><!-- note --><td>b</td>");
        assert_eq!(
            evs,
            vec![
                TagEvent::Start {
                    name: "td".to_string(),
                    attrs: Attributes::default()
                },
                TagEvent::Text("a".to_string()),
                TagEvent::Start {
                    name: "td".to_string(),
                    attrs: Attributes::default()
                },
                TagEvent::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        let evs = events("<br/><hr />");
        assert_eq!(evs.len(), 2);
        assert!(matches!(&evs[0], TagEvent::Start { name, attrs } if name == "br" && attrs.is_empty()));
        assert!(matches!(&evs[1], TagEvent::Start { name, .. } if name == "hr"));
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let evs = events("a < b > c");
        assert_eq!(evs, vec![TagEvent::Text("a < b > c".to_string())]);
    }

    #[test]
    fn test_unterminated_tag_degrades_to_text() {
        let evs = events(r#"ok<table id="x"#);
        assert_eq!(evs[0], TagEvent::Text("ok".to_string()));
        assert_eq!(evs[1], TagEvent::Text(r#"<table id="x"#.to_string()));
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let evs = events(
            r#"<script type="text/javascript">if(a<b){document.write("x")}</script>after"#,
        );
        assert_eq!(evs.len(), 3);
        assert!(matches!(
            &evs[0],
            TagEvent::Start { name, attrs } if name == "script" && attrs.contains("type", "text/javascript")
        ));
        assert_eq!(
            evs[1],
            TagEvent::Text(r#"if(a<b){document.write("x")}"#.to_string())
        );
        assert_eq!(evs[2], TagEvent::Text("after".to_string()));
    }

    #[test]
    fn test_unclosed_script_takes_rest() {
        let evs = events("<script>var a=1;");
        assert_eq!(evs.len(), 2);
        assert_eq!(evs[1], TagEvent::Text("var a=1;".to_string()));
    }

    #[test]
    fn test_doctype_skipped() {
        let evs = events("<!DOCTYPE html><p>x");
        assert_eq!(evs.len(), 2);
        assert!(matches!(&evs[0], TagEvent::Start { name, .. } if name == "p"));
    }
}
