use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum XmlError {
    #[error("malformed xml at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("unclosed element <{0}>")]
    Unclosed(String),
    #[error("unknown entity reference &{0};")]
    UnknownEntity(String),
    #[error("xml document has no elements")]
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn named(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn inner_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }

    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn descendant_text(&self, name: &str) -> Option<String> {
        self.descendant(name).map(XmlElement::inner_text)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Resolves `//a/b/c`: the first `a` anywhere, then child steps.
    pub fn select(&self, path: &[&str]) -> Option<&XmlElement> {
        self.select_all(path).into_iter().next()
    }

    pub fn select_all(&self, path: &[&str]) -> Vec<&XmlElement> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let mut anchors = Vec::new();
        self.collect_descendants(first, &mut anchors);

        let mut current = anchors;
        for step in rest {
            current = current
                .into_iter()
                .flat_map(|element| element.children.iter().filter(|c| c.name == *step))
                .collect();
        }
        current
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_descendants(name, out);
        }
    }
}

pub fn parse_fragment(input: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(input);
    let mut stack = vec![XmlElement::default()];

    loop {
        let event = reader.read_event().map_err(|err| XmlError::Malformed {
            position: reader.buffer_position() as u64,
            message: err.to_string(),
        })?;
        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlElement::named(name));
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                attach(&mut stack, XmlElement::named(name));
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(XmlError::Malformed {
                        position: reader.buffer_position() as u64,
                        message: "unexpected closing tag".to_string(),
                    });
                }
                if let Some(element) = stack.pop() {
                    attach(&mut stack, element);
                }
            }
            Event::Text(text) => push_text(&mut stack, &String::from_utf8_lossy(&text)),
            Event::CData(data) => push_text(&mut stack, &String::from_utf8_lossy(&data)),
            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference).into_owned();
                let resolved = resolve_reference(&name)?;
                push_text(&mut stack, &resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        let name = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        return Err(XmlError::Unclosed(name));
    }
    let root = stack.pop().unwrap_or_default();
    if root.children.is_empty() {
        return Err(XmlError::Empty);
    }
    Ok(root)
}

fn attach(stack: &mut [XmlElement], element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

fn resolve_reference(name: &str) -> Result<String, XmlError> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(|code| {
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            value.and_then(char::from_u32)
        }),
    };
    resolved
        .map(String::from)
        .ok_or_else(|| XmlError::UnknownEntity(name.to_string()))
}
