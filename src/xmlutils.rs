use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::bytes::{Captures, Regex};
use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;
use xml::reader::{ParserConfig, XmlEvent as ReaderEvent};

use crate::text;

// Using RefCell because we need to edit the children vec during the parsing.
// Using rc because a Node is referenced by its parent and by the open
// element stack while parsing.
pub type ChildNodeRef = Rc<RefCell<XMLNode>>;

static ENTITY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum XMLError {
    #[error("XML Reader Error: {0}")]
    Reader(#[from] xml::reader::Error),
    #[error("No XML Elements Found")]
    NoElements,
}

pub struct XMLReader;

impl XMLReader {
    /// Builds the element tree of `content`.
    ///
    /// Tags and attributes are matched by local name afterwards, so
    /// namespace prefixes, attribute order and quoting never matter.
    ///
    /// HTML named entities are accepted: the known ones are replaced by
    /// their character and unknown ones are kept as literal text.
    pub fn parse(content: &[u8]) -> Result<ChildNodeRef, XMLError> {
        let content = replace_entities(content);
        let reader = ParserConfig::new()
            .cdata_to_characters(true)
            .ignore_comments(true)
            .create_reader(content.as_ref());

        let mut root: Option<ChildNodeRef> = None;
        let mut parents: Vec<ChildNodeRef> = vec![];

        for e in reader {
            match e? {
                ReaderEvent::StartElement {
                    name, attributes, ..
                } => {
                    let node = XMLNode {
                        name,
                        attrs: attributes,
                        text: vec![],
                        children: vec![],
                    };
                    let arnode = Rc::new(RefCell::new(node));

                    if let Some(c) = parents.last() {
                        c.borrow_mut().children.push(Rc::clone(&arnode));
                    }
                    parents.push(Rc::clone(&arnode));

                    if root.is_none() {
                        root = Some(arnode);
                    }
                }
                ReaderEvent::EndElement { .. } => {
                    parents.pop();
                }
                ReaderEvent::Characters(text) | ReaderEvent::Whitespace(text) => {
                    if let Some(c) = parents.last() {
                        let mut node = c.borrow_mut();
                        let at = node.children.len();
                        match node.text.last_mut() {
                            Some((pos, run)) if *pos == at => run.push_str(&text),
                            _ => node.text.push((at, text)),
                        }
                    }
                }
                _ => continue,
            }
        }

        root.ok_or(XMLError::NoElements)
    }
}

/// Rewrites the named entity references xml doesn't predefine.
fn replace_entities(content: &[u8]) -> Cow<'_, [u8]> {
    ENTITY_REF.replace_all(content, |caps: &Captures| {
        let name = std::str::from_utf8(&caps[1]).unwrap_or_default();
        match name {
            "amp" | "lt" | "gt" | "quot" | "apos" => caps[0].to_vec(),
            _ => match text::named_entity(name) {
                Some(c) => c.to_string().into_bytes(),
                None => format!("&amp;{name};").into_bytes(),
            },
        }
    })
}

#[derive(Debug)]
pub struct XMLNode {
    pub name: OwnedName,
    pub attrs: Vec<OwnedAttribute>,
    /// character data runs, keyed by the number of children preceding them
    pub text: Vec<(usize, String)>,
    pub children: Vec<ChildNodeRef>,
}

impl XMLNode {
    pub fn local_name(&self) -> &str {
        &self.name.local_name
    }

    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|a| a.name.local_name == name)
            .map(|a| a.value.clone())
    }

    /// Depth first search of the first descendant named `tag`.
    pub fn find(&self, tag: &str) -> Option<ChildNodeRef> {
        for c in &self.children {
            if c.borrow().name.local_name == tag {
                return Some(Rc::clone(c));
            }
            if let Some(n) = c.borrow().find(tag) {
                return Some(n);
            }
        }
        None
    }

    /// Every descendant named `tag`, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<ChildNodeRef> {
        let mut found = vec![];
        self.collect(tag, &mut found);
        found
    }

    fn collect(&self, tag: &str, found: &mut Vec<ChildNodeRef>) {
        for c in &self.children {
            if c.borrow().name.local_name == tag {
                found.push(Rc::clone(c));
            }
            c.borrow().collect(tag, found);
        }
    }

    /// Direct children named `tag`.
    pub fn children_named(&self, tag: &str) -> Vec<ChildNodeRef> {
        self.children
            .iter()
            .filter(|c| c.borrow().name.local_name == tag)
            .cloned()
            .collect()
    }

    /// The text of this node and all its descendants, whitespace collapsed.
    ///
    /// Returns [`None`] when nothing but whitespace is found.
    pub fn text_content(&self) -> Option<String> {
        let mut raw = String::new();
        self.push_text(&mut raw);
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed)
        }
    }

    fn push_text(&self, out: &mut String) {
        let mut runs = self.text.iter().peekable();
        for (i, c) in self.children.iter().enumerate() {
            while let Some((_, run)) = runs.next_if(|(pos, _)| *pos <= i) {
                out.push_str(run);
            }
            c.borrow().push_text(out);
        }
        for (_, run) in runs {
            out.push_str(run);
        }
    }
}
