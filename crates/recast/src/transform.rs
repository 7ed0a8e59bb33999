use bson::spec::ElementType;
use bson::{Bson, Document};
use regex::{NoExpand, Regex};

use crate::request::MutationRequest;

/// The identity field, copied through untouched.
pub const ID_FIELD: &str = "_id";

/// A content field whose value cannot be matched as text.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedField {
    pub id: Option<Bson>,
    pub field: String,
    pub kind: ElementType,
}

/// Applies one request's pattern/replacement pair to whole documents.
pub struct Transformer<'a> {
    regex: &'a Regex,
    replacement: &'a str,
}

impl<'a> Transformer<'a> {
    pub fn new(request: &'a MutationRequest) -> Self {
        Self {
            regex: request.pattern().regex(),
            replacement: request.replacement_text(),
        }
    }

    /// Return a new document with the same keys, in the same order, where
    /// every match in every content field is replaced.
    pub fn apply(&self, doc: &Document) -> Result<Document, UnsupportedField> {
        let mut out = Document::new();
        for (key, value) in doc {
            if key == ID_FIELD {
                out.insert(key.clone(), value.clone());
                continue;
            }
            match value {
                Bson::String(text) => {
                    let replaced = self.regex.replace_all(text, NoExpand(self.replacement));
                    out.insert(key.clone(), replaced.into_owned());
                }
                other => {
                    return Err(UnsupportedField {
                        id: doc.get(ID_FIELD).cloned(),
                        field: key.clone(),
                        kind: other.element_type(),
                    });
                }
            }
        }
        Ok(out)
    }
}
