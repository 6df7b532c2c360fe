//! lopdf helpers shared by the extract and split stages.
//!
//! Both stages build a fresh [`Document`] out of pieces of another one. The
//! pieces reference other objects (fonts, nested forms, colour spaces) by id,
//! so they must be deep-copied with every reachable object re-numbered in the
//! target. [`ObjectCopier`] does that, copying each source object at most once
//! and never following `/Parent`, which would drag the whole source page tree
//! along.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Keys never followed when walking or copying the object graph.
pub(crate) const NO_FOLLOW: &[&[u8]] = &[b"Parent"];

/// Deep-copies objects from `source` into a target document.
pub(crate) struct ObjectCopier<'a> {
    source: &'a Document,
    mapped: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    pub(crate) fn new(source: &'a Document) -> Self {
        Self {
            source,
            mapped: HashMap::new(),
        }
    }

    /// Copy a direct object, re-numbering every reference it reaches.
    pub(crate) fn copy(&mut self, target: &mut Document, obj: &Object) -> Object {
        match obj {
            Object::Reference(id) => Object::Reference(self.copy_reference(target, *id)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|o| self.copy(target, o)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(target, dict)),
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.copy_dict(target, &stream.dict);
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    /// Copy a dictionary, dropping the keys in [`NO_FOLLOW`].
    pub(crate) fn copy_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            if NO_FOLLOW.contains(&key.as_slice()) {
                continue;
            }
            out.set(key.clone(), self.copy(target, value));
        }
        out
    }

    /// Copy the indirect object `id` (once) and return its id in `target`.
    ///
    /// Dangling references become `null`, as a PDF reader would treat them.
    pub(crate) fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(&new_id) = self.mapped.get(&id) {
            return new_id;
        }
        let new_id = target.new_object_id();
        // Register before recursing so cycles terminate.
        self.mapped.insert(id, new_id);
        let copied = match self.source.get_object(id) {
            Ok(obj) => self.copy(target, obj),
            Err(_) => Object::Null,
        };
        target.objects.insert(new_id, copied);
        new_id
    }
}

/// Follow a reference chain to the object it names.
pub(crate) fn resolve<'d>(doc: &'d Document, obj: &'d Object) -> Option<&'d Object> {
    let mut current = obj;
    // Bounded so a reference cycle cannot loop forever.
    for _ in 0..32 {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            _ => return Some(current),
        }
    }
    None
}

/// The dictionary of a dictionary or stream object.
pub(crate) fn as_dict(obj: &Object) -> Option<&Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// The name stored under `key`, if it is a name.
pub(crate) fn name_of<'d>(dict: &'d Dictionary, key: &[u8]) -> Option<&'d [u8]> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

/// A numeric PDF object as `f32`.
pub(crate) fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Look up a page attribute, walking up `/Parent` when the page lacks it.
pub(crate) fn inherited<'d>(
    doc: &'d Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'d Object> {
    let mut current = page_id;
    for _ in 0..64 {
        let dict = doc.get_object(current).ok().and_then(as_dict)?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => *parent,
            _ => return None,
        };
    }
    None
}

/// Attach `pages` under a new page tree root and catalog in `doc`.
///
/// Every page object gets its `/Parent` pointed at the new root.
pub(crate) fn install_page_tree(doc: &mut Document, pages: Vec<ObjectId>) {
    let pages_id = doc.new_object_id();
    for page_id in &pages {
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(*page_id) {
            page.set("Parent", pages_id);
        }
    }
    let count = pages.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => pages.into_iter().map(Object::from).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
}
