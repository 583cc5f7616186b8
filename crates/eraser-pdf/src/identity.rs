//! Stable identities for PDF objects reached during a walk.
//!
//! The same logical object can be reached through several reference paths,
//! so identity never depends on where a value lives in memory. Indirect
//! objects are identified by object number and generation; direct objects by
//! their kind and a hash of their content.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use lopdf::{Dictionary, Object, ObjectId, Stream};

/// Kind of a direct object, folded into its content identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Dictionary,
    Stream,
    Other,
}

/// Identity of one PDF object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    /// Indirect object: object number and generation.
    Indirect(ObjectId),
    /// Direct object: kind plus content hash.
    Content { kind: ObjectKind, digest: u64 },
}

impl ObjectKey {
    /// Identity of an object reached through `reference` (if it was a
    /// reference) that resolved to `object`.
    pub fn of(reference: Option<ObjectId>, object: &Object) -> Self {
        match reference {
            Some(id) => ObjectKey::Indirect(id),
            None => match object {
                Object::Dictionary(dict) => Self::of_dictionary(dict),
                Object::Stream(stream) => Self::of_stream(stream),
                other => ObjectKey::Content {
                    kind: ObjectKind::Other,
                    digest: digest_of(format!("{:?}", other).as_bytes()),
                },
            },
        }
    }

    pub fn of_dictionary(dict: &Dictionary) -> Self {
        ObjectKey::Content {
            kind: ObjectKind::Dictionary,
            digest: digest_of(format!("{:?}", dict).as_bytes()),
        }
    }

    pub fn of_stream(stream: &Stream) -> Self {
        ObjectKey::Content {
            kind: ObjectKind::Stream,
            digest: digest_of(&stream.content),
        }
    }
}

fn digest_of(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Separate identity namespaces. A Form XObject and its own content stream
/// are the same PDF object but are deduplicated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Page,
    Resources,
    Form,
    FormContent,
    PageContent,
}

/// Key stored in the visited set.
pub type VisitKey = (Namespace, ObjectKey);
