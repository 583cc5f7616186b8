//! Object graph walker.
//!
//! Visits a page's resource graph (Form XObjects, ExtGState soft masks) and
//! its content streams, feeding every stream to the rewriter at most once per
//! run. Every step returns an explicit outcome; malformed objects are logged
//! and skipped so a single bad resource never aborts the page.

use std::borrow::Cow;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;

use eraser_core::options::{EraseOptions, XObjectClass};

use crate::context::EraseContext;
use crate::detect::{self, Detection};
use crate::identity::{Namespace, ObjectKey};
use crate::rewrite;

/// Guard against malformed page trees when looking up inherited resources.
const MAX_PARENT_DEPTH: usize = 64;

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PageOutcome {
    Processed { streams_rewritten: usize },
    SkippedDuplicate,
    SkippedNoBoxes,
    Failed { reason: String },
}

/// What happened to one resource dictionary or Form XObject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum VisitOutcome {
    Processed,
    SkippedDuplicate,
    SkippedIneligible,
    Failed { reason: String },
}

/// What happened to one content stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StreamOutcome {
    Rewritten { removed: usize },
    Unchanged,
    SkippedDuplicate,
    Failed { reason: String },
}

impl From<StreamOutcome> for VisitOutcome {
    fn from(outcome: StreamOutcome) -> Self {
        match outcome {
            StreamOutcome::Rewritten { .. } | StreamOutcome::Unchanged => VisitOutcome::Processed,
            StreamOutcome::SkippedDuplicate => VisitOutcome::SkippedDuplicate,
            StreamOutcome::Failed { reason } => VisitOutcome::Failed { reason },
        }
    }
}

fn kind_name(object: &Object) -> &'static str {
    match object {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) => "integer",
        Object::Real(_) => "real",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}

/// Raw bytes of a stream with its filters applied.
pub fn stream_bytes(stream: &Stream) -> lopdf::Result<Cow<'_, [u8]>> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().map(Cow::Owned)
    } else {
        Ok(Cow::Borrowed(&stream.content))
    }
}

/// Walks one page at a time. Holds only borrows; the document and the
/// per-run context outlive it.
pub struct Walker<'a> {
    doc: &'a mut Document,
    ctx: &'a mut EraseContext,
    options: &'a EraseOptions,
}

impl<'a> Walker<'a> {
    pub fn new(doc: &'a mut Document, ctx: &'a mut EraseContext, options: &'a EraseOptions) -> Self {
        Self { doc, ctx, options }
    }

    /// Process one page: dedup, quick-detect, then walk resources before
    /// rewriting the page's own content streams.
    pub fn process_page(&mut self, page_number: u32, page_id: ObjectId) -> PageOutcome {
        let key = ObjectKey::Indirect(page_id);
        log::info!("Analyzing page {} (ID: {:?})", page_number, page_id);

        if !self.ctx.mark_visited(Namespace::Page, key) {
            log::debug!("Page {} already processed", page_number);
            self.ctx.stats.pages_skipped += 1;
            return PageOutcome::SkippedDuplicate;
        }

        let page = match self.doc.get_dictionary(page_id) {
            Ok(page) => page.clone(),
            Err(e) => {
                return PageOutcome::Failed {
                    reason: format!("page {} is not readable: {}", page_number, e),
                };
            }
        };

        let contents = self.content_items(&page);
        if !self.should_process_page(&contents) {
            log::info!("No boxes detected on page {}", page_number);
            self.ctx.stats.pages_skipped += 1;
            return PageOutcome::SkippedNoBoxes;
        }

        log::info!("Processing page {}", page_number);

        if let Some(resources) = self.page_resources(&page) {
            self.process_resources(&resources);
        }

        let mut streams_rewritten = 0;
        for item in &contents {
            if let StreamOutcome::Rewritten { .. } =
                self.process_content_stream(item, Namespace::PageContent)
            {
                streams_rewritten += 1;
            }
        }

        self.ctx.stats.pages_processed += 1;
        PageOutcome::Processed { streams_rewritten }
    }

    /// The page's Contents as a list of stream objects (references or direct
    /// streams), in drawing order.
    fn content_items(&self, page: &Dictionary) -> Vec<Object> {
        let Ok(contents) = page.get(b"Contents") else {
            return Vec::new();
        };

        match self.doc.dereference(contents) {
            Ok((_, Object::Array(items))) => items.clone(),
            Ok((_, Object::Stream(_))) => vec![contents.clone()],
            Ok((_, other)) => {
                log::debug!("Page Contents is a {}, ignoring", kind_name(other));
                Vec::new()
            }
            Err(e) => {
                log::warn!("Could not resolve page Contents: {}", e);
                vec![contents.clone()]
            }
        }
    }

    /// A page is eligible when any of its content streams may contain a box.
    pub fn should_process_page(&mut self, contents: &[Object]) -> bool {
        contents.iter().any(|item| self.should_process_stream(item))
    }

    fn should_process_stream(&mut self, item: &Object) -> bool {
        let stream = match self.doc.dereference(item) {
            Ok((_, Object::Stream(stream))) => stream,
            Ok(_) => return false,
            Err(e) => {
                log::warn!("Error resolving content stream: {}", e);
                return true;
            }
        };

        let content = match stream_bytes(stream) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Error reading stream: {}", e);
                return true;
            }
        };

        match detect::scan(&content) {
            Detection::Found(_) => {
                self.ctx.stats.quick_matches += 1;
                true
            }
            Detection::NotFound => false,
            Detection::Unavailable => {
                log::warn!("Box probes unavailable, processing stream anyway");
                true
            }
        }
    }

    /// The page's own Resources, or the nearest inherited one.
    fn page_resources(&self, page: &Dictionary) -> Option<Object> {
        if let Ok(resources) = page.get(b"Resources") {
            return Some(resources.clone());
        }

        let mut node = page;
        for _ in 0..MAX_PARENT_DEPTH {
            let parent = node
                .get(b"Parent")
                .and_then(Object::as_reference)
                .and_then(|id| self.doc.get_dictionary(id))
                .ok()?;
            if let Ok(resources) = parent.get(b"Resources") {
                log::debug!("Using inherited Resources");
                return Some(resources.clone());
            }
            node = parent;
        }
        None
    }

    /// Walk a resource dictionary: Form XObjects, then ExtGState soft masks.
    pub fn process_resources(&mut self, resources: &Object) -> VisitOutcome {
        let (key, dict) = match self.doc.dereference(resources) {
            Ok((id, object @ Object::Dictionary(dict))) => (ObjectKey::of(id, object), dict.clone()),
            Ok((_, other)) => {
                log::debug!("Resources is a {}, not a dictionary", kind_name(other));
                return VisitOutcome::SkippedIneligible;
            }
            Err(e) => {
                let reason = format!("could not resolve Resources: {}", e);
                log::error!("{}", reason);
                return VisitOutcome::Failed { reason };
            }
        };

        if !self.ctx.mark_visited(Namespace::Resources, key) {
            log::debug!("Resources {:?} were previously processed", key);
            self.ctx.record(Namespace::Resources, key, VisitOutcome::SkippedDuplicate);
            return VisitOutcome::SkippedDuplicate;
        }

        if let Ok(xobjects) = dict.get(b"XObject") {
            self.process_xobjects(xobjects);
        }

        if self.options.follow_soft_masks {
            if let Ok(gstates) = dict.get(b"ExtGState") {
                self.process_ext_gstates(gstates);
            }
        }

        self.ctx.record(Namespace::Resources, key, VisitOutcome::Processed);
        VisitOutcome::Processed
    }

    fn process_xobjects(&mut self, xobjects: &Object) {
        let entries: Vec<(String, Object)> = match self.doc.dereference(xobjects) {
            Ok((_, Object::Dictionary(dict))) => dict
                .iter()
                .map(|(name, value)| (String::from_utf8_lossy(name).into_owned(), value.clone()))
                .collect(),
            Ok((_, other)) => {
                log::debug!("XObject resource is a {}, not a dictionary", kind_name(other));
                return;
            }
            Err(e) => {
                log::error!("Error processing XObjects: {}", e);
                return;
            }
        };

        log::debug!(
            "Processing XObjects: {:?}",
            entries.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>()
        );

        let mut image_names = Vec::new();
        for (name, value) in &entries {
            match self.options.classify_xobject_name(name) {
                XObjectClass::FormLike => self.process_named_xobject(name, value),
                XObjectClass::ImageLike => image_names.push(name.as_str()),
                XObjectClass::Other if self.options.inspect_unprefixed_xobjects => {
                    self.process_named_xobject(name, value)
                }
                XObjectClass::Other => log::debug!("Ignoring XObject {}", name),
            }
        }

        if !image_names.is_empty() {
            log::debug!("Skipping Image XObjects: {:?}", image_names);
        }
    }

    /// Recurse into a named XObject only if its declared subtype is Form.
    fn process_named_xobject(&mut self, name: &str, value: &Object) {
        let is_form = match self.doc.dereference(value) {
            Ok((_, Object::Stream(stream))) => {
                let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name);
                match subtype {
                    Ok(b"Form") => true,
                    Ok(other) => {
                        log::debug!(
                            "Skipping non-Form XObject: {} (subtype: {})",
                            name,
                            String::from_utf8_lossy(other)
                        );
                        false
                    }
                    Err(_) => {
                        log::debug!("Skipping XObject without subtype: {}", name);
                        false
                    }
                }
            }
            Ok((_, other)) => {
                log::debug!("Skipping XObject {}: {} is not a stream", name, kind_name(other));
                false
            }
            Err(e) => {
                log::debug!("Skipping problematic XObject {}: {}", name, e);
                false
            }
        };

        if is_form {
            log::debug!("Processing Form XObject: {}", name);
            self.process_form(value);
        }
    }

    fn process_ext_gstates(&mut self, gstates: &Object) {
        let entries: Vec<(String, Object)> = match self.doc.dereference(gstates) {
            Ok((_, Object::Dictionary(dict))) => dict
                .iter()
                .map(|(name, value)| (String::from_utf8_lossy(name).into_owned(), value.clone()))
                .collect(),
            Ok(_) => return,
            Err(e) => {
                log::error!("Error processing ExtGState: {}", e);
                return;
            }
        };

        for (name, value) in &entries {
            let smask = match self.doc.dereference(value) {
                Ok((_, Object::Dictionary(gstate))) => match gstate.get(b"SMask") {
                    Ok(smask) => smask.clone(),
                    Err(_) => continue,
                },
                Ok(_) => continue,
                Err(e) => {
                    log::debug!("Skipping problematic ExtGState {}: {}", name, e);
                    continue;
                }
            };

            if let Some(group) = self.soft_mask_group(&smask) {
                log::debug!("Processing SMask in ExtGState: {}", name);
                self.process_form(&group);
            }
        }
    }

    /// The Form-like stream behind a soft mask: the stream itself, or the
    /// `/G` group of a soft-mask dictionary. `/None` has no group.
    fn soft_mask_group(&self, smask: &Object) -> Option<Object> {
        match self.doc.dereference(smask) {
            Ok((_, Object::Stream(_))) => Some(smask.clone()),
            Ok((_, Object::Dictionary(dict))) => dict.get(b"G").ok().cloned(),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Skipping unresolvable SMask: {}", e);
                None
            }
        }
    }

    /// Walk a Form XObject (or soft-mask group): its Resources first, then
    /// its own content stream.
    pub fn process_form(&mut self, form: &Object) -> VisitOutcome {
        let (key, resources) = match self.doc.dereference(form) {
            Ok((id, object @ Object::Stream(stream))) => (
                ObjectKey::of(id, object),
                stream.dict.get(b"Resources").ok().cloned(),
            ),
            Ok((_, other)) => {
                log::debug!("Form XObject is a {}, not a stream", kind_name(other));
                return VisitOutcome::SkippedIneligible;
            }
            Err(e) => {
                let reason = format!("could not resolve Form XObject: {}", e);
                log::error!("{}", reason);
                return VisitOutcome::Failed { reason };
            }
        };

        log::debug!("Processing Form XObject {:?}", key);
        if !self.ctx.mark_visited(Namespace::Form, key) {
            log::debug!("XObject {:?} was previously processed", key);
            self.ctx.record(Namespace::Form, key, VisitOutcome::SkippedDuplicate);
            return VisitOutcome::SkippedDuplicate;
        }
        self.ctx.stats.objects_processed += 1;

        if let Some(resources) = resources {
            log::debug!("Processing resources for XObject {:?}", key);
            self.process_resources(&resources);
        }

        let outcome = VisitOutcome::from(self.process_content_stream(form, Namespace::FormContent));
        self.ctx.record(Namespace::Form, key, outcome.clone());
        outcome
    }

    /// Rewrite one content stream and write it back if it changed.
    pub fn process_content_stream(&mut self, item: &Object, namespace: Namespace) -> StreamOutcome {
        let (id, key, original) = match self.doc.dereference(item) {
            Ok((id, object @ Object::Stream(stream))) => {
                let key = ObjectKey::of(id, object);
                if self.ctx.is_visited(namespace, key) {
                    log::debug!("Content stream {:?} was previously processed", key);
                    self.ctx.record(namespace, key, VisitOutcome::SkippedDuplicate);
                    return StreamOutcome::SkippedDuplicate;
                }
                (id, key, stream_bytes(stream).map(Cow::into_owned))
            }
            Ok((_, other)) => {
                let reason = format!("expected a content stream, found {}", kind_name(other));
                log::debug!("{}", reason);
                return StreamOutcome::Failed { reason };
            }
            Err(e) => {
                let reason = format!("could not resolve content stream: {}", e);
                log::error!("{}", reason);
                return StreamOutcome::Failed { reason };
            }
        };

        self.ctx.mark_visited(namespace, key);
        self.ctx.stats.objects_processed += 1;

        let outcome = self.rewrite_stream(id, key, original);
        self.ctx.record(namespace, key, VisitOutcome::from(outcome.clone()));
        outcome
    }

    fn rewrite_stream(
        &mut self,
        id: Option<ObjectId>,
        key: ObjectKey,
        original: lopdf::Result<Vec<u8>>,
    ) -> StreamOutcome {
        let original = match original {
            Ok(bytes) => bytes,
            Err(e) => {
                let reason = format!("failed to decode content stream {:?}: {}", key, e);
                log::error!("{}", reason);
                return StreamOutcome::Failed { reason };
            }
        };
        log::debug!("Content stream {:?} size: {} bytes", key, original.len());

        let result = rewrite::rewrite(&original);
        if !result.is_modified() {
            log::debug!("No modifications needed for content stream {:?}", key);
            return StreamOutcome::Unchanged;
        }
        let removed = result.total_removed();

        let Some(id) = id else {
            let reason = format!("content stream {:?} is a direct object and cannot be written back", key);
            log::error!("{}", reason);
            return StreamOutcome::Failed { reason };
        };

        match self.doc.get_object_mut(id).and_then(Object::as_stream_mut) {
            Ok(stream) => {
                stream.set_plain_content(result.content.into_owned());
                self.ctx.stats.boxes_removed += removed as u64;
                log::debug!("Content stream {:?} was modified ({} box(es) removed)", key, removed);
                StreamOutcome::Rewritten { removed }
            }
            Err(e) => {
                let reason = format!("failed to write content stream {:?}: {}", key, e);
                log::error!("{}", reason);
                StreamOutcome::Failed { reason }
            }
        }
    }
}
