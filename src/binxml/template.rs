//! Component E — template cache.
//!
//! A template compiled once from its definition body is kept by numeric id
//! for the remainder of the chunk, grounded in the teacher's
//! `src/template_cache.rs` (`Rc`-shared definitions, keyed by template id —
//! the teacher calls this `TemplateCache<'a>` keyed off `(offset, data_offset)`;
//! this crate's wire model keys purely off the 32-bit id, per spec.md §4.E).

use std::rc::Rc;

use hashbrown::HashMap;

/// The fixed text and placeholder bindings baked into one template body.
///
/// `fixed` holds keys whose values never change between instantiations
/// (`ValueText` encountered directly in the template body). `subst` maps a
/// placeholder index to the key its argument value should be written under,
/// discovered while walking the body's `NormalSubstitution`/
/// `OptionalSubstitution` tokens.
#[derive(Debug, Default)]
pub struct Template {
    pub fixed: HashMap<String, String, ahash::RandomState>,
    pub subst: HashMap<u16, String, ahash::RandomState>,
}

/// Templates observed so far in the current chunk, keyed by the 32-bit id
/// carried in every `TemplateInstance` token. Reset per chunk (spec.md §4.E:
/// template ids are only unique within a chunk).
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: HashMap<u32, Rc<Template>, ahash::RandomState>,
}

impl TemplateCache {
    pub fn new() -> Self {
        TemplateCache { templates: HashMap::default() }
    }

    pub fn get(&self, id: u32) -> Option<Rc<Template>> {
        self.templates.get(&id).cloned()
    }

    pub fn insert(&mut self, id: u32, template: Rc<Template>) {
        self.templates.insert(id, template);
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }
}
