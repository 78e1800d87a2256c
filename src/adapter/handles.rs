//! The handle registry: opaque nonzero `u32` identifiers lent to the editor
//! for stack frames, variable containers, source references, and breakpoint
//! ids.

use std::collections::HashMap;

/// A single domain's integer↔value lender. IDs are nonzero and monotonic
/// for the lifetime of the lender; `reset()` drops every mapping and
/// restarts numbering (used for the frame/variable/source domains on every
/// `paused` event).
#[derive(Debug, Default)]
pub struct Lender<T> {
    next: u32,
    values: HashMap<u32, T>,
}

impl<T> Lender<T> {
    pub fn new() -> Self {
        Self {
            next: 1,
            values: HashMap::new(),
        }
    }

    /// Lend a fresh handle for `value`, returning the newly minted id.
    pub fn insert(&mut self, value: T) -> u32 {
        let id = self.next;
        self.next += 1;
        self.values.insert(id, value);
        id
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.values.get(&id)
    }

    pub fn reset(&mut self) {
        self.next = 1;
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The breakpoint-id lender is bidirectional and never reset: the editor's
/// breakpoint ids must remain stable across rebinds and page navigations
/// for the whole session.
#[derive(Debug, Default)]
pub struct BreakpointIdLender {
    next: u32,
    forward: HashMap<u32, String>,
    reverse: HashMap<String, u32>,
}

impl BreakpointIdLender {
    pub fn new() -> Self {
        Self {
            next: 1,
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Mint a fresh external id not yet bound to any CDP breakpoint id
    /// (used for unverified breakpoints reported before a script parses).
    pub fn mint(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Look up the external id for a known CDP breakpoint id, minting one
    /// if this is the first time it's seen.
    pub fn id_for_cdp(&mut self, cdp_id: &str) -> u32 {
        if let Some(&id) = self.reverse.get(cdp_id) {
            return id;
        }
        let id = self.mint();
        self.bind(id, cdp_id.to_string());
        id
    }

    /// Bind a previously minted external id to a concrete CDP breakpoint id.
    pub fn bind(&mut self, external_id: u32, cdp_id: String) {
        self.reverse.insert(cdp_id.clone(), external_id);
        self.forward.insert(external_id, cdp_id);
    }

    pub fn cdp_id_of(&self, external_id: u32) -> Option<&str> {
        self.forward.get(&external_id).map(|s| s.as_str())
    }

    pub fn external_id_of(&self, cdp_id: &str) -> Option<u32> {
        self.reverse.get(cdp_id).copied()
    }
}

/// Four independent lenders: frames, variables, sources, breakpoint-ids.
pub struct HandleRegistry {
    pub frames: Lender<u32>,
    pub variables: Lender<VariablesContainer>,
    pub sources: Lender<String>,
    pub breakpoint_ids: BreakpointIdLender,
}

/// What a `variablesReference` handle points at: either a CDP `objectId`
/// to page through, or a scope within a known stopped call frame.
#[derive(Debug, Clone)]
pub enum VariablesContainer {
    /// A CDP `Runtime.RemoteObject.objectId`, with the paging counts that
    /// were computed when the handle was minted.
    Object {
        object_id: String,
        indexed_count: i64,
        named_count: i64,
    },
    /// One entry of a stopped frame's `scopeChain`. `scope_index == 0`
    /// additionally carries `this`/`returnValue`.
    Scope { frame_index: usize, scope_index: usize },
    /// The synthetic "Exception" scope prepended when an exception is
    /// active; resolved against the adapter's stored exception object
    /// rather than a frame.
    Exception,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            frames: Lender::new(),
            variables: Lender::new(),
            sources: Lender::new(),
            breakpoint_ids: BreakpointIdLender::new(),
        }
    }

    /// Reset frames/variables/sources on every debugger pause; the
    /// breakpoint-id lender is untouched.
    pub fn reset_on_pause(&mut self) {
        self.frames.reset();
        self.variables.reset();
        self.sources.reset();
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lender_issues_monotonic_nonzero_ids() {
        let mut l: Lender<&str> = Lender::new();
        let a = l.insert("a");
        let b = l.insert("b");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_ne!(a, 0);
    }

    #[test]
    fn lender_reset_clears_and_restarts_numbering() {
        let mut l: Lender<&str> = Lender::new();
        l.insert("a");
        l.reset();
        assert!(l.is_empty());
        let id = l.insert("b");
        assert_eq!(id, 1);
    }

    #[test]
    fn breakpoint_id_lender_is_bidirectional() {
        let mut l = BreakpointIdLender::new();
        let id = l.mint();
        l.bind(id, "cdp-1".to_string());
        assert_eq!(l.cdp_id_of(id), Some("cdp-1"));
        assert_eq!(l.external_id_of("cdp-1"), Some(id));
    }

    #[test]
    fn breakpoint_id_lender_reuses_existing_binding() {
        let mut l = BreakpointIdLender::new();
        let id1 = l.id_for_cdp("cdp-1");
        let id2 = l.id_for_cdp("cdp-1");
        assert_eq!(id1, id2);
    }

    #[test]
    fn registry_reset_on_pause_preserves_breakpoint_ids() {
        let mut reg = HandleRegistry::new();
        let bp_id = reg.breakpoint_ids.id_for_cdp("cdp-1");
        reg.frames.insert(1);
        reg.reset_on_pause();
        assert!(reg.frames.is_empty());
        assert_eq!(reg.breakpoint_ids.cdp_id_of(bp_id), Some("cdp-1"));
    }
}
