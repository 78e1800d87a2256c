//! The script store: tracks every script the runtime has parsed, so DAP
//! `source` requests and breakpoint reconciliation can map between CDP
//! script ids, urls, and the `placeholder://` synthetic urls scripts get
//! before a real url is known.

use crate::cdp::types::Script;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ScriptStore {
    by_id: HashMap<String, Script>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, script: Script) {
        self.by_id.insert(script.script_id.clone(), script);
    }

    pub fn get(&self, script_id: &str) -> Option<&Script> {
        self.by_id.get(script_id)
    }

    /// Find a script by url, preferring a real (non-placeholder) match.
    pub fn find_by_url(&self, url: &str) -> Option<&Script> {
        self.by_id.values().find(|s| s.url == url)
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
