use std::collections::HashMap;

use super::value_trie::ValueTrie;

#[derive(Default)]
struct KeyNode {
    children: HashMap<u8, KeyNode>,
    /// The complete key this terminal was reached from. First writer wins
    /// when suffixes of different keys land on the same node.
    full_key: Option<String>,
    /// Arena index of the value trie owned by this node; present exactly when
    /// this byte path was inserted as a key in its own right.
    own: Option<usize>,
    /// Non-owning handle back to the originating key's value trie, set when
    /// this node was reached as a suffix of that key.
    origin: Option<usize>,
}

impl KeyNode {
    fn terminal(&self) -> bool {
        self.own.is_some() || self.origin.is_some()
    }

    /// The value trie this terminal answers scans with: its own if the key
    /// was inserted directly, otherwise the origin handle.
    fn trie_index(&self) -> Option<usize> {
        self.own.or(self.origin)
    }
}

/// First-level trie: the directory of metadata keys.
///
/// Each directly-inserted key owns one [`ValueTrie`], stored in an arena so
/// suffix terminals can refer back to it without sharing ownership. Searches
/// return borrowed value tries in traversal order; callers union the results,
/// so the occasional duplicate handle is harmless.
pub struct KeyTrie {
    root: KeyNode,
    tries: Vec<ValueTrie>,
    suffix_mode: bool,
}

impl KeyTrie {
    pub fn new(suffix_mode: bool) -> Self {
        Self {
            root: KeyNode::default(),
            tries: Vec::new(),
            suffix_mode,
        }
    }

    pub fn suffix_mode(&self) -> bool {
        self.suffix_mode
    }

    /// Number of distinct keys inserted so far.
    pub fn key_count(&self) -> usize {
        self.tries.len()
    }

    /// Inserts `key` and returns its value trie, allocating one on first
    /// touch. The returned handle is stable across later insertions.
    pub fn insert_key(&mut self, key: &str) -> &mut ValueTrie {
        let idx = self.insert_owned(key);
        &mut self.tries[idx]
    }

    /// Inserts `key` plus every proper byte suffix of it. Suffix terminals
    /// record `key` as their full key and hold a handle to the returned trie,
    /// which belongs to the full key alone.
    pub fn insert_key_suffix_mode(&mut self, key: &str) -> &mut ValueTrie {
        let idx = self.insert_owned(key);
        for i in 1..key.len() {
            self.insert_suffix_ref(&key.as_bytes()[i..], key, idx);
        }
        &mut self.tries[idx]
    }

    fn insert_owned(&mut self, key: &str) -> usize {
        let suffix_mode = self.suffix_mode;
        let mut node = &mut self.root;
        for b in key.bytes() {
            node = node.children.entry(b).or_default();
        }
        if node.full_key.is_none() {
            node.full_key = Some(key.to_string());
        }
        match node.own {
            Some(idx) => idx,
            None => {
                self.tries.push(ValueTrie::new(suffix_mode));
                let idx = self.tries.len() - 1;
                node.own = Some(idx);
                idx
            }
        }
    }

    fn insert_suffix_ref(&mut self, path: &[u8], full_key: &str, origin: usize) {
        let mut node = &mut self.root;
        for &b in path {
            node = node.children.entry(b).or_default();
        }
        if node.full_key.is_none() {
            node.full_key = Some(full_key.to_string());
        }
        if node.origin.is_none() {
            node.origin = Some(origin);
        }
    }

    /// The value trie of a directly-inserted key. Suffix-only terminals do
    /// not answer exact lookups.
    pub fn search_exact(&self, key: &str) -> Option<&ValueTrie> {
        let mut node = &self.root;
        for b in key.bytes() {
            node = node.children.get(&b)?;
        }
        node.own.map(|idx| &self.tries[idx])
    }

    /// Value tries of every directly-inserted key starting with `prefix`.
    /// A `*` byte in the prefix descends all branches.
    pub fn search_prefix(&self, prefix: &str) -> Vec<&ValueTrie> {
        let mut indices = Vec::new();
        descend_prefix(&self.root, prefix.as_bytes(), &mut indices);
        indices.into_iter().map(|i| &self.tries[i]).collect()
    }

    /// Value tries of every key ending with `suffix`. Scans terminals and
    /// filters on the remembered full key; without suffix-mode this is the
    /// same (correct) scan over directly-inserted keys only.
    pub fn search_suffix(&self, suffix: &str) -> Vec<&ValueTrie> {
        if !self.suffix_mode {
            tracing::warn!("key suffix search without suffix-mode falls back to a full scan");
        }
        self.scan_matching(|full| full.ends_with(suffix))
    }

    /// Value tries of every key containing `infix`. Same scan strategy and
    /// degradation behaviour as [`search_suffix`](Self::search_suffix).
    pub fn search_infix(&self, infix: &str) -> Vec<&ValueTrie> {
        if !self.suffix_mode {
            tracing::warn!("key infix search without suffix-mode falls back to a full scan");
        }
        self.scan_matching(|full| full.contains(infix))
    }

    /// Every owned value trie (the key-side wildcard).
    pub fn all(&self) -> Vec<&ValueTrie> {
        self.tries.iter().collect()
    }

    fn scan_matching(&self, predicate: impl Fn(&str) -> bool) -> Vec<&ValueTrie> {
        let mut indices = Vec::new();
        scan_terminals(&self.root, &predicate, &mut indices);
        indices.into_iter().map(|i| &self.tries[i]).collect()
    }
}

fn descend_prefix(node: &KeyNode, pattern: &[u8], indices: &mut Vec<usize>) {
    match pattern.split_first() {
        None => collect_owned(node, indices),
        Some((&b'*', rest)) => {
            for child in node.children.values() {
                descend_prefix(child, rest, indices);
            }
        }
        Some((b, rest)) => {
            if let Some(child) = node.children.get(b) {
                descend_prefix(child, rest, indices);
            }
        }
    }
}

fn collect_owned(node: &KeyNode, indices: &mut Vec<usize>) {
    if let Some(idx) = node.own {
        indices.push(idx);
    }
    for child in node.children.values() {
        collect_owned(child, indices);
    }
}

fn scan_terminals(node: &KeyNode, predicate: &impl Fn(&str) -> bool, indices: &mut Vec<usize>) {
    if node.terminal()
        && let Some(full) = &node.full_key
        && predicate(full)
        && let Some(idx) = node.trie_index()
    {
        indices.push(idx);
    }
    for child in node.children.values() {
        scan_terminals(child, predicate, indices);
    }
}
