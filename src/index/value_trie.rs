use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct ValueNode {
    children: HashMap<u8, ValueNode>,
    terminal: bool,
    /// Object ids asserted at this terminal. Non-empty implies `terminal`.
    object_ids: HashSet<i64>,
    /// The complete value this terminal was reached from, as originally
    /// inserted. First writer wins when suffixes of different values land on
    /// the same node.
    full_value: Option<String>,
}

/// Second-level trie holding the values (and their object ids) of one key.
///
/// Paths are raw bytes, so values are matched byte-wise and never interpreted;
/// an embedded `*` is an ordinary byte here. The empty value is a valid
/// terminal at the root.
pub struct ValueTrie {
    root: ValueNode,
    suffix_mode: bool,
}

impl ValueTrie {
    pub fn new(suffix_mode: bool) -> Self {
        Self {
            root: ValueNode::default(),
            suffix_mode,
        }
    }

    pub fn suffix_mode(&self) -> bool {
        self.suffix_mode
    }

    /// Asserts `(value, object_id)`. Idempotent per pair.
    pub fn insert(&mut self, value: &str, object_id: i64) {
        self.insert_path(value.as_bytes(), object_id, value);
    }

    /// Asserts `(value, object_id)` and additionally indexes every proper
    /// byte suffix of `value`, each suffix terminal remembering the original
    /// value so scans can recover it.
    pub fn insert_suffix_mode(&mut self, value: &str, object_id: i64) {
        self.insert(value, object_id);
        for i in 1..value.len() {
            self.insert_path(&value.as_bytes()[i..], object_id, value);
        }
    }

    fn insert_path(&mut self, path: &[u8], object_id: i64, full_value: &str) {
        let mut node = &mut self.root;
        for &b in path {
            node = node.children.entry(b).or_default();
        }
        node.terminal = true;
        node.object_ids.insert(object_id);
        if node.full_value.is_none() {
            node.full_value = Some(full_value.to_string());
        }
    }

    /// Walks the exact byte path and returns the terminal's object ids.
    pub fn search_exact(&self, value: &str) -> HashSet<i64> {
        let mut node = &self.root;
        for b in value.bytes() {
            match node.children.get(&b) {
                Some(child) => node = child,
                None => return HashSet::new(),
            }
        }
        if node.terminal {
            node.object_ids.clone()
        } else {
            HashSet::new()
        }
    }

    /// All object ids under values starting with `prefix`. A `*` byte inside
    /// the prefix descends every branch (the parser never produces one, but
    /// the walk accepts it).
    pub fn search_prefix(&self, prefix: &str) -> HashSet<i64> {
        let mut results = HashSet::new();
        descend_prefix(&self.root, prefix.as_bytes(), &mut results);
        results
    }

    /// All object ids under values ending with `suffix`.
    ///
    /// With suffix-mode on, every suffix is already a path in this trie and
    /// the scan over terminals filters on the remembered full value. With
    /// suffix-mode off the very same terminal scan is a plain linear pass over
    /// the inserted values; correct, just not cheap.
    pub fn search_suffix(&self, suffix: &str) -> HashSet<i64> {
        if !self.suffix_mode {
            tracing::warn!("value suffix search without suffix-mode falls back to a full scan");
        }
        let mut results = HashSet::new();
        scan_terminals(&self.root, &mut |full, ids| {
            if full.ends_with(suffix) {
                results.extend(ids);
            }
        });
        results
    }

    /// All object ids under values containing `infix`. Same scan strategy and
    /// degradation behaviour as [`search_suffix`](Self::search_suffix).
    pub fn search_infix(&self, infix: &str) -> HashSet<i64> {
        if !self.suffix_mode {
            tracing::warn!("value infix search without suffix-mode falls back to a full scan");
        }
        let mut results = HashSet::new();
        scan_terminals(&self.root, &mut |full, ids| {
            if full.contains(infix) {
                results.extend(ids);
            }
        });
        results
    }

    /// Union of every terminal's object ids (the value-side wildcard).
    pub fn collect_all(&self) -> HashSet<i64> {
        let mut results = HashSet::new();
        collect_ids(&self.root, &mut results);
        results
    }
}

fn descend_prefix(node: &ValueNode, pattern: &[u8], results: &mut HashSet<i64>) {
    match pattern.split_first() {
        None => collect_ids(node, results),
        Some((&b'*', rest)) => {
            for child in node.children.values() {
                descend_prefix(child, rest, results);
            }
        }
        Some((b, rest)) => {
            if let Some(child) = node.children.get(b) {
                descend_prefix(child, rest, results);
            }
        }
    }
}

fn collect_ids(node: &ValueNode, results: &mut HashSet<i64>) {
    if node.terminal {
        results.extend(node.object_ids.iter().copied());
    }
    for child in node.children.values() {
        collect_ids(child, results);
    }
}

fn scan_terminals(node: &ValueNode, visit: &mut impl FnMut(&str, &HashSet<i64>)) {
    if node.terminal
        && let Some(full) = &node.full_value
    {
        visit(full, &node.object_ids);
    }
    for child in node.children.values() {
        scan_terminals(child, visit);
    }
}
