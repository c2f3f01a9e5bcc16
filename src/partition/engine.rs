use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::index::key_trie::KeyTrie;
use crate::index::value_trie::ValueTrie;
use crate::query::pattern::{Pattern, parse_query};

const INDEX_FILE_HEADER: &str = "IDIOMS_INDEX_V1";
const INDEX_FILE_NAME: &str = "index.dat";

struct IndexState {
    key_trie: KeyTrie,
    /// Object id -> its (key, value) pairs. Deletion bookkeeping and the
    /// replay source for recovery; deduplicated on insert.
    by_object: HashMap<i64, Vec<(String, String)>>,
}

/// One partition of the distributed index.
///
/// Deletion updates `by_object` only; the tries are append-only, so a deleted
/// triple keeps matching queries until the next checkpoint + recover cycle
/// rebuilds the tries from `by_object` without it.
pub struct PartitionEngine {
    server_id: usize,
    data_dir: PathBuf,
    suffix_mode: bool,
    state: RwLock<IndexState>,
}

impl PartitionEngine {
    /// Creates the partition's data directory if missing and starts with an
    /// empty index.
    pub fn new(server_id: usize, data_dir: impl Into<PathBuf>, suffix_mode: bool) -> Result<Self> {
        let data_dir = data_dir.into();
        let engine = Self {
            server_id,
            data_dir,
            suffix_mode,
            state: RwLock::new(IndexState {
                key_trie: KeyTrie::new(suffix_mode),
                by_object: HashMap::new(),
            }),
        };
        std::fs::create_dir_all(engine.server_dir())
            .with_context(|| format!("creating data dir for server {}", engine.server_id))?;
        Ok(engine)
    }

    pub fn server_id(&self) -> usize {
        self.server_id
    }

    pub fn suffix_mode(&self) -> bool {
        self.suffix_mode
    }

    fn server_dir(&self) -> PathBuf {
        self.data_dir.join(format!("server_{}", self.server_id))
    }

    fn index_path(&self) -> PathBuf {
        self.server_dir().join(INDEX_FILE_NAME)
    }

    /// Whether a checkpoint file exists for this partition.
    pub fn has_checkpoint(&self) -> bool {
        self.index_path().is_file()
    }

    /// Indexes `(key, value, object_id)`. Idempotent per triple.
    pub async fn insert(&self, key: &str, value: &str, object_id: i64) {
        let mut state = self.state.write().await;
        insert_into(&mut state, self.suffix_mode, key, value, object_id);
    }

    /// Removes the triple from the per-object bookkeeping. The trie itself is
    /// not pruned (see the type-level docs).
    pub async fn delete(&self, key: &str, value: &str, object_id: i64) {
        let mut state = self.state.write().await;
        if let Some(entries) = state.by_object.get_mut(&object_id) {
            entries.retain(|(k, v)| !(k == key && v == value));
            if entries.is_empty() {
                state.by_object.remove(&object_id);
            }
        }
        tracing::debug!(
            "server {} deleted metadata {}={} for object {}",
            self.server_id,
            key,
            value,
            object_id
        );
    }

    /// Whether this partition's key trie can contribute to the query, judged
    /// by the key-side pattern alone.
    pub async fn can_handle(&self, query: &str) -> bool {
        let state = self.state.read().await;
        match parse_query(query).key {
            Pattern::Wildcard => true,
            Pattern::Exact(k) => state.key_trie.search_exact(&k).is_some(),
            Pattern::Prefix(p) => !state.key_trie.search_prefix(&p).is_empty(),
            Pattern::Suffix(s) => !state.key_trie.search_suffix(&s).is_empty(),
            Pattern::Infix(x) => !state.key_trie.search_infix(&x).is_empty(),
        }
    }

    /// Runs the full `K=V` query against this partition and returns the
    /// matching object ids sorted ascending.
    pub async fn execute(&self, query: &str) -> Vec<i64> {
        let state = self.state.read().await;
        let condition = parse_query(query);

        let value_tries: Vec<&ValueTrie> = match &condition.key {
            Pattern::Wildcard => state.key_trie.all(),
            Pattern::Exact(k) => state.key_trie.search_exact(k).into_iter().collect(),
            Pattern::Prefix(p) => state.key_trie.search_prefix(p),
            Pattern::Suffix(s) => state.key_trie.search_suffix(s),
            Pattern::Infix(x) => state.key_trie.search_infix(x),
        };

        let mut results: HashSet<i64> = HashSet::new();
        for trie in value_tries {
            let ids = match &condition.value {
                Pattern::Wildcard => trie.collect_all(),
                Pattern::Exact(v) => trie.search_exact(v),
                Pattern::Prefix(p) => trie.search_prefix(p),
                Pattern::Suffix(s) => trie.search_suffix(s),
                Pattern::Infix(x) => trie.search_infix(x),
            };
            results.extend(ids);
        }

        let mut sorted: Vec<i64> = results.into_iter().collect();
        sorted.sort_unstable();
        sorted
    }

    /// Writes the partition contents to `index.dat`:
    ///
    /// ```text
    /// IDIOMS_INDEX_V1
    /// <server_id> <suffix_mode_as_0_or_1>
    /// <object_count>
    /// <obj_id> <metadata_count>
    /// <key_line>
    /// <value_line>
    /// ```
    pub async fn checkpoint(&self) -> Result<()> {
        let state = self.state.write().await;
        let path = self.index_path();
        let file = File::create(&path)
            .with_context(|| format!("creating checkpoint {}", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "{INDEX_FILE_HEADER}")?;
        writeln!(w, "{} {}", self.server_id, if self.suffix_mode { 1 } else { 0 })?;
        writeln!(w, "{}", state.by_object.len())?;
        for (object_id, entries) in &state.by_object {
            writeln!(w, "{} {}", object_id, entries.len())?;
            for (key, value) in entries {
                writeln!(w, "{key}")?;
                writeln!(w, "{value}")?;
            }
        }
        w.flush()?;

        tracing::info!(
            "server {} checkpointed {} objects to {}",
            self.server_id,
            state.by_object.len(),
            path.display()
        );
        Ok(())
    }

    /// Clears the in-memory index and replays the checkpoint file through
    /// `insert`. Refuses checkpoints with a wrong header or server id.
    pub async fn recover(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let path = self.index_path();
        let file =
            File::open(&path).with_context(|| format!("opening checkpoint {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();

        let header = next_line(&mut lines)?;
        if header != INDEX_FILE_HEADER {
            bail!("unrecognized checkpoint header {:?}", header);
        }
        let config = next_line(&mut lines)?;
        let stored_id: usize = config
            .split_whitespace()
            .next()
            .context("missing server id line")?
            .parse()
            .context("parsing stored server id")?;
        if stored_id != self.server_id {
            bail!(
                "checkpoint belongs to server {} but this is server {}",
                stored_id,
                self.server_id
            );
        }

        state.key_trie = KeyTrie::new(self.suffix_mode);
        state.by_object.clear();

        let object_count: usize = next_line(&mut lines)?
            .trim()
            .parse()
            .context("parsing object count")?;
        for _ in 0..object_count {
            let object_line = next_line(&mut lines)?;
            let mut parts = object_line.split_whitespace();
            let object_id: i64 = parts
                .next()
                .context("missing object id")?
                .parse()
                .context("parsing object id")?;
            let metadata_count: usize = parts
                .next()
                .context("missing metadata count")?
                .parse()
                .context("parsing metadata count")?;
            for _ in 0..metadata_count {
                let key = next_line(&mut lines)?;
                let value = next_line(&mut lines)?;
                insert_into(&mut state, self.suffix_mode, &key, &value, object_id);
            }
        }

        tracing::info!(
            "server {} recovered {} objects from {}",
            self.server_id,
            state.by_object.len(),
            path.display()
        );
        Ok(())
    }

    /// Number of objects with at least one live triple on this partition.
    pub async fn object_count(&self) -> usize {
        self.state.read().await.by_object.len()
    }

    /// Number of distinct keys indexed on this partition.
    pub async fn indexed_key_count(&self) -> usize {
        self.state.read().await.key_trie.key_count()
    }
}

fn insert_into(state: &mut IndexState, suffix_mode: bool, key: &str, value: &str, object_id: i64) {
    if suffix_mode {
        let trie = state.key_trie.insert_key_suffix_mode(key);
        trie.insert_suffix_mode(value, object_id);
    } else {
        let trie = state.key_trie.insert_key(key);
        trie.insert(value, object_id);
    }

    let entries = state.by_object.entry(object_id).or_default();
    if !entries.iter().any(|(k, v)| k == key && v == value) {
        entries.push((key.to_string(), value.to_string()));
    }
}

fn next_line(lines: &mut std::io::Lines<BufReader<File>>) -> Result<String> {
    lines
        .next()
        .context("checkpoint file ended unexpectedly")?
        .context("reading checkpoint line")
}

impl std::fmt::Debug for PartitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionEngine")
            .field("server_id", &self.server_id)
            .field("data_dir", &self.data_dir)
            .field("suffix_mode", &self.suffix_mode)
            .finish()
    }
}
