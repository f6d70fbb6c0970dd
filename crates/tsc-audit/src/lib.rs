//! Append-only run journal.
//!
//! JSON Lines, one entry per line, keys sorted. Entries are hash-chained:
//! `hash_self` is SHA-256 over the canonical entry without `hash_self`, and
//! each entry's `hash_prev` is the previous entry's `hash_self`. Opening an
//! existing journal resumes the chain, so one file can hold many runs.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use tsc_reconcile::{ReconcileError, RunReport};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    RunStart,
    PhaseRecord,
    Warning,
    Failure,
    Checklist,
    Verdict,
    RunAborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub run_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub seq: u64,
    pub kind: EntryKind,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

pub struct Journal {
    path: PathBuf,
    run_id: Uuid,
    last_hash: Option<String>,
    /// Entries already in the file; the next entry's seq.
    seq: u64,
}

impl Journal {
    /// Open (or create) the journal at `path` for `run_id`, resuming the hash
    /// chain from the last entry already on disk.
    pub fn open(path: impl AsRef<Path>, run_id: Uuid) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        let mut last_hash = None;
        let mut seq = 0;
        if path.exists() {
            let content =
                fs::read_to_string(&path).with_context(|| format!("read journal {:?}", path))?;
            if let Some(line) = content.lines().rev().find(|l| !l.trim().is_empty()) {
                let last: JournalEntry =
                    serde_json::from_str(line.trim()).context("parse last journal entry")?;
                last_hash = last.hash_self;
                seq = last.seq + 1;
            }
        }
        debug!(path = ?path, seq, "journal opened");

        Ok(Self {
            path,
            run_id,
            last_hash,
            seq,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn append(&mut self, kind: EntryKind, payload: Value) -> Result<JournalEntry> {
        let entry_id = derive_entry_id(self.last_hash.as_deref(), &payload, self.seq)?;
        let mut entry = JournalEntry {
            entry_id,
            run_id: self.run_id,
            ts_utc: Utc::now(),
            seq: self.seq,
            kind,
            payload,
            hash_prev: self.last_hash.clone(),
            hash_self: None,
        };
        let self_hash = compute_entry_hash(&entry)?;
        entry.hash_self = Some(self_hash.clone());

        append_line(&self.path, &canonical_json_line(&entry)?)?;
        self.last_hash = Some(self_hash);
        self.seq += 1;
        Ok(entry)
    }
}

/// Entry id: UUID v5 over chain position, previous hash and payload. No RNG,
/// so a replayed journal reproduces its ids.
fn derive_entry_id(prev_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let mut material = Vec::new();
    material.extend_from_slice(&seq.to_be_bytes());
    material.extend_from_slice(prev_hash.unwrap_or("").as_bytes());
    material.extend_from_slice(canonical_json_line(payload)?.as_bytes());
    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, &material))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open journal {:?}", path))?;
    f.write_all(line.as_bytes()).context("write journal line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize journal entry failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// SHA-256 over the canonical entry with `hash_self` cleared.
pub fn compute_entry_hash(entry: &JournalEntry) -> Result<String> {
    let mut clone = entry.clone();
    clone.hash_self = None;
    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    Intact { entries: usize },
    /// `line` is 1-based.
    Broken { line: usize, reason: String },
}

pub fn verify_chain(path: impl AsRef<Path>) -> Result<ChainStatus> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    verify_chain_str(&content)
}

pub fn verify_chain_str(content: &str) -> Result<ChainStatus> {
    let mut prev_hash: Option<String> = None;
    let mut entries = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry: JournalEntry = match serde_json::from_str(trimmed) {
            Ok(e) => e,
            Err(e) => {
                return Ok(ChainStatus::Broken {
                    line: i + 1,
                    reason: format!("unparseable entry: {e}"),
                })
            }
        };

        if entry.seq != entries as u64 {
            return Ok(ChainStatus::Broken {
                line: i + 1,
                reason: format!("seq gap: expected {}, got {}", entries, entry.seq),
            });
        }
        if entry.hash_prev != prev_hash {
            return Ok(ChainStatus::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, entry.hash_prev
                ),
            });
        }
        let Some(claimed) = entry.hash_self.clone() else {
            return Ok(ChainStatus::Broken {
                line: i + 1,
                reason: "missing hash_self".to_string(),
            });
        };
        let recomputed = compute_entry_hash(&entry)?;
        if claimed != recomputed {
            return Ok(ChainStatus::Broken {
                line: i + 1,
                reason: format!("hash_self mismatch: claimed {claimed}, recomputed {recomputed}"),
            });
        }

        prev_hash = Some(claimed);
        entries += 1;
    }

    Ok(ChainStatus::Intact { entries })
}

// ---------------------------------------------------------------------------
// Run persistence
// ---------------------------------------------------------------------------

/// Persist a completed run. Returns the number of entries written.
pub fn write_run_report(
    journal: &mut Journal,
    report: &RunReport,
    config_hash: Option<&str>,
) -> Result<usize> {
    if report.run_id != journal.run_id {
        bail!(
            "journal opened for run {} but report is for run {}",
            journal.run_id,
            report.run_id
        );
    }
    let start = journal.seq();

    journal.append(
        EntryKind::RunStart,
        json!({
            "config_hash": config_hash,
            "profile": report.profile,
            "pool": report.pool,
        }),
    )?;
    for rec in &report.records.records {
        journal.append(EntryKind::PhaseRecord, serde_json::to_value(rec)?)?;
    }
    for w in &report.warnings {
        journal.append(
            EntryKind::Warning,
            json!({ "warning": w, "message": w.to_string() }),
        )?;
    }
    for f in &report.failures {
        journal.append(
            EntryKind::Failure,
            json!({ "failure": f, "message": f.to_string() }),
        )?;
    }
    journal.append(EntryKind::Checklist, serde_json::to_value(&report.checklist)?)?;
    if let Some(e) = &report.aborted {
        journal.append(
            EntryKind::RunAborted,
            json!({ "error": e, "message": e.to_string() }),
        )?;
    }
    journal.append(
        EntryKind::Verdict,
        json!({
            "verdict": report.verdict,
            "advisories": report.advisories,
            "degraded": report.degraded,
            "mutations": report.mutation_count(),
        }),
    )?;

    Ok((journal.seq() - start) as usize)
}

/// Persist a run that ended without a report.
pub fn write_run_failure(
    journal: &mut Journal,
    err: &ReconcileError,
    config_hash: Option<&str>,
) -> Result<JournalEntry> {
    journal.append(
        EntryKind::RunAborted,
        json!({ "error": err, "message": err.to_string(), "config_hash": config_hash }),
    )
}
