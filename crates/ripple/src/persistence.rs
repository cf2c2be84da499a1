//! JSONL snapshots of the graph.
//!
//! Each line is one record tagged with `"record"`:
//!
//! ```text
//! {"record":"entity","id":"feat-a3f8","kind":"feature",...}
//! {"record":"relationship","source_id":"doc-k2p0","type":"documents","target_id":"feat-a3f8",...}
//! ```
//!
//! Only the primary direction of a paired type is written; the inverse is
//! rebuilt on load. Loading is resilient: bad lines are skipped and reported
//! as [`LoadWarning`]s rather than failing the whole load.

use crate::domain::{Entity, EntityId, Relationship};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::graph::GraphState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Entity(Entity),
    Relationship(Relationship),
}

/// Non-fatal problems found while loading a snapshot.
///
/// The offending line is skipped; everything else is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// Line that is not a valid record
    MalformedLine {
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Entity record that fails validation
    InvalidEntity {
        /// 1-based line number
        line_number: usize,
        /// ID of the rejected entity
        entity_id: EntityId,
        /// Validation message
        error: String,
    },

    /// Relationship whose endpoint is not in the snapshot
    OrphanedRelationship {
        /// 1-based line number
        line_number: usize,
        /// The missing entity
        missing: EntityId,
    },

    /// Relationship rejected by the index (self-loop, bad weight)
    InvalidRelationship {
        /// 1-based line number
        line_number: usize,
        /// Index message
        error: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine { line_number, error } => {
                write!(f, "line {line_number}: malformed record: {error}")
            }
            Self::InvalidEntity {
                line_number,
                entity_id,
                error,
            } => write!(f, "line {line_number}: invalid entity {entity_id}: {error}"),
            Self::OrphanedRelationship {
                line_number,
                missing,
            } => write!(
                f,
                "line {line_number}: relationship references unknown entity {missing}"
            ),
            Self::InvalidRelationship { line_number, error } => {
                write!(f, "line {line_number}: invalid relationship: {error}")
            }
        }
    }
}

/// Load a snapshot. A missing file yields an empty graph.
///
/// Entities are loaded before relationships regardless of their order in
/// the file.
///
/// # Errors
///
/// Returns `Error::Io` if the file exists but cannot be read.
pub async fn load(path: &Path) -> Result<(GraphState, Vec<LoadWarning>)> {
    let mut state = GraphState::new();
    let mut warnings = Vec::new();

    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No snapshot found, starting empty");
            return Ok((state, warnings));
        }
        Err(e) => return Err(e.into()),
    };

    let mut relationships = Vec::new();
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line) {
            Ok(Record::Entity(entity)) => {
                let entity_id = entity.id.clone();
                if let Err(e) = state.restore_entity(entity) {
                    warnings.push(LoadWarning::InvalidEntity {
                        line_number,
                        entity_id,
                        error: e.to_string(),
                    });
                }
            }
            Ok(Record::Relationship(rel)) => relationships.push((line_number, rel)),
            Err(e) => warnings.push(LoadWarning::MalformedLine {
                line_number,
                error: e.to_string(),
            }),
        }
    }

    for (line_number, rel) in relationships {
        match state.ingest_relationship(&rel.source_id, rel.rel_type, &rel.target_id, rel.attrs) {
            Ok(_) => {}
            Err(Error::NotFound(missing)) => warnings.push(LoadWarning::OrphanedRelationship {
                line_number,
                missing,
            }),
            Err(e) => warnings.push(LoadWarning::InvalidRelationship {
                line_number,
                error: e.to_string(),
            }),
        }
    }

    for warning in &warnings {
        warn!(path = %path.display(), "{warning}");
    }
    info!(
        path = %path.display(),
        entities = state.entities().len(),
        relationships = state.index().edge_count(),
        warnings = warnings.len(),
        "Snapshot loaded"
    );
    Ok((state, warnings))
}

/// Serialize the graph as JSONL text, one record per line.
///
/// Output is deterministic: entities by ID, then primary relationships by
/// `(source, type, target)`.
///
/// # Errors
///
/// Returns `Error::Json` if a record cannot be serialized.
pub fn encode(state: &GraphState) -> Result<String> {
    let mut out = String::new();
    for entity in state.entities().iter() {
        out.push_str(&serde_json::to_string(&Record::Entity(entity.clone()))?);
        out.push('\n');
    }

    let mut relationships: Vec<Relationship> = state
        .index()
        .relationships()
        .filter(|r| r.rel_type.is_primary())
        .collect();
    relationships.sort_by(|a, b| {
        (&a.source_id, a.rel_type, &a.target_id).cmp(&(&b.source_id, b.rel_type, &b.target_id))
    });
    for rel in relationships {
        out.push_str(&serde_json::to_string(&Record::Relationship(rel))?);
        out.push('\n');
    }
    Ok(out)
}

/// Save the engine's graph to `path` atomically.
///
/// Writes to a temporary file next to `path` and renames it into place, so
/// an interrupted save leaves the previous snapshot intact.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::Json` on failure.
pub async fn save(engine: &Engine, path: &Path) -> Result<()> {
    // Encode under the read lock, write after releasing it
    let content = engine.with_state(encode)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("jsonl.tmp");

    let file = File::create(&temp_path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes()).await?;
    writer.flush().await?;
    drop(writer);

    fs::rename(&temp_path, path).await?;
    debug!(path = %path.display(), bytes = content.len(), "Snapshot saved");
    Ok(())
}
