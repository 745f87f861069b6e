//! Recoverable failures reported by the world core.
//!
//! None of these abort the process; callers surface them to the editor's
//! status log. Out-of-range wedge indices are not represented here: they are
//! programmer errors and panic at construction.

use std::path::PathBuf;

use crate::world::{AxialCoord, SectionAddress};

/// Error type for grid, registry and persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A placement referenced a prop id with no loaded definition.
    #[error("unknown prop definition '{0}'")]
    UnknownDefinition(String),
    /// The target section already holds a prop.
    #[error("section {0} is already occupied")]
    SectionOccupied(SectionAddress),
    /// The operation needs a tile at a coordinate that has none.
    #[error("no tile at {0}")]
    NoTileAtCoordinate(AxialCoord),
    /// A definition, palette or world-state record could not be parsed.
    #[error("malformed record in {origin}: {reason}")]
    MalformedRecord {
        /// File name or record label the failure came from.
        origin: String,
        /// Parser message.
        reason: String,
    },
    /// A file could not be read or written.
    #[error("cannot access {}: {source}", path.display())]
    PersistenceIo {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl WorldError {
    /// Builds a [`WorldError::MalformedRecord`] from anything displayable.
    pub fn malformed(origin: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedRecord {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a tolerant bulk load: how many records made it in, and why the
/// others were skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Records accepted.
    pub loaded: usize,
    /// Records rejected, in encounter order.
    pub skipped: Vec<WorldError>,
}

impl LoadReport {
    /// Records a skipped entry and logs it.
    pub fn skip(&mut self, err: WorldError) {
        bevy::log::warn!("skipping record: {err}");
        self.skipped.push(err);
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.skipped.extend(other.skipped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_message_names_origin() {
        let err = WorldError::malformed("rock.json", "missing field `prop_id`");
        assert_eq!(
            err.to_string(),
            "malformed record in rock.json: missing field `prop_id`"
        );
    }

    #[test]
    fn report_merge_accumulates() {
        let mut a = LoadReport {
            loaded: 2,
            ..Default::default()
        };
        let mut b = LoadReport {
            loaded: 1,
            ..Default::default()
        };
        b.skip(WorldError::UnknownDefinition("ghost".into()));
        a.merge(b);
        assert_eq!(a.loaded, 3);
        assert_eq!(a.skipped.len(), 1);
    }
}
