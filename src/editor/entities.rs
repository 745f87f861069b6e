use std::collections::VecDeque;

use bevy::prelude::*;

use crate::world::HexGrid;

/// Marker for the 2D camera that follows the cursor.
#[derive(Component, Reflect)]
pub struct EditorCamera;

/// Most recent status messages, newest last.
#[derive(Resource, Debug)]
pub struct EditorLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl EditorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Records a status line.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.record(line);
    }

    /// Records a failed command.
    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        warn!("{line}");
        self.record(line);
    }

    fn record(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

/// Cursor into the props that fit the selected section.
#[derive(Resource, Debug, Default)]
pub struct PropPalette {
    pub index: usize,
}

impl PropPalette {
    /// Definition ids offered for the selected section: filtered by the
    /// cursor tile's biome when there is a tile, by section alone otherwise.
    pub fn candidates(grid: &HexGrid) -> Vec<String> {
        let section = grid.selected_section();
        let props = grid.props();
        match grid.tile(grid.cursor()) {
            Some(tile) => props
                .definitions_for(section, tile.biome())
                .into_iter()
                .map(|d| d.id.clone())
                .collect(),
            None => props
                .definition_ids()
                .filter(|id| {
                    props
                        .definition(id)
                        .is_some_and(|d| d.section_filter.admits(section))
                })
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Currently highlighted id, if anything fits.
    pub fn selected(&self, grid: &HexGrid) -> Option<String> {
        let candidates = Self::candidates(grid);
        if candidates.is_empty() {
            return None;
        }
        candidates.get(self.index % candidates.len()).cloned()
    }

    /// Moves the highlight by `delta`, wrapping over `len` entries.
    pub fn step(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.index = 0;
            return;
        }
        let current = (self.index % len) as isize;
        self.index = (current + delta).rem_euclid(len as isize) as usize;
    }
}
