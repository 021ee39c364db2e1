use std::path::{Path, PathBuf};

use crate::loader::MaskSource;

pub const DEFAULT_MASK_COUNT: usize = 7;

/// The bundled `mask-1.png`..`mask-N.png` set, navigated with wraparound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskCatalog {
    directory: PathBuf,
    count: usize,
    current: usize,
}

impl MaskCatalog {
    /// `start` is 1-based and clamped into the catalogue.
    pub fn new(directory: impl Into<PathBuf>, count: usize, start: usize) -> Self {
        let count = count.max(1);
        Self {
            directory: directory.into(),
            count,
            current: start.clamp(1, count),
        }
    }

    pub fn file_name(index: usize) -> String {
        format!("mask-{index}.png")
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.directory.join(Self::file_name(index))
    }

    pub fn source(&self, index: usize) -> MaskSource {
        MaskSource::Bundled {
            index,
            path: self.path(index),
        }
    }

    pub fn current_source(&self) -> MaskSource {
        self.source(self.current)
    }

    pub fn next(&mut self) -> usize {
        self.current = if self.current >= self.count {
            1
        } else {
            self.current + 1
        };
        self.current
    }

    pub fn previous(&mut self) -> usize {
        self.current = if self.current <= 1 {
            self.count
        } else {
            self.current - 1
        };
        self.current
    }

    pub fn select(&mut self, index: usize) -> Option<usize> {
        if (1..=self.count).contains(&index) {
            self.current = index;
            Some(index)
        } else {
            None
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, PathBuf)> + '_ {
        (1..=self.count).map(move |index| (index, self.path(index)))
    }
}

impl Default for MaskCatalog {
    fn default() -> Self {
        Self::new("masks", DEFAULT_MASK_COUNT, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_wraps_from_last_to_first() {
        let mut catalog = MaskCatalog::new("masks", 7, 7);
        assert_eq!(catalog.next(), 1);
        assert_eq!(catalog.next(), 2);
    }

    #[test]
    fn previous_wraps_from_first_to_last() {
        let mut catalog = MaskCatalog::default();
        assert_eq!(catalog.previous(), 7);
        assert_eq!(catalog.previous(), 6);
    }

    #[test]
    fn paths_follow_mask_naming() {
        let catalog = MaskCatalog::new("/share/masks", 3, 2);
        assert_eq!(catalog.path(2), PathBuf::from("/share/masks/mask-2.png"));
        assert_eq!(
            catalog.current_source(),
            MaskSource::Bundled {
                index: 2,
                path: PathBuf::from("/share/masks/mask-2.png"),
            }
        );
        assert_eq!(catalog.entries().count(), 3);
    }

    #[test]
    fn start_and_selection_stay_in_range() {
        let mut catalog = MaskCatalog::new("masks", 3, 9);
        assert_eq!(catalog.current(), 3);
        assert_eq!(catalog.select(0), None);
        assert_eq!(catalog.select(2), Some(2));
        assert_eq!(MaskCatalog::new("masks", 0, 0).count(), 1);
    }
}
