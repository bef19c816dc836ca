//! The 13-state gene-structure topology and its collapse into the three
//! semantic categories used for duration modeling.
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// The model this feature is built for has exactly 13 states
/// (intergenic + exon frames and intron phases on both strands).
pub const NUM_STATES: usize = 13;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Intergenic,
    Exon,
    Intron,
}

impl Category {
    /// Ordinal order also fixes the per-category feature-offset order.
    pub const ALL: [Category; 3] = [Category::Intergenic, Category::Exon, Category::Intron];

    pub fn index(self) -> usize {
        match self {
            Category::Intergenic => 0,
            Category::Exon => 1,
            Category::Intron => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Intergenic => "Intergenic",
            Category::Exon => "Exon",
            Category::Intron => "Intron",
        }
    }
}

/// State → category lookup table, built once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryMap {
    table: [Category; NUM_STATES],
}

impl Default for CategoryMap {
    fn default() -> CategoryMap {
        CategoryMap::new()
    }
}

impl CategoryMap {
    pub fn new() -> CategoryMap {
        let mut table = [Category::Intergenic; NUM_STATES];
        for state in [1, 2, 3, 7, 8, 9] {
            table[state] = Category::Exon;
        }
        for state in [4, 5, 6, 10, 11, 12] {
            table[state] = Category::Intron;
        }
        CategoryMap { table }
    }

    /// A state id outside the topology is a configuration error.
    pub fn category(&self, state: usize) -> Result<Category> {
        self.table
            .get(state)
            .copied()
            .ok_or(anyhow!("State {} is not part of the 13-state topology", state))
    }
}
