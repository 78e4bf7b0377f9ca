//! 输入、输出弧的重数矩阵.
//!
//! Every parallel arc between the same place and transition adds one to the
//! corresponding cell, so the matrix is the multigraph collapsed into counts.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};

type SmallRow<T> = SmallVec<[T; 4]>;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incidence {
    rows: IndexVec<PlaceId, SmallRow<u32>>,
    cols: usize,
}

impl Incidence {
    pub fn new(places: usize, transitions: usize) -> Self {
        let mut rows = IndexVec::new();
        for _ in 0..places {
            rows.push(SmallRow::from_elem(0, transitions));
        }
        Self {
            rows,
            cols: transitions,
        }
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    pub fn get(&self, place: PlaceId, transition: TransitionId) -> u32 {
        self.rows[place][transition.index()]
    }

    /// Records one more arc instance between `place` and `transition`.
    pub fn increment(&mut self, place: PlaceId, transition: TransitionId) {
        self.rows[place][transition.index()] += 1;
    }

    /// Non-zero cells of one transition column, in place order.
    pub fn column(&self, transition: TransitionId) -> impl Iterator<Item = (PlaceId, u32)> + '_ {
        self.rows
            .iter_enumerated()
            .map(move |(place, row)| (place, row[transition.index()]))
            .filter(|(_, count)| *count > 0)
    }
}

impl fmt::Debug for Incidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incidence")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}
