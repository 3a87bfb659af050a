//! Cell references and rectangular areas.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "B2", "AA100") and zero-indexed column/row coordinates, plus
//! [`Area`], the inclusive rectangle used for sheet extents and merge regions.
//!
//! # Examples
//!
//! ```
//! use flowtable_engine::engine::{Area, CellRef};
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 1);
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//!
//! let area = Area::from_range("A1:C2").unwrap();
//! assert!(area.contains(&CellRef::new(2, 1)));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A reference to a cell by column and row indices (0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$").expect("valid A1 regex")
    })
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "B2", "AA10").
    /// Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let mut col_acc = 0usize;
        for c in letters.to_ascii_uppercase().bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        let col = col_acc.checked_sub(1)?;

        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;

        Some(CellRef::new(col, row))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Offset this reference by whole rows/columns.
    pub fn offset(&self, cols: usize, rows: usize) -> CellRef {
        CellRef::new(self.col + cols, self.row + rows)
    }
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

/// Dimension for row/column operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dimension {
    Row,
    Column,
}

impl Dimension {
    /// Get the coordinate value from a CellRef for this dimension
    pub fn get_coord(&self, cell_ref: &CellRef) -> usize {
        match self {
            Dimension::Row => cell_ref.row,
            Dimension::Column => cell_ref.col,
        }
    }

    /// Create a new CellRef with modified coordinate in this dimension
    pub fn new_cell_ref(&self, cell_ref: &CellRef, new_coord: usize) -> CellRef {
        match self {
            Dimension::Row => CellRef::new(cell_ref.col, new_coord),
            Dimension::Column => CellRef::new(new_coord, cell_ref.row),
        }
    }
}

/// Inclusive, axis-aligned rectangle of cells (0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl Area {
    /// Build an area from two corners in any order.
    pub fn new(left: usize, top: usize, right: usize, bottom: usize) -> Area {
        Area {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// The single-cell area at `at`.
    pub fn cell(at: CellRef) -> Area {
        Area::new(at.col, at.row, at.col, at.row)
    }

    /// The area starting at `at` spanning `cols` x `rows` cells (both at least 1).
    pub fn sized(at: CellRef, cols: usize, rows: usize) -> Area {
        Area::new(
            at.col,
            at.row,
            at.col + cols.max(1) - 1,
            at.row + rows.max(1) - 1,
        )
    }

    /// Parse "A1:C3" (or a lone "B2") into an area.
    pub fn from_range(range: &str) -> Option<Area> {
        let (start, end) = match range.split_once(':') {
            Some((start, end)) => (start, end),
            None => (range, range),
        };
        let start = CellRef::from_str(start.trim())?;
        let end = CellRef::from_str(end.trim())?;
        Some(Area::new(start.col, start.row, end.col, end.row))
    }

    pub fn contains(&self, at: &CellRef) -> bool {
        at.col >= self.left && at.col <= self.right && at.row >= self.top && at.row <= self.bottom
    }

    pub fn top_left(&self) -> CellRef {
        CellRef::new(self.left, self.top)
    }

    pub fn bottom_right(&self) -> CellRef {
        CellRef::new(self.right, self.bottom)
    }

    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    /// Adjust this area for `count` rows/columns inserted before index `at`.
    ///
    /// Areas entirely at or past the insertion point move; an area straddling
    /// it grows.
    pub fn shift_for_insert(&mut self, dim: Dimension, at: usize, count: usize) {
        let (low, high) = match dim {
            Dimension::Row => (&mut self.top, &mut self.bottom),
            Dimension::Column => (&mut self.left, &mut self.right),
        };
        if *low >= at {
            *low += count;
            *high += count;
        } else if *high >= at {
            *high += count;
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.top_left(), self.bottom_right())
    }
}
