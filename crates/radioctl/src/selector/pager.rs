//! Page and cursor arithmetic for the File Selector.
//!
//! ```text
//!   row 0              ┐
//!   ...                │ HEADER_LINES
//!   row HEADER_LINES   ┘◀── first body row, cursor starts here
//!   ...                  capacity body rows
//!   footer             ┐ FOOTER_LINES
//!   ...                ┘
//!   (one spare row so the last line never scrolls)
//! ```
//!
//! `cursor` is a screen row; the entry under it is
//! `cursor + offset - HEADER_LINES`.

use radioctl_proto::error::{Error, Result};

pub const HEADER_LINES: usize = 4;
pub const FOOTER_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    len: usize,
    capacity: usize,
    offset: usize,
    cursor: usize,
}

impl Pager {
    /// Fails before anything is drawn when `rows` cannot hold a header, a
    /// footer and one spare line.
    pub fn new(rows: u16, len: usize) -> Result<Self> {
        Ok(Self {
            len,
            capacity: capacity(rows)?,
            offset: 0,
            cursor: HEADER_LINES,
        })
    }

    /// New terminal height; keeps the selected entry on screen.
    pub fn resize(&mut self, rows: u16) -> Result<()> {
        let capacity = capacity(rows)?;
        let selected = self.selected().unwrap_or(0);
        self.capacity = capacity;
        self.offset = selected / capacity * capacity;
        self.cursor = HEADER_LINES + selected - self.offset;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pages(&self) -> usize {
        self.len.div_ceil(self.capacity)
    }

    /// 1-based; 0 for an empty listing.
    pub fn page(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.offset / self.capacity + 1
        }
    }

    /// Entries shown on the current page.
    pub fn page_len(&self) -> usize {
        self.capacity.min(self.len - self.offset)
    }

    /// Index range of the current page.
    pub fn visible(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.page_len()
    }

    pub fn selected(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.cursor + self.offset - HEADER_LINES)
    }

    fn last_row(&self) -> usize {
        HEADER_LINES + self.page_len().saturating_sub(1)
    }

    pub fn down(&mut self) -> bool {
        if self.cursor < self.last_row() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn up(&mut self) -> bool {
        if self.cursor > HEADER_LINES {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn top(&mut self) -> bool {
        let moved = self.cursor != HEADER_LINES;
        self.cursor = HEADER_LINES;
        moved
    }

    pub fn bottom(&mut self) -> bool {
        let last = self.last_row();
        let moved = self.cursor != last;
        self.cursor = last;
        moved
    }

    /// Advances by what the current page covered; no-op on the last page.
    pub fn next_page(&mut self) -> bool {
        let covered = self.page_len();
        if self.offset + covered >= self.len {
            return false;
        }
        self.offset += covered;
        self.cursor = HEADER_LINES;
        true
    }

    /// Goes back a full page; no-op on the first page.
    pub fn prev_page(&mut self) -> bool {
        if self.offset == 0 {
            return false;
        }
        self.offset = self.offset.saturating_sub(self.capacity);
        self.cursor = HEADER_LINES;
        true
    }
}

fn capacity(rows: u16) -> Result<usize> {
    let needed = HEADER_LINES + FOOTER_LINES + 1;
    let rows_usize = usize::from(rows);
    if rows_usize < needed {
        return Err(Error::TerminalTooSmall {
            rows,
            needed: needed as u16,
        });
    }
    Ok((rows_usize - needed).max(1))
}
