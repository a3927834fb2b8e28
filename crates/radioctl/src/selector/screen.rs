//! Drawing for the File Selector.
//!
//! Everything is positioned with absolute cursor moves, so a frame never
//! depends on what the previous one left behind.  Raw mode does no newline
//! translation; multi-line text ends each line with `\r\n`.

use std::io::{self, Write};
use std::path::Path;

use crossterm::cursor::MoveTo;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{queue, QueueableCommand};
use radioctl_proto::platform::PROG_NAME;
use unicode_width::UnicodeWidthChar;

use super::listing::Entry;
use super::pager::{Pager, HEADER_LINES};

const HELP: &[&str] = &[
    "help",
    "j, down      # next line",
    "k, up        # previous line",
    "J, shift+dn  # last line of the page",
    "K, shift+up  # first line of the page",
    "l, right     # next page",
    "h, left      # previous page",
    "enter        # open directory or play file",
    "-            # parent directory",
    "~            # home directory",
    "_, ^, p      # previous directory",
    "., r         # redraw",
    "q, esc       # quit",
    "?            # this help",
    "",
    "press any key to return",
];

/// Raw mode for as long as the guard lives.
pub struct RawTerminal;

impl RawTerminal {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

pub struct Screen<W: Write> {
    out: W,
    cols: u16,
}

impl<W: Write> Screen<W> {
    pub fn new(out: W, cols: u16) -> Self {
        Self { out, cols }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn set_cols(&mut self, cols: u16) {
        self.cols = cols;
    }

    /// Whole frame: header, current page, footer.
    pub fn page(&mut self, cwd: &Path, entries: &[Entry], pager: &Pager, status: &str) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        let title = format!("### {} SF ###", PROG_NAME.to_uppercase());
        self.row(0, &title, false)?;
        self.row(1, &cwd.display().to_string(), false)?;
        self.row(2, "?) help  q) quit", false)?;

        if pager.is_empty() {
            self.row(HEADER_LINES, "(empty directory)", false)?;
        }
        for index in pager.visible() {
            let row = HEADER_LINES + index - pager.offset();
            self.row(row, &entries[index].label(), row == pager.cursor())?;
        }
        self.footer(entries, pager, status)
    }

    /// Repaint the row the cursor left, the row it landed on, and the footer.
    pub fn moved(&mut self, entries: &[Entry], pager: &Pager, from: usize, status: &str) -> io::Result<()> {
        for (row, highlight) in [(from, false), (pager.cursor(), true)] {
            let index = row + pager.offset() - HEADER_LINES;
            if let Some(entry) = entries.get(index) {
                self.row(row, &entry.label(), highlight)?;
            }
        }
        self.footer(entries, pager, status)
    }

    pub fn footer(&mut self, entries: &[Entry], pager: &Pager, status: &str) -> io::Result<()> {
        let first = HEADER_LINES + pager.capacity();
        let position = match pager.selected().and_then(|i| entries.get(i).map(|e| (i, e))) {
            Some((index, entry)) => format!("# {}/{}) {}", index + 1, pager.len(), entry.name),
            None => format!("# 0/{})", pager.len()),
        };
        self.row(first, &position, false)?;
        self.row(first + 1, &format!("> {}/{}", pager.page(), pager.pages()), false)?;
        self.row(first + 2, status, false)?;
        self.out.queue(MoveTo(0, pager.cursor() as u16))?;
        self.out.flush()
    }

    pub fn help(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        for line in HELP {
            queue!(self.out, Print(truncate(line, self.cols)), Print("\r\n"))?;
        }
        self.out.flush()
    }

    fn row(&mut self, row: usize, text: &str, highlight: bool) -> io::Result<()> {
        queue!(self.out, MoveTo(0, row as u16), Clear(ClearType::CurrentLine))?;
        if highlight {
            self.out.queue(SetAttribute(Attribute::Reverse))?;
        }
        self.out.queue(Print(truncate(text, self.cols)))?;
        if highlight {
            self.out.queue(SetAttribute(Attribute::Reset))?;
        }
        Ok(())
    }
}

/// Longest prefix of `text` that fits in `cols` terminal columns.
pub fn truncate(text: &str, cols: u16) -> String {
    let mut width = 0;
    text.chars()
        .take_while(|c| {
            width += c.width().unwrap_or(0);
            width <= usize::from(cols)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::listing::EntryKind;
    use std::path::PathBuf;

    fn entry(name: &str) -> Entry {
        Entry {
            name: name.to_string(),
            path: PathBuf::from("/music").join(name),
            kind: EntryKind::File,
            indicator: None,
        }
    }

    fn text(screen: &Screen<Vec<u8>>) -> String {
        String::from_utf8_lossy(screen.get_ref()).into_owned()
    }

    #[test]
    fn test_truncate_counts_columns() {
        assert_eq!(truncate("abcdef", 4), "abcd");
        assert_eq!(truncate("日本語", 5), "日本");
        assert_eq!(truncate("ab", 10), "ab");
    }

    #[test]
    fn test_page_shows_footer() {
        let entries: Vec<Entry> = ["a.mp3", "b.mp3", "c.mp3"].into_iter().map(entry).collect();
        let mut pager = Pager::new(10, entries.len()).unwrap();
        pager.down();
        let mut screen = Screen::new(Vec::new(), 80);
        screen.page(Path::new("/music"), &entries, &pager, "ready").unwrap();

        let out = text(&screen);
        assert!(out.contains("/music"));
        assert!(out.contains("# 2/3) b.mp3"));
        assert!(out.contains("> 1/2"));
        assert!(out.contains("ready"));
        assert!(!out.contains("c.mp3"));
    }

    #[test]
    fn test_empty_directory_notice() {
        let pager = Pager::new(10, 0).unwrap();
        let mut screen = Screen::new(Vec::new(), 80);
        screen.page(Path::new("/empty"), &[], &pager, "").unwrap();
        let out = text(&screen);
        assert!(out.contains("(empty directory)"));
        assert!(out.contains("# 0/0)"));
        assert!(out.contains("> 0/0"));
    }
}
