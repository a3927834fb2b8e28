use std::fs::{self, FileType};
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};

use radioctl_proto::error::{Error, Result};

/// What Enter does with an entry, decided after following one symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    /// `ls -F` style suffix.
    pub indicator: Option<char>,
}

impl Entry {
    pub fn label(&self) -> String {
        match self.indicator {
            Some(c) => format!("{}{}", self.name, c),
            None => self.name.clone(),
        }
    }
}

/// Entries of `dir`, sorted by name.
pub fn list(dir: &Path) -> Result<Vec<Entry>> {
    let read = fs::read_dir(dir).map_err(|e| Error::fs("list", dir, e))?;
    let mut entries = Vec::new();
    for item in read {
        let item = item.map_err(|e| Error::fs("list", dir, e))?;
        let path = item.path();
        let Ok(meta) = fs::symlink_metadata(&path) else {
            continue;
        };
        let file_type = meta.file_type();
        entries.push(Entry {
            name: item.file_name().to_string_lossy().into_owned(),
            kind: kind_of(&path, file_type),
            indicator: indicator(file_type, meta.permissions().mode()),
            path,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn kind_of(path: &Path, file_type: FileType) -> EntryKind {
    if file_type.is_dir() {
        return EntryKind::Dir;
    }
    if !file_type.is_symlink() {
        return EntryKind::File;
    }
    // one level only: a link to a link is treated as a file
    let target = match fs::read_link(path) {
        Ok(target) if target.is_relative() => {
            path.parent().map_or(target.clone(), |parent| parent.join(&target))
        }
        Ok(target) => target,
        Err(_) => return EntryKind::File,
    };
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => EntryKind::Dir,
        _ => EntryKind::File,
    }
}

fn indicator(file_type: FileType, mode: u32) -> Option<char> {
    if file_type.is_symlink() {
        Some('@')
    } else if file_type.is_dir() {
        Some('/')
    } else if file_type.is_fifo() {
        Some('|')
    } else if file_type.is_socket() {
        Some('=')
    } else if mode & 0o111 != 0 {
        Some('*')
    } else {
        None
    }
}
