//! The hierarchical script catalog.
//!
//! A catalog node is either a named folder or a script leaf. Folders
//! exclusively own their children; external views hold no references
//! into the tree and are expected to re-read it after a catalog-changed
//! notification.

use std::cmp::Ordering;
use std::path::Path;

use compact_str::CompactString;

use crate::script::Script;

/// One child of a [`ScriptFolder`].
#[derive(Debug)]
pub enum CatalogEntry {
    /// A named sub-folder.
    Folder(ScriptFolder),
    /// A script leaf.
    Script(Script),
}

/// A named, order-sensitive container of scripts and sub-folders,
/// mirroring one directory of the scripting root.
#[derive(Debug, Default)]
pub struct ScriptFolder {
    /// Folder name (directory name, not full path).
    pub name: CompactString,
    /// Owned children, in catalog order.
    pub children: Vec<CatalogEntry>,
}

impl ScriptFolder {
    /// Create an empty folder.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Whether this folder has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Remove all children.
    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Append a script leaf.
    pub fn push_script(&mut self, script: Script) {
        self.children.push(CatalogEntry::Script(script));
    }

    /// Append a sub-folder.
    pub fn push_folder(&mut self, folder: ScriptFolder) {
        self.children.push(CatalogEntry::Folder(folder));
    }

    /// Detach and return the direct sub-folder with the given name, if
    /// one exists. Used by the synchronizer to reuse an existing
    /// sub-folder while it rebuilds a level.
    pub fn take_folder(&mut self, name: &str) -> Option<ScriptFolder> {
        let index = self.children.iter().position(
            |child| matches!(child, CatalogEntry::Folder(f) if f.name == name),
        )?;
        match self.children.remove(index) {
            CatalogEntry::Folder(folder) => Some(folder),
            CatalogEntry::Script(_) => unreachable!(),
        }
    }

    /// Find a direct sub-folder by name.
    pub fn folder(&self, name: &str) -> Option<&ScriptFolder> {
        self.children.iter().find_map(|child| match child {
            CatalogEntry::Folder(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    /// Depth-first iterator over every script in this subtree, in
    /// catalog order.
    pub fn scripts(&self) -> ScriptIter<'_> {
        ScriptIter {
            stack: vec![self.children.iter()],
        }
    }

    /// Number of scripts in this subtree.
    pub fn script_count(&self) -> usize {
        self.scripts().count()
    }

    /// Visit every script in this subtree mutably, depth-first.
    pub fn for_each_script_mut(&mut self, f: &mut impl FnMut(&mut Script)) {
        for child in &mut self.children {
            match child {
                CatalogEntry::Script(script) => f(script),
                CatalogEntry::Folder(folder) => folder.for_each_script_mut(f),
            }
        }
    }

    /// Find the script with the given path anywhere in this subtree.
    pub fn find_script_mut(&mut self, path: &Path) -> Option<&mut Script> {
        for child in &mut self.children {
            match child {
                CatalogEntry::Script(script) if script.path() == path => return Some(script),
                CatalogEntry::Script(_) => {}
                CatalogEntry::Folder(folder) => {
                    if let Some(found) = folder.find_script_mut(path) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// Sort the direct children of this folder: scripts
    /// case-insensitively by title, folders case-insensitively by
    /// name, scripts listed before folders.
    pub fn sort_children(&mut self) {
        self.children.sort_by(|a, b| match (a, b) {
            (CatalogEntry::Script(a), CatalogEntry::Script(b)) => {
                a.title().to_lowercase().cmp(&b.title().to_lowercase())
            }
            (CatalogEntry::Folder(a), CatalogEntry::Folder(b)) => {
                a.name.to_lowercase().cmp(&b.name.to_lowercase())
            }
            (CatalogEntry::Script(_), CatalogEntry::Folder(_)) => Ordering::Less,
            (CatalogEntry::Folder(_), CatalogEntry::Script(_)) => Ordering::Greater,
        });
    }

    /// Enabled scripts in this subtree whose required context is empty
    /// or matches `context`. This is the menu-population filter.
    pub fn scripts_for_context<'a>(&'a self, context: &str) -> Vec<&'a Script> {
        self.scripts()
            .filter(|s| s.is_enabled() && (s.context().is_empty() || s.context() == context))
            .collect()
    }
}

/// Depth-first script iterator, produced by [`ScriptFolder::scripts`].
pub struct ScriptIter<'a> {
    stack: Vec<std::slice::Iter<'a, CatalogEntry>>,
}

impl<'a> Iterator for ScriptIter<'a> {
    type Item = &'a Script;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let iter = self.stack.last_mut()?;
            match iter.next() {
                None => {
                    self.stack.pop();
                }
                Some(CatalogEntry::Folder(folder)) => {
                    self.stack.push(folder.children.iter());
                }
                Some(CatalogEntry::Script(script)) => return Some(script),
            }
        }
    }
}
