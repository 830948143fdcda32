//! The catalog synchronizer.
//!
//! One reconciliation pass updates the two catalog trees to match the
//! scripting root directory: a revalidation sweep over the existing
//! trees, a recursive discovery walk for anything new, and a
//! deterministic sort at every level. No step is fatal; every anomaly
//! degrades to "omit this entry" and shows up in the returned report.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use scriptorium_core::{
    CatalogEntry, EnablementPolicy, LanguageBackend, Script, ScriptFolder, ScriptType, SkipEvent,
    SkipReason,
};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Scripts retained from the previous catalog state.
    pub kept: usize,
    /// Scripts newly discovered and inserted.
    pub added: usize,
    /// Scripts removed (missing, re-parse failure, type change,
    /// policy denial, or a forced rebuild).
    pub removed: usize,
    /// Everything discovery chose to omit, with reasons.
    pub skipped: Vec<SkipEvent>,
    /// Wall-clock duration of the pass.
    pub duration: Duration,
}

/// State of one reconciliation pass.
pub(crate) struct SyncPass<'a> {
    backends: &'a [Arc<dyn LanguageBackend>],
    policy: EnablementPolicy,
    disabled: &'a HashSet<PathBuf>,
    processed: HashSet<PathBuf>,
    visited: HashSet<PathBuf>,
    report: SyncReport,
}

impl<'a> SyncPass<'a> {
    /// Reconcile `standalone` and `hooks` against `root`.
    pub(crate) fn run(
        backends: &'a [Arc<dyn LanguageBackend>],
        policy: EnablementPolicy,
        disabled: &'a HashSet<PathBuf>,
        root: &Path,
        standalone: &mut ScriptFolder,
        hooks: &mut ScriptFolder,
        force_all: bool,
    ) -> SyncReport {
        let start = Instant::now();
        let mut pass = Self {
            backends,
            policy,
            disabled,
            processed: HashSet::new(),
            visited: HashSet::new(),
            report: SyncReport::default(),
        };

        if force_all {
            pass.report.removed += standalone.script_count() + hooks.script_count();
            standalone.clear();
            hooks.clear();
        }

        pass.revalidate(standalone);
        pass.revalidate(hooks);
        pass.discover(root, standalone, hooks);

        pass.report.duration = start.elapsed();
        pass.report
    }

    /// Revalidation sweep: keep unchanged scripts, drop anything the
    /// on-disk state or the policy no longer supports, prune folders
    /// that end up empty. Dropped scripts are not recorded as
    /// processed, so the discovery pass can pick them up fresh.
    fn revalidate(&mut self, folder: &mut ScriptFolder) {
        folder.children.retain_mut(|child| match child {
            CatalogEntry::Folder(sub) => {
                self.revalidate(sub);
                !sub.is_empty()
            }
            CatalogEntry::Script(script) => {
                if self.revalidate_script(script) {
                    self.processed.insert(script.path().to_path_buf());
                    self.report.kept += 1;
                    true
                } else {
                    tracing::debug!(path = %script.path().display(), "dropped stale script");
                    self.report.removed += 1;
                    false
                }
            }
        });
    }

    fn revalidate_script(&mut self, script: &mut Script) -> bool {
        if script.has_changed() {
            // File removed entirely.
            if !script.path().exists() {
                return false;
            }
            // Changed on disk: re-parse in place. A parse failure or a
            // type change counts as removal; discovery re-derives it.
            let old_type = script.script_type();
            if script.parse_header().is_err() || script.script_type() != old_type {
                return false;
            }
        }
        // The policy gate applies to every retained script, changed or
        // not; the built-in backend is exempt.
        self.policy.permits(script.backend().as_ref())
    }

    /// Discovery walk, mirrored in parallel over both trees. Files
    /// first, then directories, each group name-ordered.
    fn discover(&mut self, dir: &Path, standalone: &mut ScriptFolder, hooks: &mut ScriptFolder) {
        // A symlinked directory cycle would otherwise recurse until the
        // path length blows up; each resolved directory is walked once.
        if let Ok(canonical) = dir.canonicalize() {
            if !self.visited.insert(canonical) {
                return;
            }
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => {
                self.skip(dir, SkipReason::Unreadable);
                return;
            }
        };

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else {
                self.skip(dir, SkipReason::Unreadable);
                continue;
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let Ok(metadata) = fs::metadata(&path) else {
                // stat through symlinks failed: dangling link or an
                // entry we cannot read.
                if path.symlink_metadata().is_ok() {
                    self.skip(&path, SkipReason::BrokenLink);
                } else {
                    self.skip(&path, SkipReason::Unreadable);
                }
                continue;
            };
            if metadata.is_dir() {
                dirs.push((name, path));
            } else {
                files.push(path);
            }
        }
        files.sort();
        dirs.sort_by(|a, b| a.0.cmp(&b.0));

        for path in files {
            self.discover_file(&path, standalone, hooks);
        }

        for (name, path) in dirs {
            // Reuse a matching sub-folder per tree where one exists.
            let mut sub_standalone = standalone
                .take_folder(&name)
                .unwrap_or_else(|| ScriptFolder::new(name.as_str()));
            let mut sub_hooks = hooks
                .take_folder(&name)
                .unwrap_or_else(|| ScriptFolder::new(name.as_str()));

            self.discover(&path, &mut sub_standalone, &mut sub_hooks);

            // A sub-folder that ended up empty is dropped from
            // whichever tree it is empty in.
            if !sub_standalone.is_empty() {
                standalone.push_folder(sub_standalone);
            }
            if !sub_hooks.is_empty() {
                hooks.push_folder(sub_hooks);
            }
        }

        standalone.sort_children();
        hooks.sort_children();
    }

    fn discover_file(&mut self, path: &Path, standalone: &mut ScriptFolder, hooks: &mut ScriptFolder) {
        // Resolve symlink chains to the ultimate target.
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => {
                self.skip(path, SkipReason::BrokenLink);
                return;
            }
        };

        // Already retained from the revalidation sweep.
        if self.processed.contains(&canonical) {
            return;
        }

        let Some(mut script) = self.classify(&canonical, path) else {
            return;
        };

        if script.parse_header().is_err() {
            self.skip(path, SkipReason::ParseFailed);
            return;
        }

        // The header default, gated by the persisted disabled list.
        let enabled = script.is_enabled() && !self.disabled.contains(&canonical);
        script.set_enabled(enabled);

        match script.script_type() {
            ScriptType::Hook => {
                hooks.push_script(script);
                self.processed.insert(canonical);
                self.report.added += 1;
            }
            ScriptType::Standalone => {
                standalone.push_script(script);
                self.processed.insert(canonical);
                self.report.added += 1;
            }
            ScriptType::Invalid => self.skip(path, SkipReason::ParseFailed),
        }
    }

    /// First-match-wins classification over the registration order.
    /// Policy-denied backends never match; a construction failure
    /// falls through to later backends.
    fn classify(&mut self, canonical: &Path, entry_path: &Path) -> Option<Script> {
        let mut denied_match = false;
        for backend in self.backends {
            if !self.policy.permits(backend.as_ref()) {
                if backend.handles_file(canonical) {
                    denied_match = true;
                }
                continue;
            }
            if !backend.handles_file(canonical) {
                continue;
            }
            match Script::discover(canonical.to_path_buf(), backend.clone()) {
                Ok(script) => return Some(script),
                Err(_) => continue,
            }
        }
        self.skip(
            entry_path,
            if denied_match {
                SkipReason::PolicyDenied
            } else {
                SkipReason::Unmatched
            },
        );
        None
    }

    fn skip(&mut self, path: &Path, reason: SkipReason) {
        tracing::debug!(path = %path.display(), ?reason, "skipped catalog entry");
        self.report.skipped.push(SkipEvent::new(path, reason));
    }
}
