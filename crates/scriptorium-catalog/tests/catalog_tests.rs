use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scriptorium_catalog::ScriptManager;
use scriptorium_core::{
    CatalogEntry, LanguageBackend, ManagerConfig, MemorySettings, Script, ScriptApi,
    ScriptContext, ScriptError, ScriptFolder, ScriptType, SkipReason, Value,
};

/// A non-built-in backend for policy tests; claims `.stub` files.
struct StubBackend;

impl LanguageBackend for StubBackend {
    fn name(&self) -> &str {
        "Stub"
    }
    fn url(&self) -> &str {
        "https://example.invalid/stub"
    }
    fn line_comment(&self) -> &str {
        "#"
    }
    fn handles_file(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "stub")
    }
    fn execute(&self, _script: &Script, _api: &mut ScriptApi) -> Result<Value, ScriptError> {
        Ok(Value::from("stub ran"))
    }
}

fn write_script(root: &Path, rel: &str, title: &str, ty: &str, extra: &[&str]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let comment = if rel.ends_with(".stub") { "#" } else { "//" };
    let mut contents = format!(
        "{comment} ScriptoriumScript\n{comment} Title: {title}\n{comment} Script-Type: {ty}\n"
    );
    for line in extra {
        contents.push_str(&format!("{comment} {line}\n"));
    }
    contents.push_str("\n40 + 2\n");
    fs::write(&path, contents).unwrap();
    path
}

fn manager_for(root: &Path) -> ScriptManager {
    let mut manager = ScriptManager::new(ManagerConfig::new(root));
    manager.register_backend(Arc::new(StubBackend));
    manager
}

/// Flatten a tree into "folder/Title" strings, in catalog order.
fn snapshot(folder: &ScriptFolder) -> Vec<String> {
    fn visit(folder: &ScriptFolder, prefix: &str, out: &mut Vec<String>) {
        for child in &folder.children {
            match child {
                CatalogEntry::Script(s) => out.push(format!("{prefix}{}", s.title())),
                CatalogEntry::Folder(f) => {
                    out.push(format!("{prefix}{}/", f.name));
                    visit(f, &format!("{prefix}{}/", f.name), out);
                }
            }
        }
    }
    let mut out = Vec::new();
    visit(folder, "", &mut out);
    out
}

#[test]
fn discovery_builds_parallel_trees() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "a", "hook", &["Hook: TeXify"]);
    write_script(dir.path(), "tools/b.rhai", "b", "standalone", &[]);

    let mut manager = manager_for(dir.path());
    let report = manager.reload_scripts(&MemorySettings::new(false), false);

    // The very first pass reports everything as added; nothing can have
    // been kept or removed yet.
    assert_eq!(report.added, 2);
    assert_eq!(report.kept, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(snapshot(manager.hooks()), vec!["a"]);
    assert_eq!(snapshot(manager.scripts()), vec!["tools/", "tools/b"]);
}

#[test]
fn reconciliation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "zeta.rhai", "Zeta", "standalone", &[]);
    write_script(dir.path(), "alpha.rhai", "alpha", "standalone", &[]);
    write_script(dir.path(), "tools/fix.rhai", "Fix", "standalone", &[]);
    write_script(dir.path(), "on_open.rhai", "Open", "hook", &["Hook: Open"]);

    let settings = MemorySettings::new(false);
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);
    let first_scripts = snapshot(manager.scripts());
    let first_hooks = snapshot(manager.hooks());

    let report = manager.reload_scripts(&settings, false);
    assert_eq!(snapshot(manager.scripts()), first_scripts);
    assert_eq!(snapshot(manager.hooks()), first_hooks);
    assert_eq!(report.added, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(report.kept, 4);

    // Sorted case-insensitively, scripts before folders.
    assert_eq!(first_scripts, vec!["alpha", "Zeta", "tools/", "tools/Fix"]);
}

#[test]
fn disabled_list_initializes_enable_flag() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "A", "standalone", &[]);
    write_script(dir.path(), "b.rhai", "B", "standalone", &[]);

    let mut settings = MemorySettings::new(false);
    settings.disabled = vec![PathBuf::from("a.rhai")];

    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);

    let enabled: Vec<(String, bool)> = manager
        .scripts()
        .scripts()
        .map(|s| (s.title().to_string(), s.is_enabled()))
        .collect();
    assert_eq!(enabled, vec![("A".to_string(), false), ("B".to_string(), true)]);
}

#[test]
fn hook_lookup_is_case_insensitive_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "A", "hook", &["Hook: Hook"]);
    write_script(dir.path(), "b.rhai", "B", "hook", &["Hook: hook"]);
    write_script(dir.path(), "c.rhai", "C", "hook", &["Hook: Other"]);
    write_script(dir.path(), "d.rhai", "D", "hook", &["Hook: Hook", "Enabled: no"]);

    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&MemorySettings::new(false), false);

    let matched: Vec<&str> = manager.hook_scripts("HOOK").iter().map(|s| s.title()).collect();
    assert_eq!(matched, vec!["A", "B"]);
}

#[test]
fn global_flag_gates_non_builtin_backends() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "native.rhai", "Native", "standalone", &[]);
    write_script(dir.path(), "plug.stub", "Plug", "standalone", &[]);

    let mut manager = manager_for(dir.path());

    // Flag off: only the built-in backend's script is cataloged, the
    // stub file is reported as policy-denied.
    let report = manager.reload_scripts(&MemorySettings::new(false), false);
    assert_eq!(snapshot(manager.scripts()), vec!["Native"]);
    assert!(report
        .skipped
        .iter()
        .any(|e| e.reason == SkipReason::PolicyDenied && e.path.ends_with("plug.stub")));

    // Flag on: the stub script appears.
    manager.reload_scripts(&MemorySettings::new(true), false);
    assert_eq!(snapshot(manager.scripts()), vec!["Native", "Plug"]);

    // Flag off again: the next pass removes it, even though the file
    // itself is unchanged.
    let report = manager.reload_scripts(&MemorySettings::new(false), false);
    assert_eq!(report.removed, 1);
    assert_eq!(snapshot(manager.scripts()), vec!["Native"]);

    // And back on: rediscovered from disk with its file default.
    manager.reload_scripts(&MemorySettings::new(true), false);
    let plug = manager.find_standalone("Plug").unwrap();
    assert!(plug.is_enabled());
}

#[test]
fn disabled_hook_scripts_are_not_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "h.stub", "H", "hook", &["Hook: Save"]);

    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&MemorySettings::new(true), false);
    assert_eq!(manager.hook_scripts("Save").len(), 1);

    // Flip only the in-memory policy via a reload with the flag off:
    // the catalog drops the script and dispatch returns nothing.
    manager.reload_scripts(&MemorySettings::new(false), false);
    assert!(manager.hook_scripts("Save").is_empty());
}

#[test]
fn deleted_file_disappears_from_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path(), "gone.rhai", "Gone", "standalone", &[]);
    write_script(dir.path(), "stay.rhai", "Stay", "standalone", &[]);

    let settings = MemorySettings::new(false);
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);
    assert_eq!(manager.scripts().script_count(), 2);

    fs::remove_file(&path).unwrap();
    let report = manager.reload_scripts(&settings, false);
    assert_eq!(report.removed, 1);
    assert_eq!(snapshot(manager.scripts()), vec!["Stay"]);
}

#[test]
fn empty_folders_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/readme.txt"), "not a script").unwrap();
    write_script(dir.path(), "a.rhai", "A", "standalone", &[]);

    let mut manager = manager_for(dir.path());
    let report = manager.reload_scripts(&MemorySettings::new(false), false);

    assert_eq!(snapshot(manager.scripts()), vec!["A"]);
    assert!(manager.scripts().folder("docs").is_none());
    assert!(report
        .skipped
        .iter()
        .any(|e| e.reason == SkipReason::Unmatched && e.path.ends_with("readme.txt")));
}

#[test]
fn changed_file_is_reparsed() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "Old Title", "standalone", &[]);

    let settings = MemorySettings::new(false);
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);
    assert_eq!(snapshot(manager.scripts()), vec!["Old Title"]);

    write_script(dir.path(), "a.rhai", "New Title Entirely", "standalone", &[]);
    manager.reload_scripts(&settings, false);
    assert_eq!(snapshot(manager.scripts()), vec!["New Title Entirely"]);
}

#[test]
fn type_change_moves_script_between_trees() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "Mover", "standalone", &[]);

    let settings = MemorySettings::new(false);
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);
    assert_eq!(manager.scripts().script_count(), 1);
    assert_eq!(manager.hooks().script_count(), 0);

    write_script(dir.path(), "a.rhai", "Mover Now A Hook", "hook", &["Hook: Save"]);
    let report = manager.reload_scripts(&settings, false);
    assert_eq!(report.removed, 1);
    assert_eq!(report.added, 1);
    assert_eq!(manager.scripts().script_count(), 0);
    assert_eq!(manager.hooks().script_count(), 1);
}

#[test]
fn force_all_rebuilds_from_scratch() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "A", "standalone", &[]);

    let settings = MemorySettings::new(false);
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);

    let report = manager.reload_scripts(&settings, true);
    assert_eq!(report.removed, 1);
    assert_eq!(report.added, 1);
    assert_eq!(report.kept, 0);
    assert_eq!(snapshot(manager.scripts()), vec!["A"]);
}

#[test]
fn disabled_list_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path(), "tools/a.rhai", "A", "standalone", &[]);

    let mut settings = MemorySettings::new(false);
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);

    assert!(manager.set_script_enabled(&path, false));
    manager.save_disabled_list(&mut settings);
    assert_eq!(settings.disabled, vec![PathBuf::from("tools/a.rhai")]);

    // A fresh manager fed the same settings re-disables the script.
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);
    let script = manager.find_standalone("A").unwrap();
    assert!(!script.is_enabled());
}

#[test]
fn run_script_outcomes_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path(), "sum.rhai", "Sum", "standalone", &[]);
    write_script(dir.path(), "h.rhai", "H", "hook", &["Hook: Save"]);

    let settings = MemorySettings::new(false);
    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&settings, false);
    let ctx = ScriptContext::default();

    // The script body is `40 + 2`.
    let script = manager.find_standalone("Sum").unwrap();
    let value = manager.run_script(script, &ctx, ScriptType::Standalone).unwrap();
    assert_eq!(value, Value::Integer(42));

    // Asking for the wrong type is a distinct refusal.
    let err = manager.run_script(script, &ctx, ScriptType::Hook).unwrap_err();
    assert!(matches!(err, ScriptError::TypeMismatch { .. }));

    // A disabled script is refused, not failed.
    manager.set_script_enabled(&path, false);
    let script = manager.find_standalone("Sum").unwrap();
    let err = manager.run_script(script, &ctx, ScriptType::Standalone).unwrap_err();
    assert!(matches!(err, ScriptError::ScriptDisabled { .. }));
}

#[test]
fn run_hooks_collects_independent_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.rhai");
    fs::write(
        &bad,
        "// ScriptoriumScript\n// Title: Bad\n// Script-Type: hook\n// Hook: Save\n\nundefined_fn()\n",
    )
    .unwrap();
    write_script(dir.path(), "good.rhai", "Good", "hook", &["Hook: Save"]);

    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&MemorySettings::new(false), false);

    let runs = manager.run_hooks("save", &ScriptContext::default());
    assert_eq!(runs.len(), 2);
    let bad_run = runs.iter().find(|r| r.title == "Bad").unwrap();
    assert!(matches!(bad_run.outcome, Err(ScriptError::Execution { .. })));
    let good_run = runs.iter().find(|r| r.title == "Good").unwrap();
    assert_eq!(*good_run.outcome.as_ref().unwrap(), Value::Integer(42));
}

#[test]
fn catalog_changed_notification_fires() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "A", "standalone", &[]);

    let mut manager = manager_for(dir.path());
    let mut rx = manager.subscribe();
    manager.reload_scripts(&MemorySettings::new(false), false);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.added, 1);
    assert_eq!(event.removed, 0);
}

#[cfg(unix)]
#[test]
fn dangling_symlinks_are_skipped() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "A", "standalone", &[]);
    symlink(dir.path().join("missing.rhai"), dir.path().join("link.rhai")).unwrap();

    let mut manager = manager_for(dir.path());
    let report = manager.reload_scripts(&MemorySettings::new(false), false);

    assert_eq!(snapshot(manager.scripts()), vec!["A"]);
    assert!(report
        .skipped
        .iter()
        .any(|e| e.reason == SkipReason::BrokenLink && e.path.ends_with("link.rhai")));
}

#[cfg(unix)]
#[test]
fn symlink_aliases_resolve_to_one_entry() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "A", "standalone", &[]);
    symlink(dir.path().join("a.rhai"), dir.path().join("z_alias.rhai")).unwrap();

    let mut manager = manager_for(dir.path());
    manager.reload_scripts(&MemorySettings::new(false), false);
    assert_eq!(manager.scripts().script_count(), 1);
}

#[cfg(unix)]
#[test]
fn symlinked_directory_cycles_terminate() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "tools/a.rhai", "A", "standalone", &[]);
    // A directory symlink back to the root would recurse forever if the
    // walk did not track resolved directories.
    symlink(dir.path(), dir.path().join("tools/loop")).unwrap();

    let mut manager = manager_for(dir.path());
    let report = manager.reload_scripts(&MemorySettings::new(false), false);

    assert_eq!(report.added, 1);
    assert_eq!(snapshot(manager.scripts()), vec!["tools/", "tools/A"]);
}

#[cfg(unix)]
#[test]
fn unreadable_directories_are_reported() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.rhai", "A", "standalone", &[]);
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged processes ignore permission bits; nothing to observe.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let mut manager = manager_for(dir.path());
    let report = manager.reload_scripts(&MemorySettings::new(false), false);

    assert_eq!(snapshot(manager.scripts()), vec!["A"]);
    assert!(report
        .skipped
        .iter()
        .any(|e| e.reason == SkipReason::Unreadable && e.path.ends_with("locked")));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}
