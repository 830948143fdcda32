//! scriptorium - script catalog and hook dispatch engine.
//!
//! Usage:
//!   scriptorium sync [--force]       Reconcile the catalog with disk
//!   scriptorium list                 Show the cataloged scripts
//!   scriptorium run <TITLE|PATH>     Run a standalone script
//!   scriptorium fire <HOOK>          Dispatch a hook event
//!   scriptorium backends             List scripting languages
//!   scriptorium enable <PATH>        Enable a script and persist
//!   scriptorium disable <PATH>       Disable a script and persist

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use scriptorium_catalog::ScriptManager;
use scriptorium_core::{
    CatalogEntry, ManagerConfig, ScriptContext, ScriptFolder, ScriptType, TomlSettings,
};

#[derive(Parser)]
#[command(
    name = "scriptorium",
    version,
    about = "Script catalog and hook dispatch engine",
    long_about = "scriptorium discovers script files under a scripting root, \
                  catalogs them by type and language, and dispatches hooks and \
                  user-invoked scripts to the matching language backend."
)]
struct Cli {
    /// Scripting root directory (defaults to the per-user scripts dir)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Backend plugin directory
    #[arg(long, global = true)]
    plugins: Option<PathBuf>,

    /// Settings file (defaults to the per-user settings.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile the catalog with the scripting directory
    Sync {
        /// Rebuild both trees from scratch
        #[arg(short, long)]
        force: bool,
    },

    /// Show the cataloged scripts
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a standalone script by title or path
    Run {
        /// Script title (case-insensitive) or file path
        script: String,

        /// Invoking surface identifier passed to the script
        #[arg(long, default_value = "")]
        target: String,
    },

    /// Dispatch a hook event to every matching enabled hook script
    Fire {
        /// Hook name (matched case-insensitively)
        hook: String,

        /// Invoking surface identifier passed to the scripts
        #[arg(long, default_value = "")]
        target: String,
    },

    /// List the available scripting languages
    Backends,

    /// Enable a script and persist the disabled list
    Enable {
        /// Script file path
        path: PathBuf,
    },

    /// Disable a script and persist the disabled list
    Disable {
        /// Script file path
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(TomlSettings::default_path);
    let mut settings = TomlSettings::load(&settings_path)?;

    let root = cli
        .root
        .clone()
        .unwrap_or_else(ManagerConfig::default_script_root);
    let config = ManagerConfig::builder()
        .script_root(root)
        .plugin_dir(cli.plugins.clone())
        .build()
        .map_err(|e| eyre!("{e}"))?;

    let mut manager = ScriptManager::new(config);
    // `sync` reports its own pass; reconciling here first would leave it
    // nothing but an idempotent second pass to describe.
    if !matches!(cli.command, Command::Sync { .. }) {
        let report = manager.reload_scripts(&settings, false);
        tracing::debug!(added = report.added, kept = report.kept, "startup reconciliation");
    }

    match cli.command {
        Command::Sync { force } => {
            let report = manager.reload_scripts(&settings, force);
            println!(
                "kept {}, added {}, removed {} in {:.1?}",
                report.kept, report.added, report.removed, report.duration
            );
            for event in &report.skipped {
                println!("skipped {} ({:?})", event.path.display(), event.reason);
            }
        }

        Command::List { format } => match format {
            OutputFormat::Text => {
                println!("Standalone scripts:");
                print_tree(manager.scripts(), 1);
                println!("Hook scripts:");
                print_tree(manager.hooks(), 1);
            }
            OutputFormat::Json => {
                let doc = serde_json::json!({
                    "scripts": tree_json(manager.scripts()),
                    "hooks": tree_json(manager.hooks()),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
        },

        Command::Run { script, target } => {
            let found = manager
                .find_standalone(&script)
                .ok_or_else(|| eyre!("no standalone script matches \"{script}\""))?;
            let ctx = ScriptContext::new(target);
            match manager.run_script(found, &ctx, ScriptType::Standalone) {
                Ok(value) => {
                    let text = value.to_display_string();
                    if !text.is_empty() {
                        println!("{text}");
                    }
                }
                Err(e) => return Err(eyre!("{e}")),
            }
        }

        Command::Fire { hook, target } => {
            let ctx = ScriptContext::new(target);
            let runs = manager.run_hooks(&hook, &ctx);
            if runs.is_empty() {
                println!("no enabled scripts for hook \"{hook}\"");
            }
            for run in runs {
                match run.outcome {
                    Ok(value) => {
                        let text = value.to_display_string();
                        if text.is_empty() {
                            println!("Script \"{}\": ok", run.title);
                        } else {
                            println!("Script \"{}\": {text}", run.title);
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
        }

        Command::Backends => {
            let policy = manager.policy();
            for backend in manager.backends() {
                let mut line = format!("{} <{}>", backend.name(), backend.url());
                if !policy.permits(backend.as_ref()) {
                    line.push_str(" (disabled in the preferences)");
                }
                println!("{line}");
            }
        }

        Command::Enable { path } => {
            set_enabled(&mut manager, &mut settings, &path, true)?;
        }

        Command::Disable { path } => {
            set_enabled(&mut manager, &mut settings, &path, false)?;
        }
    }

    Ok(())
}

fn set_enabled(
    manager: &mut ScriptManager,
    settings: &mut TomlSettings,
    path: &PathBuf,
    enabled: bool,
) -> Result<()> {
    if !manager.set_script_enabled(path, enabled) {
        return Err(eyre!("no cataloged script at {}", path.display()));
    }
    manager.save_disabled_list(settings);
    settings.save()?;
    println!(
        "{} {}",
        if enabled { "enabled" } else { "disabled" },
        path.display()
    );
    Ok(())
}

fn print_tree(folder: &ScriptFolder, depth: usize) {
    let indent = "  ".repeat(depth);
    for child in &folder.children {
        match child {
            CatalogEntry::Script(s) => {
                let mut line = format!("{indent}{}", s.title());
                if !s.is_enabled() {
                    line.push_str(" [disabled]");
                }
                if !s.hook_name().is_empty() {
                    line.push_str(&format!(" (hook: {})", s.hook_name()));
                }
                line.push_str(&format!(" - {}", s.backend().name()));
                println!("{line}");
            }
            CatalogEntry::Folder(f) => {
                println!("{indent}{}/", f.name);
                print_tree(f, depth + 1);
            }
        }
    }
}

fn tree_json(folder: &ScriptFolder) -> serde_json::Value {
    let mut scripts = Vec::new();
    let mut folders = Vec::new();
    for child in &folder.children {
        match child {
            CatalogEntry::Script(s) => scripts.push(serde_json::json!({
                "title": s.title(),
                "path": s.path(),
                "type": s.script_type().to_string(),
                "hook": s.hook_name(),
                "context": s.context(),
                "enabled": s.is_enabled(),
                "language": s.backend().name(),
            })),
            CatalogEntry::Folder(f) => folders.push(tree_json(f)),
        }
    }
    serde_json::json!({
        "name": folder.name.as_str(),
        "scripts": scripts,
        "folders": folders,
    })
}
