//! `zcp init` - scaffolds a project for agent-driven Zerops work.
//!
//! Writes the Claude Code integration files (CLAUDE.md, .mcp.json,
//! permission settings) into the project and the SSH/alias setup into
//! the user's home. Re-running is safe: files that already match are
//! left alone, files that differ are replaced with the previous
//! content kept next to them as `.bak`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::core::error::ZcpError;

const CLAUDE_MD: &str = include_str!("../templates/CLAUDE.md");
const MCP_CONFIG: &str = include_str!("../templates/mcp-config.json");
const SETTINGS_LOCAL: &str = include_str!("../templates/settings-local.json");
const SSH_CONFIG: &str = include_str!("../templates/ssh-config");
const ALIASES: &str = include_str!("../templates/aliases");

const BASHRC_SOURCE_LINE: &str =
    "# Zerops shell aliases\n[ -f \"$HOME/.config/zerops/aliases\" ] && . \"$HOME/.config/zerops/aliases\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Updated,
    Unchanged,
}

/// What happened to one scaffolded file.
pub struct StepReport {
    pub name: &'static str,
    pub path: PathBuf,
    pub action: FileAction,
    /// Set when the previous content was kept as `.bak`.
    pub backed_up: bool,
}

/// Runs the init subcommand against the current directory, printing a
/// per-file summary to stderr.
pub fn run(base_dir: &Path) -> Result<(), ZcpError> {
    let home = resolve_home();
    let reports = scaffold(base_dir, &home)?;

    for report in &reports {
        let status = match (report.action, report.backed_up) {
            (FileAction::Created, _) => "created".green().to_string(),
            (FileAction::Updated, true) => {
                format!("{} {}", "updated".yellow(), "(previous kept as .bak)".bright_black())
            }
            (FileAction::Updated, false) => "updated".yellow().to_string(),
            (FileAction::Unchanged, _) => "unchanged".bright_black().to_string(),
        };
        eprintln!("  {} {} {}", "→".cyan(), report.path.display(), status);
    }
    eprintln!("  {} Init complete", "✓".green());
    Ok(())
}

/// Writes every managed file. Separated from [`run`] so tests can
/// point both roots at temp directories.
pub fn scaffold(base_dir: &Path, home: &Path) -> Result<Vec<StepReport>, ZcpError> {
    let mut reports = Vec::new();

    reports.push(write_managed(
        "CLAUDE.md",
        base_dir.join("CLAUDE.md"),
        CLAUDE_MD,
    )?);
    reports.push(write_managed(
        "MCP config",
        base_dir.join(".mcp.json"),
        MCP_CONFIG,
    )?);

    let claude_dir = base_dir.join(".claude");
    fs::create_dir_all(&claude_dir)?;
    reports.push(write_managed(
        "permissions",
        claude_dir.join("settings.local.json"),
        SETTINGS_LOCAL,
    )?);

    let ssh_dir = home.join(".ssh");
    fs::create_dir_all(&ssh_dir)?;
    restrict_to_owner(&ssh_dir)?;
    reports.push(write_managed("SSH config", ssh_dir.join("config"), SSH_CONFIG)?);

    let alias_dir = home.join(".config").join("zerops");
    fs::create_dir_all(&alias_dir)?;
    reports.push(write_managed("aliases", alias_dir.join("aliases"), ALIASES)?);
    reports.push(source_aliases_from_bashrc(home)?);

    Ok(reports)
}

fn write_managed(name: &'static str, path: PathBuf, content: &str) -> Result<StepReport, ZcpError> {
    match fs::read_to_string(&path) {
        Ok(existing) if existing == content => {
            return Ok(StepReport {
                name,
                path,
                action: FileAction::Unchanged,
                backed_up: false,
            });
        }
        Ok(_) => {
            fs::rename(&path, backup_path(&path))?;
            fs::write(&path, content)?;
            return Ok(StepReport {
                name,
                path,
                action: FileAction::Updated,
                backed_up: true,
            });
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    fs::write(&path, content)?;
    Ok(StepReport {
        name,
        path,
        action: FileAction::Created,
        backed_up: false,
    })
}

/// Appends the alias source line to `.bashrc` unless one is already
/// there. Existing content is never rewritten, only appended to.
fn source_aliases_from_bashrc(home: &Path) -> Result<StepReport, ZcpError> {
    let path = home.join(".bashrc");
    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };

    if existing.contains(".config/zerops/aliases") {
        return Ok(StepReport {
            name: ".bashrc",
            path,
            action: FileAction::Unchanged,
            backed_up: false,
        });
    }

    let action = if existing.is_empty() {
        FileAction::Created
    } else {
        FileAction::Updated
    };
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push('\n');
    updated.push_str(BASHRC_SOURCE_LINE);
    updated.push('\n');
    fs::write(&path, updated)?;

    Ok(StepReport {
        name: ".bashrc",
        path,
        action,
        backed_up: false,
    })
}

fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".bak");
    PathBuf::from(os)
}

#[cfg(unix)]
fn restrict_to_owner(dir: &Path) -> Result<(), ZcpError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(dir)?.permissions();
    perms.set_mode(0o700);
    fs::set_permissions(dir, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_dir: &Path) -> Result<(), ZcpError> {
    Ok(())
}

/// HOME is unset or "/" inside Zerops initCommands; fall back to the
/// default container user's home.
fn resolve_home() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() && home != "/" => PathBuf::from(home),
        _ => PathBuf::from("/home/zerops"),
    }
}
