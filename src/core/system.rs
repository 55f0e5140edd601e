//! Production mounter and deployers shelling out to system commands.
//!
//! The mounter only works on Zerops containers where sshfs, zsc and
//! /proc/mounts exist. The deployers assume zcli (local) or key-based
//! SSH between sibling containers.

use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::core::client::{LocalDeployer, MountState, Mounter, PlatformResult, SshDeployer};
use crate::core::error::{PlatformError, codes};

const MOUNT_CHECK_TIMEOUT_SECS: u64 = 10;
const MOUNT_CREATE_TIMEOUT_SECS: u64 = 30;
const UNMOUNT_TIMEOUT_SECS: u64 = 10;
const DEPLOY_EXEC_TIMEOUT_SECS: u64 = 300;

fn safe_hostname() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]{0,62}$").expect("static regex"))
}

/// Runs a command with a kill-on-deadline poll loop; returns captured
/// stdout/stderr on completion.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    dir: Option<&Path>,
    timeout_secs: u64,
) -> PlatformResult<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(d) = dir {
        cmd.current_dir(d);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| {
        PlatformError::new(codes::API_ERROR, format!("spawn {}: {}", program, e), "")
    })?;

    let timeout = Duration::from_secs(timeout_secs);
    loop {
        let done = child.try_wait().map_err(|e| {
            PlatformError::new(codes::API_ERROR, format!("wait {}: {}", program, e), "")
        })?;
        if done.is_some() {
            return child.wait_with_output().map_err(|e| {
                PlatformError::new(codes::API_ERROR, format!("collect {}: {}", program, e), "")
            });
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            return Err(PlatformError::new(
                codes::API_TIMEOUT,
                format!("{} timed out after {}s", program, timeout_secs),
                "",
            ));
        }
        thread::sleep(Duration::from_millis(250));
    }
}

fn combined_output(out: &Output) -> String {
    let mut s = String::from_utf8_lossy(&out.stdout).into_owned();
    s.push_str(&String::from_utf8_lossy(&out.stderr));
    s
}

fn run_checked(
    program: &str,
    args: &[&str],
    timeout_secs: u64,
    code: &str,
) -> PlatformResult<Output> {
    let out = run_with_timeout(program, args, None, timeout_secs)?;
    if !out.status.success() {
        return Err(PlatformError::new(
            code,
            format!(
                "{} {} failed: {}",
                program,
                args.join(" "),
                combined_output(&out).trim()
            ),
            "",
        ));
    }
    Ok(out)
}

fn check_hostname(hostname: &str, code: &str) -> PlatformResult<()> {
    if !safe_hostname().is_match(hostname) {
        return Err(PlatformError::new(
            code,
            format!("unsafe hostname: {}", hostname),
            "",
        ));
    }
    Ok(())
}

/// SSHFS mount control via zsc systemd units.
pub struct SystemMounter;

impl SystemMounter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemMounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Mounter for SystemMounter {
    /// Uses /proc/mounts (kernel-authoritative) instead of mountpoint(1),
    /// which returns exit 32 for all directories in LXC containers. An
    /// sshfs entry whose path fails to stat is a stale transport.
    fn check_mount(&self, path: &str) -> PlatformResult<MountState> {
        let mounts = fs::read_to_string("/proc/mounts").map_err(|e| {
            PlatformError::new(codes::MOUNT_FAILED, format!("read /proc/mounts: {}", e), "")
        })?;
        let is_sshfs = mounts.lines().any(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            fields.len() >= 3 && fields[1] == path && fields[2] == "fuse.sshfs"
        });
        if !is_sshfs {
            return Ok(MountState::NotMounted);
        }
        match fs::metadata(path) {
            Ok(_) => Ok(MountState::Mounted),
            Err(_) => Ok(MountState::Stale),
        }
    }

    fn mount(&self, hostname: &str, local_path: &str) -> PlatformResult<()> {
        check_hostname(hostname, codes::MOUNT_FAILED)?;
        fs::create_dir_all(local_path).map_err(|e| {
            PlatformError::new(codes::MOUNT_FAILED, format!("mkdir {}: {}", local_path, e), "")
        })?;

        let unit = format!("sshfs-{}", hostname);
        let sshfs_cmd = format!(
            "sshfs -f -o reconnect,StrictHostKeyChecking=no,ServerAliveInterval=15,ServerAliveCountMax=3 {}:/var/www {}",
            hostname, local_path,
        );
        run_checked(
            "sudo",
            &["-E", "zsc", "unit", "create", &unit, &sshfs_cmd],
            MOUNT_CREATE_TIMEOUT_SECS,
            codes::MOUNT_FAILED,
        )?;
        Ok(())
    }

    /// Unmounts FUSE first (lazy fallback), then removes the zsc unit, so a
    /// partial failure never leaves the unit gone with FUSE still attached.
    fn unmount(&self, hostname: &str, path: &str) -> PlatformResult<()> {
        check_hostname(hostname, codes::UNMOUNT_FAILED)?;

        if run_checked(
            "fusermount",
            &["-u", path],
            UNMOUNT_TIMEOUT_SECS,
            codes::UNMOUNT_FAILED,
        )
        .is_err()
        {
            run_checked(
                "fusermount",
                &["-uz", path],
                UNMOUNT_TIMEOUT_SECS,
                codes::UNMOUNT_FAILED,
            )?;
        }

        let unit = format!("sshfs-{}", hostname);
        run_checked(
            "sudo",
            &["-E", "zsc", "unit", "remove", &unit],
            UNMOUNT_TIMEOUT_SECS,
            codes::UNMOUNT_FAILED,
        )?;
        Ok(())
    }

    /// Lazy unmount plus best-effort unit cleanup, for stale mounts where
    /// the transport endpoint is disconnected.
    fn force_unmount(&self, hostname: &str, path: &str) -> PlatformResult<()> {
        if safe_hostname().is_match(hostname) {
            let unit = format!("sshfs-{}", hostname);
            let _ = run_checked(
                "sudo",
                &["-E", "zsc", "unit", "remove", &unit],
                UNMOUNT_TIMEOUT_SECS,
                codes::UNMOUNT_FAILED,
            );
        }
        run_checked(
            "fusermount",
            &["-uz", path],
            UNMOUNT_TIMEOUT_SECS,
            codes::UNMOUNT_FAILED,
        )?;
        Ok(())
    }

    fn is_writable(&self, path: &str) -> PlatformResult<bool> {
        let test_file = format!("{}/.mount_test", path);
        run_checked(
            "touch",
            &[&test_file],
            MOUNT_CHECK_TIMEOUT_SECS,
            codes::MOUNT_FAILED,
        )?;
        let _ = run_with_timeout("rm", &["-f", &test_file], None, MOUNT_CHECK_TIMEOUT_SECS);
        Ok(true)
    }

    fn list_mount_dirs(&self, base_path: &str) -> PlatformResult<Vec<String>> {
        let entries = match fs::read_dir(base_path) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(PlatformError::new(
                    codes::API_ERROR,
                    format!("read dir {}: {}", base_path, e),
                    "",
                ));
            }
        };
        let mut dirs = Vec::new();
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(dirs)
    }
}

/// Deploys through the local zcli binary. No presence check at startup;
/// a missing binary surfaces at call time.
pub struct SystemLocalDeployer;

impl SystemLocalDeployer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemLocalDeployer {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalDeployer for SystemLocalDeployer {
    fn exec_zcli(&self, args: &[&str]) -> PlatformResult<String> {
        let out = run_with_timeout("zcli", args, None, DEPLOY_EXEC_TIMEOUT_SECS)?;
        let combined = combined_output(&out);
        if !out.status.success() {
            return Err(PlatformError::new(
                codes::API_ERROR,
                format!("zcli {} failed: {}", args.join(" "), combined.trim()),
                "Check zcli is installed and logged in",
            ));
        }
        Ok(combined)
    }
}

/// Runs commands on sibling Zerops containers; key-based SSH works
/// within a project without passwords.
pub struct SystemSshDeployer;

impl SystemSshDeployer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemSshDeployer {
    fn default() -> Self {
        Self::new()
    }
}

impl SshDeployer for SystemSshDeployer {
    fn exec_ssh(&self, hostname: &str, command: &str) -> PlatformResult<String> {
        let out = run_with_timeout("ssh", &[hostname, command], None, DEPLOY_EXEC_TIMEOUT_SECS)?;
        let combined = combined_output(&out);
        if !out.status.success() {
            return Err(PlatformError::new(
                codes::API_ERROR,
                format!("ssh {} failed: {}", hostname, combined.trim()),
                "Check the service is running and reachable",
            ));
        }
        Ok(combined)
    }
}
