use std::{ffi::OsStr, io, path::Path, time::Duration};

use tokio::process::{Child, Command};

pub fn cmd_program<S: AsRef<OsStr>>(program: S, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    cmd
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        const SHELL: &str = "cmd";
        const SHELL_ARGS: &[&str] = &["/C"];
    } else {
        const SHELL: &str = "sh";
        const SHELL_ARGS: &[&str] = &[];
    }
}

/// Command that runs a script through the platform shell.
pub fn cmd_script(path: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(SHELL);
    cmd.args(SHELL_ARGS).arg(path);
    cmd.args(args.iter().map(|s| s.as_str()));
    cmd
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// SIGTERM, wait up to `grace`, then SIGKILL.
        pub async fn kill_graceful(child: &mut Child, grace: Duration) -> io::Result<()> {
            if let Some(id) = child.id() {
                // SAFETY: `id` is our own child and has not been reaped yet.
                unsafe {
                    libc::kill(id as libc::pid_t, libc::SIGTERM);
                }
                if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                    return Ok(());
                }
            }
            child.kill().await
        }
    } else {
        pub async fn kill_graceful(child: &mut Child, _grace: Duration) -> io::Result<()> {
            child.kill().await
        }
    }
}

/// Mark a staged file executable.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
