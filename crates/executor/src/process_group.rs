//! Process-group handling so a timeout takes down every descendant of the
//! spawned command, not only the direct child.

use std::io;
use tokio::process::Command;

/// Starts the command in its own session; its pid becomes the group id.
#[cfg(unix)]
pub(crate) fn detach(cmd: &mut Command) {
    // SAFETY: setsid is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub(crate) fn detach(_cmd: &mut Command) {}

/// Sends SIGKILL to the group led by `pid`. A group that is already gone is not an error.
#[cfg(unix)]
pub(crate) fn kill_tree(pid: u32) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: plain syscall on a group id we created via setsid.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

// Without process groups only the direct child is killed, by the caller.
#[cfg(not(unix))]
pub(crate) fn kill_tree(_pid: u32) -> io::Result<()> {
    Ok(())
}
