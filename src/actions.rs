//! Process control: terminate and renice.
//!
//! Thin wrappers over the OS calls. Failures go back to the caller as
//! `ActionError` and are never retried.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::info;

pub const NICE_MIN: i32 = -20;
pub const NICE_MAX: i32 = 19;

#[derive(Debug)]
pub enum ActionError {
    /// pid 0 and negative pids address process groups; refused.
    InvalidPid(i32),
    /// The OS rejected the call (ESRCH, EPERM, EACCES, ...).
    Os { pid: i32, errno: Errno },
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::InvalidPid(pid) => write!(f, "invalid pid {}", pid),
            ActionError::Os { pid, errno } => write!(f, "pid {}: {}", pid, errno.desc()),
        }
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActionError::Os { errno, .. } => Some(errno),
            ActionError::InvalidPid(_) => None,
        }
    }
}

fn check_pid(pid: i32) -> Result<(), ActionError> {
    if pid <= 0 {
        return Err(ActionError::InvalidPid(pid));
    }
    Ok(())
}

/// Sends SIGTERM to `pid`.
pub fn kill_process(pid: i32) -> Result<(), ActionError> {
    check_pid(pid)?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(|errno| ActionError::Os { pid, errno })?;
    info!(pid, "sent SIGTERM");
    Ok(())
}

pub fn clamp_nice(nice: i32) -> i32 {
    nice.clamp(NICE_MIN, NICE_MAX)
}

/// Sets the nice value of `pid`, clamped to -20..=19. Returns the value
/// actually requested.
pub fn set_priority(pid: i32, nice: i32) -> Result<i32, ActionError> {
    check_pid(pid)?;
    let nice = clamp_nice(nice);
    // SAFETY: setpriority takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice) };
    if rc == -1 {
        return Err(ActionError::Os {
            pid,
            errno: Errno::last(),
        });
    }
    info!(pid, nice, "priority changed");
    Ok(nice)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Above the kernel's pid_max ceiling, so never a live process.
    const NO_SUCH_PID: i32 = 0x3FFF_FFFF;

    #[test]
    fn test_clamp_nice() {
        assert_eq!(clamp_nice(-40), -20);
        assert_eq!(clamp_nice(-20), -20);
        assert_eq!(clamp_nice(5), 5);
        assert_eq!(clamp_nice(19), 19);
        assert_eq!(clamp_nice(25), 19);
    }

    #[test]
    fn test_rejects_group_pids() {
        assert!(matches!(kill_process(0), Err(ActionError::InvalidPid(0))));
        assert!(matches!(kill_process(-1), Err(ActionError::InvalidPid(-1))));
        assert!(matches!(set_priority(0, 5), Err(ActionError::InvalidPid(0))));
    }

    #[test]
    fn test_missing_process_is_os_error() {
        let err = kill_process(NO_SUCH_PID).unwrap_err();
        assert!(matches!(err, ActionError::Os { errno: Errno::ESRCH, .. }));
        assert!(err.to_string().contains(&NO_SUCH_PID.to_string()));

        assert!(matches!(
            set_priority(NO_SUCH_PID, 10),
            Err(ActionError::Os { errno: Errno::ESRCH, .. })
        ));
    }
}
