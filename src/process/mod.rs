//! Process launcher for demo binaries

mod session;

pub use session::{LaunchSpec, ProcessSession, SessionState};

use std::process::ExitStatus;

/// Integer status for an exited child
///
/// A child killed by a signal reports `128 + signo`, the shell convention.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
