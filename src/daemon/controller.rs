//! OS process control for the daemon
//!
//! Liveness is "the kernel knows this pid" (signal 0). Nothing checks that
//! the pid still belongs to gorund; a recycled pid is indistinguishable
//! from the original process.

use crate::config::schema::DaemonConfig;
use crate::error::{GorunError, GorunResult};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Start, stop and probe a background process
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Spawn the process with stdout and stderr going to `log`, returning its pid
    fn start(&self, log: File) -> GorunResult<i32>;

    /// Terminate `pid`, waiting for it to exit
    async fn stop(&self, pid: i32) -> GorunResult<()>;

    /// Whether `pid` currently exists
    fn is_alive(&self, pid: i32) -> bool;
}

/// How long to wait between SIGTERM and SIGKILL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
    /// Delay between liveness polls
    pub poll_interval: Duration,

    /// Polls before escalating to SIGKILL
    pub attempts: u32,
}

impl StopPolicy {
    /// Build from the `[daemon]` config section
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.stop_poll_interval_ms),
            attempts: config.stop_attempts,
        }
    }
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self::from_config(&DaemonConfig::default())
    }
}

/// Controls a real OS process spawned from a fixed command line
#[derive(Debug, Clone)]
pub struct OsProcessController {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    policy: StopPolicy,
}

impl OsProcessController {
    /// Create a controller for `program args...`
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            envs: vec![],
            policy: StopPolicy::default(),
        }
    }

    /// Set an environment variable for the spawned process
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Override the SIGTERM → SIGKILL escalation timing
    pub fn with_policy(mut self, policy: StopPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl ProcessController for OsProcessController {
    fn start(&self, log: File) -> GorunResult<i32> {
        let command = self.program.display().to_string();
        let stdout = log
            .try_clone()
            .map_err(|e| GorunError::io("duplicating log file handle", e))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(log);

        // Detach from the terminal's process group so ^C in the launching
        // shell does not reach the daemon
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .map_err(|source| GorunError::SpawnFailed { command, source })?;

        let pid = i32::try_from(child.id())
            .map_err(|_| GorunError::Internal(format!("pid {} out of range", child.id())))?;
        debug!("Spawned {} as pid {}", self.program.display(), pid);
        Ok(pid)
    }

    async fn stop(&self, pid: i32) -> GorunResult<()> {
        if pid <= 0 {
            return Err(GorunError::Internal(format!("refusing to signal pid {}", pid)));
        }

        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => {}
            Err(Errno::ESRCH) => {
                warn!("Process {} already exited", pid);
                return Ok(());
            }
            Err(e) => {
                return Err(GorunError::process(
                    format!("sending SIGTERM to {}", pid),
                    e.into(),
                ))
            }
        }

        for _ in 0..self.policy.attempts {
            if !self.is_alive(pid) {
                return Ok(());
            }
            tokio::time::sleep(self.policy.poll_interval).await;
        }

        warn!("Could not stop {} with SIGTERM, sending SIGKILL", pid);
        match kill(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(GorunError::process(
                format!("sending SIGKILL to {}", pid),
                e.into(),
            )),
        }
    }

    fn is_alive(&self, pid: i32) -> bool {
        if pid <= 0 {
            return false;
        }
        match kill(Pid::from_raw(pid), None) {
            Ok(()) => true,
            // Exists, but owned by someone else
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::wait::waitpid;
    use std::time::Instant;
    use tempfile::TempDir;

    /// Reap `pid` so it does not linger as a zombie after it is signalled
    fn reap(pid: i32) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            while let Err(Errno::EINTR) = waitpid(Pid::from_raw(pid), None) {}
        })
    }

    fn fast_policy() -> StopPolicy {
        StopPolicy {
            poll_interval: Duration::from_millis(20),
            attempts: 10,
        }
    }

    #[test]
    fn default_policy_waits_five_seconds() {
        let policy = StopPolicy::default();
        assert_eq!(policy.poll_interval * policy.attempts, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn start_writes_to_log_and_stops() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("out.log");
        let log = File::create(&log_path).unwrap();

        let controller = OsProcessController::new("sh", ["-c", "echo hello && sleep 10"]);
        let pid = controller.start(log).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while std::fs::read_to_string(&log_path).unwrap() != "hello\n" {
            assert!(Instant::now() < deadline, "log never written");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(controller.is_alive(pid));

        let reaper = reap(pid);
        controller.stop(pid).await.unwrap();
        reaper.join().unwrap();

        assert!(!controller.is_alive(pid));
    }

    #[tokio::test]
    async fn stop_escalates_to_sigkill() {
        let dir = TempDir::new().unwrap();
        let log = File::create(dir.path().join("out.log")).unwrap();

        let controller =
            OsProcessController::new("sh", ["-c", "trap '' TERM; echo ready; sleep 30"])
                .with_policy(fast_policy());
        let pid = controller.start(log).unwrap();
        // Give the shell time to install its trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let reaper = reap(pid);
        controller.stop(pid).await.unwrap();
        reaper.join().unwrap();

        assert!(!controller.is_alive(pid));
    }

    #[tokio::test]
    async fn env_is_passed_to_child() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("out.log");
        let log = File::create(&log_path).unwrap();

        let controller = OsProcessController::new("sh", ["-c", "echo $GORUN_TEST_VALUE"])
            .env("GORUN_TEST_VALUE", "from-parent");
        let pid = controller.start(log).unwrap();
        reap(pid).join().unwrap();

        assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "from-parent\n");
    }

    #[test]
    fn spawn_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let log = File::create(dir.path().join("out.log")).unwrap();

        let controller = OsProcessController::new("/nonexistent/gorund", ["run"]);
        let err = controller.start(log).unwrap_err();
        assert!(matches!(err, GorunError::SpawnFailed { .. }));
    }

    #[test]
    fn non_positive_pids_are_never_alive() {
        let controller = OsProcessController::new("true", Vec::<String>::new());
        assert!(!controller.is_alive(0));
        assert!(!controller.is_alive(-1));
    }

    #[test]
    fn current_process_is_alive() {
        let controller = OsProcessController::new("true", Vec::<String>::new());
        assert!(controller.is_alive(std::process::id() as i32));
    }

    #[tokio::test]
    async fn stop_of_exited_process_succeeds() {
        let dir = TempDir::new().unwrap();
        let log = File::create(dir.path().join("out.log")).unwrap();

        let controller = OsProcessController::new("true", Vec::<String>::new());
        let pid = controller.start(log).unwrap();
        reap(pid).join().unwrap();

        assert!(!controller.is_alive(pid));
        controller.stop(pid).await.unwrap();
    }

    #[test]
    fn foreign_process_is_alive() {
        // Signalling init fails with EPERM unless we are root; both mean alive
        let controller = OsProcessController::new("true", Vec::<String>::new());
        assert!(controller.is_alive(1));
    }
}
