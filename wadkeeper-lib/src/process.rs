//! Source port process lifecycle.
//!
//! [`ProcessOrchestrator`] moves through `Idle → Launching → Running →
//! {Exited, Failed}`. The exit of the engine is observed on a dedicated
//! waiter thread and handed back over a channel; the owner collects it with
//! [`ProcessOrchestrator::poll_exit`] from its own thread. An optional
//! [`Waker`] is called from the waiter thread so an event loop knows to
//! poll.
//!
//! Only one session may run at a time. That rule is held by a
//! [`SessionLock`], process-wide by default. Once the engine is running the
//! waiter thread owns the lock and releases it when the engine exits, so
//! dropping the orchestrator early does not free it.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, mpsc};
use std::time::Duration;

use chrono::{DateTime, Local};
use wadkeeper_core::{GameFile, SourcePortData};

use crate::error::LaunchError;
use crate::launch::LaunchPlan;
use crate::profile::SourcePortProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    Launching,
    Running,
    Exited,
    Failed,
}

/// Guards the "one running session" rule.
#[derive(Debug, Clone, Default)]
pub struct SessionLock(Arc<AtomicBool>);

static GLOBAL_SESSION_LOCK: LazyLock<SessionLock> = LazyLock::new(SessionLock::new);

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock shared by every orchestrator in this process.
    pub fn global() -> Self {
        GLOBAL_SESSION_LOCK.clone()
    }

    /// Take the lock. Returns `false` if another session holds it.
    pub fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Called from the waiter thread once the engine has exited.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// The running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub source_port: SourcePortData,
    pub game_file: GameFile,
    /// Demo file the engine was asked to record.
    pub recorded_demo: Option<PathBuf>,
    pub pid: u32,
    pub started_at: DateTime<Local>,
}

/// How the engine exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub exited_at: DateTime<Local>,
}

pub struct ProcessOrchestrator {
    lock: SessionLock,
    waker: Option<Waker>,
    state: LaunchState,
    holds_lock: bool,
    handle: Option<SessionHandle>,
    exit_rx: Option<mpsc::Receiver<ExitReport>>,
    last_error: Option<String>,
}

impl Default for ProcessOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessOrchestrator {
    /// Orchestrator bound to the process-wide session lock.
    pub fn new() -> Self {
        Self::with_lock(SessionLock::global())
    }

    pub fn with_lock(lock: SessionLock) -> Self {
        Self {
            lock,
            waker: None,
            state: LaunchState::Idle,
            holds_lock: false,
            handle: None,
            exit_rx: None,
            last_error: None,
        }
    }

    /// Register the "run on foreground" hook.
    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = Some(waker);
        self
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LaunchState::Running
    }

    pub fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    /// Message of the last failed launch.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start the engine with `plan`. The child runs in the source port's
    /// directory.
    ///
    /// Rejected with [`LaunchError::AlreadyPlaying`] before any state change
    /// if a session is running anywhere in the process.
    pub fn launch(
        &mut self,
        profile: &SourcePortProfile,
        game_file: &GameFile,
        plan: &LaunchPlan,
    ) -> Result<&SessionHandle, LaunchError> {
        if !self.lock.try_acquire() {
            return Err(LaunchError::AlreadyPlaying);
        }
        self.holds_lock = true;
        self.state = LaunchState::Launching;
        self.handle = None;
        self.exit_rx = None;
        self.last_error = None;

        let executable = profile.executable();
        if !executable.is_file() {
            return Err(self.fail(LaunchError::ExecutableNotFound(executable.to_path_buf())));
        }

        let directory = profile.directory();
        log::info!(
            "Launching {} in '{}': {}",
            profile.name(),
            directory.display(),
            plan.args.join(" ")
        );
        let mut child = match Command::new(executable)
            .args(&plan.args)
            .current_dir(&directory)
            .stdin(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return Err(self.fail(LaunchError::Spawn(e))),
        };
        let pid = child.id();

        let (tx, rx) = mpsc::channel();
        let waker = self.waker.clone();
        let lock = self.lock.clone();
        let spawned = std::thread::Builder::new()
            .name("wadkeeper-exit-watch".into())
            .spawn(move || {
                let report = match child.wait() {
                    Ok(status) => ExitReport {
                        code: status.code(),
                        success: status.success(),
                        exited_at: Local::now(),
                    },
                    Err(e) => {
                        log::warn!("Lost track of source port process {}: {}", pid, e);
                        ExitReport {
                            code: None,
                            success: false,
                            exited_at: Local::now(),
                        }
                    }
                };
                lock.release();
                let _ = tx.send(report);
                if let Some(waker) = waker {
                    waker();
                }
            });
        if let Err(e) = spawned {
            return Err(self.fail(LaunchError::Spawn(e)));
        }

        self.holds_lock = false;
        self.exit_rx = Some(rx);
        self.state = LaunchState::Running;
        let handle = self.handle.insert(SessionHandle {
            source_port: profile.data().clone(),
            game_file: game_file.clone(),
            recorded_demo: plan.recorded_demo.clone(),
            pid,
            started_at: Local::now(),
        });
        Ok(handle)
    }

    /// Collect the exit if it has happened. Each exit is returned once.
    pub fn poll_exit(&mut self) -> Option<ExitReport> {
        let received = self.exit_rx.as_ref()?.try_recv();
        match received {
            Ok(report) => Some(self.exited(report)),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(self.exited(ExitReport {
                code: None,
                success: false,
                exited_at: Local::now(),
            })),
        }
    }

    /// Block until the engine exits, at most `timeout`.
    pub fn wait_exit(&mut self, timeout: Duration) -> Option<ExitReport> {
        let received = self.exit_rx.as_ref()?.recv_timeout(timeout);
        match received {
            Ok(report) => Some(self.exited(report)),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(self.exited(ExitReport {
                code: None,
                success: false,
                exited_at: Local::now(),
            })),
        }
    }

    fn exited(&mut self, report: ExitReport) -> ExitReport {
        self.exit_rx = None;
        self.state = LaunchState::Exited;
        self.release();
        log::info!("Source port exited with code {:?}", report.code);
        report
    }

    fn fail(&mut self, err: LaunchError) -> LaunchError {
        log::warn!("Launch failed: {}", err);
        self.last_error = Some(err.to_string());
        self.state = LaunchState::Failed;
        self.release();
        err
    }

    fn release(&mut self) {
        if self.holds_lock {
            self.lock.release();
            self.holds_lock = false;
        }
    }
}

impl Drop for ProcessOrchestrator {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const WAIT: Duration = Duration::from_secs(10);

    fn shell(script: &str) -> (SourcePortProfile, LaunchPlan) {
        let profile = SourcePortProfile::resolve(SourcePortData::new("sh", "/bin/sh"));
        let plan = LaunchPlan {
            args: vec!["-c".into(), script.into()],
            ..LaunchPlan::default()
        };
        (profile, plan)
    }

    #[test]
    fn exit_code_is_reported_once() {
        let (profile, plan) = shell("exit 3");
        let mut orch = ProcessOrchestrator::with_lock(SessionLock::new());
        let handle = orch.launch(&profile, &GameFile::new("av.zip"), &plan).unwrap();
        assert_eq!(handle.game_file.file_name, "av.zip");
        assert_eq!(orch.state(), LaunchState::Running);

        let report = orch.wait_exit(WAIT).unwrap();
        assert_eq!(report.code, Some(3));
        assert!(!report.success);
        assert_eq!(orch.state(), LaunchState::Exited);
        assert!(orch.poll_exit().is_none());
        assert!(orch.wait_exit(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn second_launch_is_rejected_while_running() {
        let lock = SessionLock::new();
        let (profile, plan) = shell("sleep 1");
        let mut first = ProcessOrchestrator::with_lock(lock.clone());
        first.launch(&profile, &GameFile::new("a"), &plan).unwrap();

        let mut second = ProcessOrchestrator::with_lock(lock.clone());
        let err = second
            .launch(&profile, &GameFile::new("b"), &plan)
            .unwrap_err();
        assert!(matches!(err, LaunchError::AlreadyPlaying));
        assert_eq!(second.state(), LaunchState::Idle);
        assert!(first.launch(&profile, &GameFile::new("a"), &plan).is_err());

        first.wait_exit(WAIT).unwrap();
        assert!(!lock.is_held());
        second.launch(&profile, &GameFile::new("b"), &plan).unwrap();
        second.wait_exit(WAIT).unwrap();
    }

    #[test]
    fn dropping_a_running_orchestrator_keeps_the_lock_until_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let go = tmp.path().join("go");
        let script = format!("while [ ! -f '{}' ]; do sleep 0.05; done", go.display());
        let (profile, plan) = shell(&script);
        let lock = SessionLock::new();

        let mut first = ProcessOrchestrator::with_lock(lock.clone());
        first.launch(&profile, &GameFile::new("a"), &plan).unwrap();
        drop(first);
        assert!(lock.is_held());

        let mut second = ProcessOrchestrator::with_lock(lock.clone());
        let err = second
            .launch(&profile, &GameFile::new("b"), &plan)
            .unwrap_err();
        assert!(matches!(err, LaunchError::AlreadyPlaying));

        std::fs::write(&go, "").unwrap();
        for _ in 0..500 {
            if !lock.is_held() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!lock.is_held());
    }

    #[test]
    fn missing_executable_fails_without_a_process() {
        let lock = SessionLock::new();
        let profile = SourcePortProfile::resolve(SourcePortData::new(
            "gone",
            "/definitely/not/here/gzdoom",
        ));
        let mut orch = ProcessOrchestrator::with_lock(lock.clone());
        let err = orch
            .launch(&profile, &GameFile::new("a"), &LaunchPlan::default())
            .unwrap_err();
        assert!(matches!(err, LaunchError::ExecutableNotFound(_)));
        assert_eq!(orch.state(), LaunchState::Failed);
        assert!(orch.last_error().unwrap().contains("gzdoom"));
        assert!(orch.handle().is_none());
        assert!(!lock.is_held());
    }

    #[test]
    fn child_runs_in_port_directory_and_wakes_owner() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("fakeport");
        std::fs::write(&exe, "#!/bin/sh\npwd > where.txt\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let woken = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&woken);
        let profile = SourcePortProfile::resolve(SourcePortData::new("fake", &exe));
        let mut orch = ProcessOrchestrator::with_lock(SessionLock::new()).with_waker(Arc::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));
        orch.launch(&profile, &GameFile::new("a"), &LaunchPlan::default())
            .unwrap();
        let report = orch.wait_exit(WAIT).unwrap();
        assert!(report.success);

        let written = std::fs::read_to_string(tmp.path().join("where.txt")).unwrap();
        let expected = tmp.path().canonicalize().unwrap();
        assert_eq!(
            PathBuf::from(written.trim()).canonicalize().unwrap(),
            expected
        );
        // The waker runs just after the report is sent.
        for _ in 0..100 {
            if woken.load(Ordering::SeqCst) > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }
}
