//! Daemon coordinator: wires the services together, owns the PID and
//! socket files, and drives startup, signal handling, and shutdown.

use std::fs::File;
use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fs2::FileExt;
use tokio::sync::watch;

use super::handlers::{register_methods, HandlerContext};
use super::paths::{read_pid_file, DaemonPaths};
use super::sessions::SessionService;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Config, TaskKind};
use crate::domain::ports::{
    ActivityRepository, ProjectRepository, ScheduleRepository, SessionRepository,
};
use crate::infrastructure::database::{
    ActivityRepositoryImpl, DatabaseConnection, ProjectRepositoryImpl, ScheduleRepositoryImpl,
    SessionRepositoryImpl,
};
use crate::infrastructure::ipc::IpcServer;
use crate::infrastructure::process::{self, ProcessSupervisor};
use crate::services::{
    AgentRuntime, BackupExecutor, CommandExecutor, CronEngine, MessageBus, Notifier, PoolConfig,
    ReminderExecutor, SessionPool, SessionQueue, SkillExecutor, SkillRegistry,
};

/// Singleton daemon process.
pub struct Daemon {
    paths: DaemonPaths,
    config: Config,
    db: DatabaseConnection,
    lock_file: File,
    sessions: Arc<SessionService>,
    session_repo: Arc<dyn SessionRepository>,
    projects: Arc<dyn ProjectRepository>,
    queue: Arc<SessionQueue>,
    cron: Arc<CronEngine>,
    agent_runtime: Arc<AgentRuntime>,
    skills: Arc<SkillRegistry>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    stopped: AtomicBool,
}

impl Daemon {
    /// Start the daemon: acquire the PID lock, open the store, recover
    /// sessions, and start the background loops. Fails with a Fatal error
    /// when another daemon holds the lock.
    pub async fn start(paths: DaemonPaths, config: Config) -> DomainResult<Self> {
        paths.ensure_layout()?;

        // A live pid in the file means another daemon; a stale one is
        // cleaned up along with any leftover socket.
        let pid_path = paths.pid_path();
        if let Some(existing) = read_pid_file(&pid_path) {
            if process::pid_alive(existing) {
                return Err(DomainError::Fatal(format!(
                    "daemon already running with pid {existing}"
                )));
            }
            let _ = std::fs::remove_file(&pid_path);
        }
        let socket_path = paths.socket_path();
        if socket_path.exists() {
            let _ = std::fs::remove_file(&socket_path);
        }

        // Exclusive lock before anything else; avoid truncating until the
        // lock is held so a running daemon's pid is never wiped.
        let lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&pid_path)?;
        lock_file.try_lock_exclusive().map_err(|e| {
            DomainError::Fatal(format!("daemon already running (pid file locked): {e}"))
        })?;

        let db = DatabaseConnection::new(&paths.database_url())
            .await
            .map_err(|e| DomainError::Fatal(format!("store unavailable: {e}")))?;
        db.migrate()
            .await
            .map_err(|e| DomainError::Fatal(format!("store migration failed: {e}")))?;

        let projects: Arc<dyn ProjectRepository> =
            Arc::new(ProjectRepositoryImpl::new(db.pool().clone()));
        let session_repo: Arc<dyn SessionRepository> =
            Arc::new(SessionRepositoryImpl::new(db.pool().clone()));
        let activities: Arc<dyn ActivityRepository> =
            Arc::new(ActivityRepositoryImpl::new(db.pool().clone()));
        let schedules: Arc<dyn ScheduleRepository> =
            Arc::new(ScheduleRepositoryImpl::new(db.pool().clone()));

        let bus = Arc::new(MessageBus::new());
        let queue = Arc::new(SessionQueue::default());
        let pool = Arc::new(
            SessionPool::new(
                PoolConfig {
                    max_global_concurrent: config.multiplex.max_sessions,
                    max_per_project: config.multiplex.max_sessions_per_project,
                    session_timeout_ms: config.default_options.timeout,
                    ..Default::default()
                },
                Arc::clone(&bus),
            )
            .with_queue(Arc::clone(&queue)),
        );
        let notifier = Arc::new(Notifier::new());
        let skills = Arc::new(SkillRegistry::new(Arc::clone(&projects)));

        let sessions = SessionService::new(
            Arc::clone(&session_repo),
            Arc::clone(&projects),
            Arc::clone(&activities),
            Arc::clone(&pool),
            ProcessSupervisor::default(),
            Arc::clone(&notifier),
        );

        let report = sessions.recover().await?;
        tracing::info!(
            interrupted = report.interrupted,
            retained = report.retained,
            "session recovery complete"
        );

        let cron = Arc::new(CronEngine::new(
            Arc::clone(&schedules),
            Arc::clone(&projects),
            Arc::clone(&notifier),
            Duration::from_secs(60),
        ));
        cron.register_executor(TaskKind::Reminder, Arc::new(ReminderExecutor))
            .await;
        cron.register_executor(
            TaskKind::Backup,
            Arc::new(BackupExecutor::new(paths.data_dir.clone())),
        )
        .await;
        cron.register_executor(TaskKind::Command, Arc::new(CommandExecutor))
            .await;
        cron.register_executor(
            TaskKind::Skill,
            Arc::new(SkillExecutor::new(Arc::clone(&skills))),
        )
        .await;

        let autostart = std::env::var("MAXCLAW_SCHEDULER_AUTOSTART")
            .map(|v| v != "false")
            .unwrap_or(true);
        if autostart {
            cron.start();
        } else {
            tracing::info!("scheduler autostart disabled");
        }

        let agent_runtime = Arc::new(AgentRuntime::new(
            Arc::clone(&bus),
            crate::services::agents::DEFAULT_HEARTBEAT_INTERVAL,
        ));
        agent_runtime.start_heartbeat_loop();

        // Skill hook events fan back out through the registry.
        if let Some(mut events) = skills.take_event_receiver().await {
            let skills = Arc::clone(&skills);
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    skills.trigger_hook(&event.event, event.data).await;
                }
            });
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handler_ctx = Arc::new(HandlerContext {
            sessions: Arc::clone(&sessions),
            session_repo: Arc::clone(&session_repo),
            projects: Arc::clone(&projects),
            queue: Arc::clone(&queue),
            started_at: Utc::now(),
            shutdown: shutdown_tx.clone(),
        });
        let server = IpcServer::bind(
            &socket_path,
            register_methods(handler_ctx),
            shutdown_rx.clone(),
        )?;
        tokio::spawn(server.run());

        // PID content goes in last, once the daemon is actually serving.
        let mut lock_file = lock_file;
        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
        lock_file.flush()?;

        tracing::info!(
            socket = %socket_path.display(),
            pid = std::process::id(),
            "daemon started"
        );

        Ok(Self {
            paths,
            config,
            db,
            lock_file,
            sessions,
            session_repo,
            projects,
            queue,
            cron,
            agent_runtime,
            skills,
            shutdown_tx,
            shutdown_rx,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn skills(&self) -> &Arc<SkillRegistry> {
        &self.skills
    }

    pub fn projects(&self) -> &Arc<dyn ProjectRepository> {
        &self.projects
    }

    /// Block until SIGINT, SIGTERM, or a `daemon.stop` request, then shut
    /// down gracefully.
    pub async fn run_until_shutdown(mut self) -> DomainResult<()> {
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .map_err(|e| DomainError::Fatal(format!("cannot install SIGINT handler: {e}")))?;
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|e| DomainError::Fatal(format!("cannot install SIGTERM handler: {e}")))?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("SIGINT received");
                    break;
                }
                _ = sigterm.recv() => {
                    tracing::info!("SIGTERM received");
                    break;
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        tracing::info!("stop requested over RPC");
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Graceful shutdown; safe to call more than once.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        // Stop accepting connections and stop the sweep first.
        let _ = self.shutdown_tx.send(true);
        self.cron.stop();

        // Terminate active sessions: SIGTERM, grace, SIGKILL, and write
        // terminal records. Unowned recovered sessions are only recorded.
        match self.session_repo.list_active().await {
            Ok(active) => {
                for session in active {
                    if let Err(e) = self.sessions.stop(session.id).await {
                        tracing::warn!(session_id = %session.id, error = %e, "failed to stop session");
                    }
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to enumerate active sessions"),
        }

        self.agent_runtime.shutdown().await;
        self.db.close().await;

        let _ = std::fs::remove_file(self.paths.socket_path());
        let _ = std::fs::remove_file(self.paths.pid_path());
        let _ = fs2::FileExt::unlock(&self.lock_file);

        tracing::info!("daemon stopped");
    }
}
