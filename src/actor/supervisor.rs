//! Reload supervisor.
//!
//! On every pulse: kill the prior app runtime, introspect the module,
//! reconcile the definition with the live session (create it on first
//! run), apply the edit script through the event service as client
//! `"server"`, then start a fresh runtime child bound to the session.
//!
//! Failures never stop the loop: an introspection error is shown to the
//! developer and the next saved file gets another chance.

use std::process::Child;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::messages::ReloadMsg;
use crate::app::Definition;
use crate::config::DevConfig;
use crate::diff::{EditScript, diff};
use crate::event::{EventError, EventService, SERVER_CLIENT_ID};
use crate::introspect::introspect;
use crate::logger::WatchStatus;
use crate::repo::{RepoError, SessionRepository};

pub struct SupervisorActor {
    /// Channel to receive reload pulses
    rx: mpsc::Receiver<ReloadMsg>,
    events: Arc<EventService>,
    repo: Arc<dyn SessionRepository>,
    config: Arc<DevConfig>,
    /// The running app runtime child, if any
    runtime: Option<Child>,
    status: WatchStatus,
}

impl SupervisorActor {
    pub fn new(
        rx: mpsc::Receiver<ReloadMsg>,
        events: Arc<EventService>,
        repo: Arc<dyn SessionRepository>,
        config: Arc<DevConfig>,
    ) -> Self {
        Self {
            rx,
            events,
            repo,
            config,
            runtime: None,
            status: WatchStatus::new(),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                ReloadMsg::Pulse => self.reload().await,
                ReloadMsg::Shutdown => {
                    self.kill_runtime();
                    break;
                }
            }
        }
        crate::debug!("reload"; "supervisor stopped");
    }

    /// One full reload cycle.
    async fn reload(&mut self) {
        self.kill_runtime();

        let interpreter = self.config.interpreter.clone();
        let module_path = self.config.module_path.clone();
        let class_name = self.config.class_name.clone();
        let introspected = tokio::task::spawn_blocking(move || {
            introspect(&interpreter, &module_path, &class_name)
        })
        .await;

        let def = match introspected {
            Ok(Ok(def)) => def,
            Ok(Err(err)) => {
                self.status
                    .error(&format!("introspection failed: {err}"), &err.detail());
                return;
            }
            Err(join_err) => {
                crate::log!("error"; "introspection task died: {}", join_err);
                return;
            }
        };

        let session_id = match self.reconcile(&def) {
            Ok(session_id) => session_id,
            Err(err) => {
                self.status.error("reconciliation failed", &err.to_string());
                return;
            }
        };

        self.start_runtime(&session_id);
    }

    /// Diff the definition against the live session and apply the edits;
    /// create the session if this is the first successful introspection.
    fn reconcile(&mut self, def: &Definition) -> Result<String, EventError> {
        match self.repo.read("0") {
            Ok(session) => {
                let session_id = session.id().to_string();
                let script = diff(&session, def);
                if script.is_empty() {
                    self.status.unchanged(&format!("{} unchanged", def.name));
                } else {
                    let summary = format!(
                        "reconciled {}: +{} -{} ~{}",
                        def.name,
                        script.added.len(),
                        script.removed.len(),
                        script.updated.len(),
                    );
                    self.apply(&session_id, script);
                    self.status.success(&summary);
                }
                Ok(session_id)
            }
            Err(RepoError::NotCreated) => {
                let session = self.repo.create(def)?;
                self.status.success(&format!(
                    "session created: {} ({} elements)",
                    def.name,
                    session.elements().len()
                ));
                Ok(session.id().to_string())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Apply an edit script through the event service so every connected
    /// client sees the reload as ordinary element events.
    fn apply(&self, session_id: &str, script: EditScript) {
        for removed in script.removed {
            match self
                .events
                .remove_element(session_id, SERVER_CLIENT_ID, removed.id)
            {
                Ok(_) => {}
                // a removed container already took this descendant with it
                Err(EventError::Repo(RepoError::Element(_))) => {
                    crate::debug!("reload"; "element {} already gone", removed.id);
                }
                Err(err) => crate::log!("error"; "remove failed: {}", err),
            }
        }

        for added in script.added {
            let parent_id = added
                .parent_id
                .as_deref()
                .and_then(|p| p.parse::<crate::app::ElementId>().ok());
            if let Err(err) =
                self.events
                    .add_element(session_id, SERVER_CLIENT_ID, parent_id, added.element)
            {
                crate::log!("error"; "add failed: {}", err);
            }
        }

        for updated in script.updated {
            if let Err(err) = self
                .events
                .update_element_label(session_id, SERVER_CLIENT_ID, updated)
            {
                crate::log!("error"; "update failed: {}", err);
            }
        }
    }

    // ========================================================================
    // Runtime child
    // ========================================================================

    fn kill_runtime(&mut self) {
        if let Some(mut child) = self.runtime.take() {
            crate::debug!("run"; "stopping app runtime (pid {})", child.id());
            if let Err(err) = child.kill() {
                crate::log!("run"; "failed to kill runtime: {}", err);
            }
            let _ = child.wait();
        }
    }

    fn start_runtime(&mut self, session_id: &str) {
        let graphql_url = format!("http://localhost:{}/query", self.config.port);
        let graphql_ws_url = format!("ws://localhost:{}/query", self.config.port);

        let spawned = crate::utils::exec::Cmd::new(&self.config.interpreter)
            .args(["-m", "numerous", "run"])
            .args(["--graphql-url", &graphql_url])
            .args(["--graphql-ws-url", &graphql_ws_url])
            .arg(&self.config.module_path)
            .arg(&self.config.class_name)
            .arg(session_id)
            .env("PYTHONUNBUFFERED", "1")
            .spawn();

        match spawned {
            Ok(child) => {
                crate::debug!("run"; "app runtime started (pid {})", child.id());
                self.runtime = Some(child);
            }
            Err(err) => crate::log!("run"; "failed to start runtime: {}", err),
        }
    }
}
