//! Application module
//!
//! Owns the wizard, the background run and the terminal event loop.
//!
//! # Module Structure
//! - `state` - run progress rebuilt from worker events
//! - Main module - App struct and event loop

mod state;

pub use state::{RunProgress, StepRow};

use crate::catalog::SoftwareCatalog;
use crate::command_runner::CommandRunner;
use crate::config::Configuration;
use crate::engine::{build_plan, Target};
use crate::error::Result;
use crate::hardware::HostInfo;
use crate::input::{map_key, KeyAction};
use crate::process_guard::ProcessGuard;
use crate::ui::UiRenderer;
use crate::wizard::{ConfigurationWizard, WizardOutcome, WizardState};
use crate::worker::{spawn_run, RunHandle};
use crossterm::event::{Event, KeyEvent};
use ratatui::backend::Backend;
use ratatui::Terminal;
use std::sync::Arc;
use std::time::Duration;

/// Input poll interval; also bounds how stale the progress view can get
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct App {
    wizard: ConfigurationWizard,
    progress: Option<RunProgress>,
    run: Option<RunHandle>,
    runner: Arc<dyn CommandRunner>,
    target: Target,
    host: HostInfo,
    dry_run: bool,
    ui_renderer: UiRenderer,
    /// Kills any tracked child processes if the app goes away mid-run
    _process_guard: ProcessGuard,
}

impl App {
    pub fn new(
        catalog: SoftwareCatalog,
        runner: Arc<dyn CommandRunner>,
        target: Target,
        host: HostInfo,
        dry_run: bool,
    ) -> Self {
        tracing::info!(disk = %target.disk.display(), root = %target.root.display(), dry_run, "creating app");
        Self {
            wizard: ConfigurationWizard::new(catalog),
            progress: None,
            run: None,
            runner,
            target,
            host,
            dry_run,
            ui_renderer: UiRenderer::new(),
            _process_guard: ProcessGuard::new(),
        }
    }

    pub fn wizard(&self) -> &ConfigurationWizard {
        &self.wizard
    }

    pub fn progress(&self) -> Option<&RunProgress> {
        self.progress.as_ref()
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Firmware warning for the partition type chosen so far
    pub fn boot_warning(&self) -> Option<String> {
        self.wizard
            .partition_type()
            .and_then(|p| self.host.boot_warning(p))
    }

    /// Run the main application loop until the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        tracing::info!("starting main application loop");

        loop {
            self.poll_run_events();

            if crossterm::event::poll(POLL_INTERVAL)? {
                if let Event::Key(key_event) = crossterm::event::read()? {
                    if self.handle_key_event(key_event) {
                        break;
                    }
                }
            }

            let app = &*self;
            terminal.draw(|f| app.ui_renderer.render(f, app))?;
        }

        tracing::info!("main application loop finished");
        Ok(())
    }

    /// Returns true when the app should exit.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match map_key(key, self.wizard.state()) {
            KeyAction::None => false,
            KeyAction::CancelRun => {
                self.cancel_run();
                false
            }
            KeyAction::Wizard(input) => match self.wizard.handle_input(input) {
                WizardOutcome::Quit => true,
                WizardOutcome::Submitted(config) => {
                    self.start_run(config);
                    false
                }
                _ => false,
            },
        }
    }

    fn cancel_run(&mut self) {
        if let (Some(handle), Some(progress)) = (&self.run, &mut self.progress) {
            if !progress.cancel_requested {
                handle.cancel();
                progress.cancel_requested = true;
            }
        }
    }

    fn start_run(&mut self, config: Configuration) {
        let plan = match build_plan(&config, &self.target, self.host.ram_mib) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(error = %e, "could not build provisioning plan");
                self.progress = Some(RunProgress::start_failed(e.to_string()));
                self.wizard.mark_finished();
                return;
            }
        };
        tracing::info!(plan = %plan.summary(), "provisioning plan built");

        let progress = RunProgress::from_plan(&plan);
        match spawn_run(plan, Arc::clone(&self.runner)) {
            Ok(handle) => {
                self.progress = Some(progress);
                self.run = Some(handle);
            }
            Err(e) => {
                tracing::error!(error = %e, "could not start provisioning run");
                self.progress = Some(RunProgress::start_failed(e.to_string()));
                self.wizard.mark_finished();
            }
        }
    }

    /// Drain worker events into the progress view.
    fn poll_run_events(&mut self) {
        let (Some(handle), Some(progress)) = (&self.run, &mut self.progress) else {
            return;
        };
        for event in handle.poll_events() {
            progress.apply(event);
        }
        if progress.is_finished() {
            if let Some(handle) = self.run.take() {
                // Finished was the last event; this only joins the thread
                let _ = handle.wait();
            }
            if self.wizard.state() == WizardState::Running {
                self.wizard.mark_finished();
            }
        }
    }
}
