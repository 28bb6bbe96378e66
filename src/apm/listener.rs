use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::apm::event::{CommandResult, CommandStarted};
use crate::Result;

pub type StartHook = Box<dyn Fn(&CommandStarted) + Send + Sync>;
pub type CompletionHook = Box<dyn Fn(&CommandResult) + Send + Sync>;

/// Holds the monitoring hooks of a client.
pub struct Listener {
    no_start_hooks: AtomicBool,
    no_completion_hooks: AtomicBool,
    start_hooks: RwLock<Vec<StartHook>>,
    completion_hooks: RwLock<Vec<CompletionHook>>,
}

impl Default for Listener {
    fn default() -> Self {
        Listener::new()
    }
}

impl Listener {
    pub fn new() -> Listener {
        Listener {
            no_start_hooks: AtomicBool::new(true),
            no_completion_hooks: AtomicBool::new(true),
            start_hooks: RwLock::new(Vec::new()),
            completion_hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn add_start_hook<F>(&self, hook: F) -> Result<()>
        where F: Fn(&CommandStarted) + Send + Sync + 'static
    {
        let mut guard = self.start_hooks.write()?;
        self.no_start_hooks.store(false, Ordering::SeqCst);
        guard.deref_mut().push(Box::new(hook));
        Ok(())
    }

    pub fn add_completion_hook<F>(&self, hook: F) -> Result<()>
        where F: Fn(&CommandResult) + Send + Sync + 'static
    {
        let mut guard = self.completion_hooks.write()?;
        self.no_completion_hooks.store(false, Ordering::SeqCst);
        guard.deref_mut().push(Box::new(hook));
        Ok(())
    }

    pub fn run_start_hooks(&self, started: &CommandStarted) -> Result<()> {
        if self.no_start_hooks.load(Ordering::SeqCst) {
            return Ok(());
        }

        let guard = self.start_hooks.read()?;

        for hook in guard.deref().iter() {
            hook(started);
        }

        Ok(())
    }

    pub fn run_completion_hooks(&self, result: &CommandResult) -> Result<()> {
        if self.no_completion_hooks.load(Ordering::SeqCst) {
            return Ok(());
        }

        let guard = self.completion_hooks.read()?;

        for hook in guard.deref().iter() {
            hook(result);
        }

        Ok(())
    }
}
