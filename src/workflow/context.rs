//! Request reading stage
//!
//! Each request carries the stage that unqualified reads default to. The
//! workflow switches it for the duration of a transition with `enter`, and
//! the returned guard puts the previous stage back when dropped, including
//! on early returns.

use std::cell::Cell;

use crate::observability::Logger;
use crate::record::Stage;

/// Request-scoped reading stage.
#[derive(Debug)]
pub struct ReadingContext {
    stage: Cell<Stage>,
}

impl Default for ReadingContext {
    fn default() -> Self {
        Self::new(Stage::Draft)
    }
}

impl ReadingContext {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage: Cell::new(stage),
        }
    }

    pub fn current(&self) -> Stage {
        self.stage.get()
    }

    /// Replaces the stage without restoring it later.
    pub fn set(&self, stage: Stage) {
        let previous = self.stage.replace(stage);
        if previous != stage {
            Logger::trace(
                "READING_STAGE_CHANGED",
                &[("from", previous.as_str()), ("to", stage.as_str())],
            );
        }
    }

    /// Switches to `stage` until the guard is dropped.
    #[must_use = "the previous stage is restored when the guard is dropped"]
    pub fn enter(&self, stage: Stage) -> StageGuard<'_> {
        let previous = self.current();
        self.set(stage);
        StageGuard {
            context: self,
            previous,
        }
    }
}

/// Restores the previous reading stage on drop.
#[derive(Debug)]
pub struct StageGuard<'a> {
    context: &'a ReadingContext,
    previous: Stage,
}

impl StageGuard<'_> {
    /// Stage that will be restored.
    pub fn previous(&self) -> Stage {
        self.previous
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.context.set(self.previous);
    }
}
