//! Cosmetic cell transitions on a cooperative, monotonic-clock scheduler.
//!
//! Nothing here runs on its own: the owner calls [`TransitionScheduler::tick`]
//! once per frame and acts on the transitions that completed. A removal only
//! takes effect on the sheet when its `Remove` transition completes, which is
//! the window in which a cell carries its "deleting" marker.

use std::time::{Duration, Instant};

use crate::sheet::CellId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// A new cell grows in.
    Appear,
    /// A deleted cell shrinks out; the cell is removed when this completes.
    Remove,
    /// A cell's output is highlighted after a successful calculation.
    Flash,
}

impl TransitionKind {
    fn steps(self) -> u32 {
        match self {
            TransitionKind::Appear => 6,
            TransitionKind::Remove => 10,
            TransitionKind::Flash => 2,
        }
    }

    fn step_interval(self) -> Duration {
        match self {
            TransitionKind::Flash => Duration::from_millis(300),
            _ => Duration::from_millis(33),
        }
    }

    /// Total running time: one interval per step plus the final one.
    pub fn duration(self) -> Duration {
        self.step_interval() * (self.steps() + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub cell: CellId,
    pub kind: TransitionKind,
    started: Instant,
}

impl Transition {
    /// Fraction of the transition elapsed at `now`, in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started);
        let total = self.kind.duration();
        (elapsed.as_secs_f32() / total.as_secs_f32()).min(1.0)
    }

    fn is_done(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.kind.duration()
    }
}

#[derive(Debug, Default)]
pub struct TransitionScheduler {
    active: Vec<Transition>,
}

impl TransitionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `kind` on `cell`.
    ///
    /// A running flash restarts; a second appear or remove is ignored. Starting
    /// a removal cancels anything else running on that cell.
    pub fn start(&mut self, cell: CellId, kind: TransitionKind, now: Instant) {
        if kind == TransitionKind::Remove {
            self.active
                .retain(|t| t.cell != cell || t.kind == TransitionKind::Remove);
        }
        if let Some(existing) = self
            .active
            .iter_mut()
            .find(|t| t.cell == cell && t.kind == kind)
        {
            if kind == TransitionKind::Flash {
                existing.started = now;
            }
            return;
        }
        self.active.push(Transition {
            cell,
            kind,
            started: now,
        });
    }

    /// Drop every transition running on `cell`.
    pub fn cancel_cell(&mut self, cell: CellId) {
        self.active.retain(|t| t.cell != cell);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Advance to `now`, returning the transitions that completed, oldest first.
    pub fn tick(&mut self, now: Instant) -> Vec<Transition> {
        let (done, running): (Vec<_>, Vec<_>) =
            self.active.drain(..).partition(|t| t.is_done(now));
        self.active = running;
        done
    }

    /// Complete everything immediately.
    pub fn finish_all(&mut self) -> Vec<Transition> {
        std::mem::take(&mut self.active)
    }

    pub fn progress(&self, cell: CellId, kind: TransitionKind, now: Instant) -> Option<f32> {
        self.active
            .iter()
            .find(|t| t.cell == cell && t.kind == kind)
            .map(|t| t.progress(now))
    }
}
