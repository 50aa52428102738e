//! Behaviours bound to node lifecycle events.

use std::fmt;
use std::sync::Arc;

use ferrule_foundation::Result;
use ferrule_repository::{EventKind, NodeEvent};

use crate::transaction::Transaction;

/// Something that reacts to a lifecycle event inside a unit of work.
pub trait Behaviour: Send + Sync {
    /// Handles one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the behaviour cannot complete; it propagates to
    /// the caller that flushed the events.
    fn handle(&self, tx: &mut Transaction<'_>, event: &NodeEvent) -> Result<()>;
}

struct FnBehaviour<F>(F);

impl<F> Behaviour for FnBehaviour<F>
where
    F: Fn(&mut Transaction<'_>, &NodeEvent) -> Result<()> + Send + Sync,
{
    fn handle(&self, tx: &mut Transaction<'_>, event: &NodeEvent) -> Result<()> {
        (self.0)(tx, event)
    }
}

/// Event kind to behaviour bindings, in registration order.
#[derive(Clone, Default)]
pub struct PolicyComponent {
    bindings: Vec<(EventKind, Arc<dyn Behaviour>)>,
}

impl PolicyComponent {
    /// Creates a component with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a behaviour to an event kind.
    pub fn bind(&mut self, kind: EventKind, behaviour: Arc<dyn Behaviour>) {
        self.bindings.push((kind, behaviour));
    }

    /// Binds a closure to an event kind.
    pub fn bind_fn<F>(&mut self, kind: EventKind, behaviour: F)
    where
        F: Fn(&mut Transaction<'_>, &NodeEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.bind(kind, Arc::new(FnBehaviour(behaviour)));
    }

    /// Returns the number of behaviours bound to `kind`.
    #[must_use]
    pub fn bound(&self, kind: EventKind) -> usize {
        self.bindings.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Delivers an event to every behaviour bound to its kind.
    ///
    /// # Errors
    ///
    /// Returns the first behaviour error; later behaviours do not run.
    pub fn dispatch(&self, tx: &mut Transaction<'_>, event: &NodeEvent) -> Result<()> {
        let kind = event.kind();
        for (_, behaviour) in self.bindings.iter().filter(|(k, _)| *k == kind) {
            behaviour.handle(tx, event)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PolicyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.bindings.iter().map(|(k, _)| k).collect();
        f.debug_struct("PolicyComponent").field("bindings", &kinds).finish()
    }
}
