/*!
 * Progress notifications for completed groups.
 *
 * An observer is registered on a shared slot, so it can be set or replaced
 * after the chain is built. The regroup stage reports each completed group
 * through an `OrderedEmitter`, which holds back groups that finish early and
 * delivers them in submission order.
 */

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::PipelineError;

/// Callback receiving one completed group's translations
pub type ProgressObserver = Arc<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// Shared, replaceable observer registration
#[derive(Clone, Default)]
pub struct ObserverSlot {
    inner: Arc<RwLock<Option<ProgressObserver>>>,
}

impl std::fmt::Debug for ObserverSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSlot")
            .field("registered", &self.is_set())
            .finish()
    }
}

impl ObserverSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, observer: ProgressObserver) {
        *self.inner.write() = Some(observer);
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }

    /// The observer registered right now
    pub fn current(&self) -> Option<ProgressObserver> {
        self.inner.read().clone()
    }
}

#[derive(Default)]
struct EmitterState {
    next: usize,
    pending: BTreeMap<usize, Vec<String>>,
}

/// Delivers completed groups to an observer in group order
pub struct OrderedEmitter {
    observer: Option<ProgressObserver>,
    state: Mutex<EmitterState>,
}

impl OrderedEmitter {
    pub fn new(observer: Option<ProgressObserver>) -> Self {
        Self {
            observer,
            state: Mutex::new(EmitterState::default()),
        }
    }

    /// Record group `index` as done and emit every group now in sequence
    ///
    /// An observer error aborts with `PipelineError::Observer`.
    pub fn complete(&self, index: usize, results: &[String]) -> Result<(), PipelineError> {
        let Some(observer) = &self.observer else {
            return Ok(());
        };

        let mut state = self.state.lock();
        state.pending.insert(index, results.to_vec());

        loop {
            let next = state.next;
            let Some(ready) = state.pending.remove(&next) else {
                break;
            };
            state.next += 1;
            observer(&ready).map_err(|e| PipelineError::Observer(e.to_string()))?;
        }
        Ok(())
    }
}
