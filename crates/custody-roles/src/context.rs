use std::sync::Arc;

use custody_types::{AuditEvent, Clock, ComponentId, CustodyEvent, EventSink, Ledger};

use crate::access::AccessControl;

/// Collaborators injected into every custody component.
#[derive(Clone)]
pub struct CustodyContext {
    pub access: Arc<dyn AccessControl>,
    pub ledger: Arc<dyn Ledger>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

impl CustodyContext {
    pub fn new(
        access: Arc<dyn AccessControl>,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            access,
            ledger,
            clock,
            events,
        }
    }

    /// Stamp and deliver an audit event for `component`.
    pub fn emit(&self, component: &ComponentId, event: CustodyEvent) {
        self.events
            .emit(AuditEvent::new(component.clone(), self.clock.now(), event));
    }
}

impl std::fmt::Debug for CustodyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodyContext").finish_non_exhaustive()
    }
}
