//! Host-facing owner of the state
//!
//! A [`Store`] applies actions strictly in dispatch order, keeps an
//! [`ActionLog`] of what was applied, and tells registered listeners about
//! every new state and every failure.

use std::collections::VecDeque;

use crate::error::EngineError;
use crate::log::{ActionLog, Outcome};
use crate::reducer::action::Action;
use crate::reducer::reduce;
use crate::state::{ErrorAction, State};

/// Notification sent to listeners after an action was processed
#[derive(Debug)]
pub enum StoreEvent<'a> {
    StateChanged(&'a State),
    Error(&'a ErrorAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&StoreEvent) + Send>;

pub struct Store {
    state: State,
    log: ActionLog,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
    queue: VecDeque<Action>,
}

impl Store {
    pub fn new(state: State) -> Self {
        Self {
            state,
            log: ActionLog::new(),
            listeners: Vec::new(),
            next_id: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.log
    }

    pub fn subscribe(&mut self, listener: impl Fn(&StoreEvent) + Send + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false when the id was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Queue an action without applying it
    pub fn enqueue(&mut self, action: Action) {
        self.queue.push_back(action);
    }

    /// Queue `action` and apply everything pending, oldest first
    pub fn dispatch(&mut self, action: Action) {
        self.enqueue(action);
        self.flush();
    }

    /// Dispatch an action given as JSON
    pub fn dispatch_json(&mut self, json: &str) -> Result<(), EngineError> {
        let action: Action = serde_json::from_str(json)?;
        self.dispatch(action);
        Ok(())
    }

    /// Apply all queued actions
    pub fn flush(&mut self) {
        while let Some(action) = self.queue.pop_front() {
            self.apply(action);
        }
    }

    fn apply(&mut self, action: Action) {
        let action_type = action.action_type();
        let previous_error = self.state.error_action.clone();
        let next = reduce(&self.state, action);

        let failed = next.error_action.is_some() && next.error_action != previous_error;
        self.state = next;
        match (&self.state.error_action, failed) {
            (Some(error), true) => {
                self.log.record(action_type, Outcome::Failed(error.message.clone()));
                self.notify(&StoreEvent::Error(error));
            }
            _ => {
                self.log.record(action_type, Outcome::Applied);
                self.notify(&StoreEvent::StateChanged(&self.state));
            }
        }
    }

    fn notify(&self, event: &StoreEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(State::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::data::spectrum::Nucleus;
    use crate::pipeline::FilterKind;
    use crate::test_support::{fid_spectrum, ft_spectrum, init_logger};

    fn recorder(store: &mut Store) -> (SubscriptionId, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let id = store.subscribe(move |event| {
            let name = match event {
                StoreEvent::StateChanged(_) => "changed".to_string(),
                StoreEvent::Error(e) => format!("error:{}", e.action_type),
            };
            sink.lock().unwrap().push(name);
        });
        (id, events)
    }

    #[test]
    fn test_actions_applied_in_order_and_logged() {
        init_logger();
        let mut store = Store::default();
        let (_, events) = recorder(&mut store);

        store.enqueue(Action::LoadSpectra {
            spectra: vec![ft_spectrum("h", Nucleus::H1, &[(2.0, 10.0)])],
        });
        store.enqueue(Action::SetXDomain { x_domain: [1.0, 3.0] });
        assert!(store.state().data.is_empty());
        store.flush();

        assert_eq!(store.state().domain.x_domain, [1.0, 3.0]);
        assert_eq!(*events.lock().unwrap(), vec!["changed", "changed"]);
        let types: Vec<&str> = store.action_log().entries.iter().map(|e| e.action_type.as_str()).collect();
        assert_eq!(types, vec!["LOAD_SPECTRA", "SET_X_DOMAIN"]);
    }

    #[test]
    fn test_failures_reach_listeners_once() {
        init_logger();
        let mut store = Store::default();
        store.dispatch(Action::LoadSpectra {
            spectra: vec![fid_spectrum("fid", 64)],
        });
        let (id, events) = recorder(&mut store);

        store.dispatch(Action::ApplyFilters {
            filters: vec![FilterKind::ZeroFilling { size: 0 }],
            filter_index: None,
        });
        store.dispatch(Action::SetVerticalIndicator { position: Some(1.0) });
        assert_eq!(*events.lock().unwrap(), vec!["error:APPLY_FILTERS", "changed"]);
        assert_eq!(store.action_log().failures().count(), 1);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(Action::ClearError);
        assert_eq!(events.lock().unwrap().len(), 2);
        assert!(store.state().error_action.is_none());
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let mut store = Store::default();
        assert!(matches!(store.dispatch_json("{\"type\": 1}"), Err(EngineError::Json(_))));
        assert!(store.action_log().is_empty());
        store.dispatch_json(r#"{"type": "CLEAR_ERROR"}"#).unwrap();
        assert_eq!(store.action_log().len(), 1);
    }
}
