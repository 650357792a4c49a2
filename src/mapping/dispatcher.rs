//! Action Dispatcher - routes transitions to registered effects

use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::mapping::combo::{GroupName, TransitionEvent};
use crate::mapping::ActionError;

pub type ActionCallback = Box<dyn FnMut(&TransitionEvent) -> Result<(), ActionError> + Send>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    pub failed: usize,
    pub unregistered: usize,
}

#[derive(Default)]
pub struct ActionDispatcher {
    registry: HashMap<GroupName, ActionCallback>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the effect for a group, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<GroupName>, callback: F)
    where
        F: FnMut(&TransitionEvent) -> Result<(), ActionError> + Send + 'static,
    {
        let name = name.into();
        debug!("Registering action for {}", name);
        if self.registry.insert(name.clone(), Box::new(callback)).is_some() {
            info!("Replaced action for {}", name);
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// Invoke each registered callback once, in emission order
    ///
    /// Unregistered names are skipped. A failing callback is logged and does not stop
    /// the remaining ones.
    pub fn dispatch(&mut self, transitions: &[TransitionEvent]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for transition in transitions {
            let Some(callback) = self.registry.get_mut(&transition.group) else {
                debug!("No action registered for {}", transition.group);
                report.unregistered += 1;
                continue;
            };

            report.invoked += 1;
            match callback(transition) {
                Ok(()) => debug!(
                    "Dispatched {} (tick {})",
                    transition.group, transition.tick
                ),
                Err(e) => {
                    error!("{}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> ActionCallback {
        let log = log.clone();
        Box::new(move |event: &TransitionEvent| {
            log.lock()
                .unwrap()
                .push(format!("{label}:{}", event.tick));
            Ok(())
        })
    }

    #[test]
    fn dispatches_in_emission_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = ActionDispatcher::new();
        dispatcher.register("skip", recorder(&log, "skip"));
        dispatcher.register("prev", recorder(&log, "prev"));

        let report = dispatcher.dispatch(&[
            TransitionEvent::new("prev", 3),
            TransitionEvent::new("skip", 3),
        ]);

        assert_eq!(report.invoked, 2);
        assert_eq!(*log.lock().unwrap(), vec!["prev:3", "skip:3"]);
    }

    #[test]
    fn unregistered_names_are_ignored() {
        let mut dispatcher = ActionDispatcher::new();
        let report = dispatcher.dispatch(&[TransitionEvent::new("volume_up", 1)]);
        assert_eq!(
            report,
            DispatchReport {
                invoked: 0,
                failed: 0,
                unregistered: 1
            }
        );
    }

    #[test]
    fn failing_callback_does_not_block_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = ActionDispatcher::new();
        dispatcher.register("broken", |event: &TransitionEvent| {
            Err(ActionError::new(event.group.clone(), "sink unavailable"))
        });
        dispatcher.register("skip", recorder(&log, "skip"));

        let report = dispatcher.dispatch(&[
            TransitionEvent::new("broken", 7),
            TransitionEvent::new("skip", 7),
        ]);

        assert_eq!(report.invoked, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(*log.lock().unwrap(), vec!["skip:7"]);
    }
}
