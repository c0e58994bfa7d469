use crate::{apply_action, EditMode, EditState, StoreAction};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Delivered to subscribers after an action has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    pub action: &'static str,
    pub version: u64,
    pub mode: EditMode,
}

type Subscriber = Box<dyn FnMut(&StoreEvent)>;

/// Owned edit state plus change notification.
///
/// Each editor builds its own store. Setters do not validate invariants such
/// as "page order is a permutation"; the controller keeps them.
#[derive(Default)]
pub struct EditStore {
    state: EditState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for EditStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditStore")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn mode(&self) -> EditMode {
        self.state.mode()
    }

    pub fn dispatch(&mut self, action: StoreAction) {
        let name = action.name();
        apply_action(&mut self.state, action);

        let event = StoreEvent { action: name, version: self.state.version, mode: self.state.mode() };
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&event);
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }
}
