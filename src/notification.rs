use std::collections::BTreeSet;

use tokio::sync::mpsc;

use crate::actions::Action;

/// Handle of one duplicate-targets warning shown by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(pub u64);

/// Visibility of the duplicate-targets warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationState {
    /// Nothing is shown
    #[default]
    Idle,
    /// A warning is on screen
    Shown(NotificationId),
    /// The user opted out; nothing will be shown again
    Muted,
}

/// Lets the host report what the user did with a warning.
#[derive(Debug, Clone)]
pub struct NotificationResponder {
    id: NotificationId,
    actions: mpsc::UnboundedSender<Action>,
}

impl NotificationResponder {
    pub(crate) fn new(id: NotificationId, actions: mpsc::UnboundedSender<Action>) -> Self {
        Self { id, actions }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    /// The warning went away
    pub fn dismissed(&self) {
        let _ = self.actions.send(Action::NotificationDismissed(self.id));
    }

    /// The user clicked "Ignore"
    pub fn ignored(&self) {
        let _ = self.actions.send(Action::NotificationIgnored(self.id));
    }
}

/// Decides when a duplicate-targets warning may be shown.
///
/// At most one warning is visible at a time and muting is permanent for the
/// lifetime of this instance.
#[derive(Debug, Default)]
pub struct DuplicateTargetsNotifier {
    state: NotificationState,
    next_id: u64,
}

impl DuplicateTargetsNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NotificationState {
        self.state
    }

    /// Offer a fresh duplicate set. Returns the handle of a warning the host
    /// must now show, or `None` when nothing should be shown.
    pub fn offer(&mut self, duplicates: &BTreeSet<String>) -> Option<NotificationId> {
        if duplicates.is_empty() || self.state != NotificationState::Idle {
            return None;
        }

        let id = NotificationId(self.next_id);
        self.next_id += 1;
        self.state = NotificationState::Shown(id);
        Some(id)
    }

    /// Apply a user response coming back from the host
    pub fn handle(&mut self, action: Action) {
        match action {
            Action::NotificationDismissed(id) => {
                if self.state == NotificationState::Shown(id) {
                    self.state = NotificationState::Idle;
                }
            }
            Action::NotificationIgnored(_) => {
                self.state = NotificationState::Muted;
            }
        }
    }
}

/// "a, b, c" in the set's order
pub fn format_duplicate_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    ids.into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
