use crate::notification::NotificationId;

/// User responses routed back into the dispatcher loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A duplicate-targets warning was dismissed
    NotificationDismissed(NotificationId),
    /// The user asked not to be warned about duplicate targets again
    NotificationIgnored(NotificationId),
}
