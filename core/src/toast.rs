use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// Action button attached to a toast. The queue only stores it; the owner of
/// the referenced state performs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ToastAction {
    Undo { label: String },
}

impl ToastAction {
    pub fn undo() -> Self {
        ToastAction::Undo {
            label: "Undo".to_string(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ToastAction::Undo { label } => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Creation time in epoch milliseconds, bumped to stay unique.
    pub id: i64,
    pub message: String,
    pub kind: ToastKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ToastAction>,
}

/// Insertion-ordered notifications. Nothing expires on its own.
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    last_id: i64,
}

impl ToastQueue {
    pub fn add(&mut self, message: impl Into<String>, kind: ToastKind, action: Option<ToastAction>) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let id = now.max(self.last_id + 1);
        self.last_id = id;
        self.toasts.push(Toast {
            id,
            message: message.into(),
            kind,
            action,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> i64 {
        self.add(message, ToastKind::Success, None)
    }

    pub fn error(&mut self, message: impl Into<String>) -> i64 {
        self.add(message, ToastKind::Error, None)
    }

    pub fn info(&mut self, message: impl Into<String>) -> i64 {
        self.add(message, ToastKind::Info, None)
    }

    /// Remove a toast. Unknown ids are ignored.
    pub fn remove(&mut self, id: i64) -> Option<Toast> {
        let idx = self.toasts.iter().position(|t| t.id == id)?;
        Some(self.toasts.remove(idx))
    }

    pub fn find(&self, id: i64) -> Option<&Toast> {
        self.toasts.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Drop the action of a toast, keeping its message. Returns `true` when
    /// an action was removed.
    pub fn strip_action(&mut self, id: i64) -> bool {
        self.toasts
            .iter_mut()
            .find(|t| t.id == id)
            .and_then(|t| t.action.take())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_and_unique_ids() {
        let mut queue = ToastQueue::default();
        let a = queue.success("one");
        let b = queue.error("two");
        let c = queue.add("three", ToastKind::Info, Some(ToastAction::undo()));
        assert!(a < b && b < c);
        let messages: Vec<&str> = queue.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two", "three"]);
        assert_eq!(queue.find(c).and_then(|t| t.action.as_ref()).map(ToastAction::label), Some("Undo"));
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let mut queue = ToastQueue::default();
        let id = queue.info("hello");
        assert!(queue.remove(id + 1000).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.remove(id).map(|t| t.message), Some("hello".to_string()));
        assert!(queue.is_empty());
        assert!(queue.remove(id).is_none());
    }

    #[test]
    fn strip_action_keeps_message() {
        let mut queue = ToastQueue::default();
        let id = queue.add("Event deleted", ToastKind::Info, Some(ToastAction::undo()));
        assert!(queue.strip_action(id));
        assert!(!queue.strip_action(id));
        assert!(!queue.strip_action(id + 1000));
        let toast = queue.find(id).unwrap();
        assert_eq!(toast.message, "Event deleted");
        assert_eq!(toast.action, None);
    }
}
