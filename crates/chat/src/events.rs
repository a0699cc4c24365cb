use parley_storage::MessageId;

/// Rendering side effect requested by a controller after it mutates the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    /// An append happened; the view follows the newest message.
    ScrollToNewest,
    /// Older history was revealed; the view jumps to the oldest newly shown message.
    ScrollToOldestRevealed { message_id: MessageId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient notification for the presentation layer to surface and forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Inline validation failure attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}
