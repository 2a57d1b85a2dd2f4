#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Failure,
}

/// A notice raised by a builder after a save. Screens keep it on top until
/// the next key press.
#[derive(Clone, Debug)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Success, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Failure, message)
    }

    fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.kind == AlertKind::Failure
    }
}
