use std::borrow::Cow;
use std::time::Instant;

use log::{self, Level};

/// Logs elapsed time for a scope when dropped.
pub struct ScopedTimer {
    label: Option<Cow<'static, str>>,
    level: Level,
    start: Option<Instant>,
}

impl ScopedTimer {
    pub fn with_level(label: impl Into<Cow<'static, str>>, level: Level) -> Self {
        Self {
            label: Some(label.into()),
            level,
            start: Some(Instant::now()),
        }
    }

    pub fn debug(label: impl Into<Cow<'static, str>>) -> Self {
        Self::with_level(label, Level::Debug)
    }

    /// Builds the label only when debug logging is enabled, so hot paths pay
    /// nothing while it is off.
    pub fn debug_lazy<F>(label_gen: F) -> Self
    where
        F: FnOnce() -> String,
    {
        if log::log_enabled!(Level::Debug) {
            Self {
                label: Some(Cow::Owned(label_gen())),
                level: Level::Debug,
                start: Some(Instant::now()),
            }
        } else {
            Self {
                label: None,
                level: Level::Debug,
                start: None,
            }
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if let (Some(label), Some(start)) = (self.label.take(), self.start) {
            log::log!(self.level, "{} took {:.3?}", label, start.elapsed());
        }
    }
}
