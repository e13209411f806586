//! Options accepted by `set` on every field state.

/// How a `set` call should be treated.
///
/// Plain user edits use the default. Upstream data arriving from the host
/// is applied with [`SetOptions::refresh`], and programmatic restores with
/// [`SetOptions::reset`]; both bypass the read-only guard and never
/// schedule an auto-save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// The value comes from upstream and becomes the new original.
    pub refreshing: bool,

    /// The value is a restore; normalization is skipped.
    pub resetting: bool,

    /// Whether a real change may notify the auto-save coordinator.
    /// Default: true.
    pub auto_save: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            refreshing: false,
            resetting: false,
            auto_save: true,
        }
    }
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh() -> Self {
        Self {
            refreshing: true,
            ..Self::default()
        }
    }

    pub fn reset() -> Self {
        Self {
            resetting: true,
            ..Self::default()
        }
    }

    pub fn with_auto_save(mut self, enable: bool) -> Self {
        self.auto_save = enable;
        self
    }

    #[inline]
    pub fn bypasses_read_only(&self) -> bool {
        self.refreshing || self.resetting
    }

    #[inline]
    pub fn triggers_auto_save(&self) -> bool {
        self.auto_save && !self.refreshing && !self.resetting
    }

    /// Options forwarded to children of a bulk set. The parent decides
    /// about auto-save once for the whole payload.
    #[inline]
    pub(crate) fn nested(self) -> Self {
        self.with_auto_save(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_a_plain_edit() {
        let options = SetOptions::default();
        assert!(!options.bypasses_read_only());
        assert!(options.triggers_auto_save());
    }

    #[test]
    fn test_refresh_and_reset_bypass_guards() {
        assert!(SetOptions::refresh().bypasses_read_only());
        assert!(!SetOptions::refresh().triggers_auto_save());
        assert!(SetOptions::reset().bypasses_read_only());
        assert!(!SetOptions::reset().triggers_auto_save());
        assert!(!SetOptions::new().with_auto_save(false).triggers_auto_save());
    }
}
