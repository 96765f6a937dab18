//! Forwarding policy for 1:1 messages.

/// Whitelist-based forwarding policy.
///
/// The sender list is loaded once at startup and never changes afterwards.
#[derive(Debug, Clone, Default)]
pub struct ForwardPolicy {
    enabled: bool,
    senders: Vec<String>,
}

impl ForwardPolicy {
    /// Create a policy. With `enabled` false every message is forwarded.
    pub fn new(enabled: bool, senders: Vec<String>) -> Self {
        Self { enabled, senders }
    }

    /// Exact-match membership; no case normalization, no resource
    /// stripping.
    fn contains(&self, sender: &str) -> bool {
        self.senders.iter().any(|allowed| allowed == sender)
    }

    /// Whether a 1:1 message from `sender` with body `text` is forwarded to
    /// the notifier.
    ///
    /// With the whitelist enabled, a listed sender still needs a non-empty
    /// body. With the whitelist disabled, empty-text messages are forwarded
    /// as well.
    pub fn should_forward(&self, sender: &str, text: &str) -> bool {
        !self.enabled || (self.contains(sender) && !text.is_empty())
    }
}
