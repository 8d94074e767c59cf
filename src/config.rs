use std::sync::Arc;
use std::time::Duration;

/// Per-guild override for the message retention limits.
/// Returns `(max_count, max_age)`; `None` disables the respective cap.
pub type MessageLimitsFn = dyn Fn(u64) -> (Option<usize>, Option<Duration>) + Send + Sync;

/// Tracker configuration. The host application owns loading; the tracker
/// only reads these values.
#[derive(Clone, Default)]
pub struct TrackerConfig {
    /// Default max number of messages kept per channel. `None` disables the
    /// count cap.
    pub channel_message_len: Option<usize>,

    /// Default max age of messages kept per channel. `None` disables the
    /// age cap.
    pub channel_message_dur: Option<Duration>,

    /// Per-guild override of the two limits above.
    pub channel_message_limits: Option<Arc<MessageLimitsFn>>,

    /// Members whose presence is offline (or unset) for longer than this are
    /// evicted from the member cache. `None` disables offline eviction.
    pub remove_offline_members_after: Option<Duration>,

    /// The bot's own user id, used for thread-membership bookkeeping and to
    /// keep the GC from evicting ourselves.
    pub bot_member_id: u64,

    /// Eviction horizon for the per-guild request caches.
    pub cache_expiry: Duration,

    /// When set, message deletes flag the stored message as deleted instead
    /// of dropping it from the buffer.
    pub keep_deleted_messages: bool,
}

impl TrackerConfig {
    /// A set of common defaults: no message caps, 60s cache expiry, deleted
    /// messages retained with a flag.
    pub fn new() -> Self {
        Self {
            channel_message_len: None,
            channel_message_dur: None,
            channel_message_limits: None,
            remove_offline_members_after: None,
            bot_member_id: 0,
            cache_expiry: Duration::from_secs(60),
            keep_deleted_messages: true,
        }
    }

    /// Resolve the message limits for a guild, consulting the per-guild
    /// override when one is configured.
    pub fn message_limits(&self, guild_id: u64) -> (Option<usize>, Option<Duration>) {
        if let Some(f) = &self.channel_message_limits {
            return f(guild_id);
        }

        (self.channel_message_len, self.channel_message_dur)
    }
}

impl std::fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("channel_message_len", &self.channel_message_len)
            .field("channel_message_dur", &self.channel_message_dur)
            .field(
                "channel_message_limits",
                &self.channel_message_limits.as_ref().map(|_| "<fn>"),
            )
            .field(
                "remove_offline_members_after",
                &self.remove_offline_members_after,
            )
            .field("bot_member_id", &self.bot_member_id)
            .field("cache_expiry", &self.cache_expiry)
            .field("keep_deleted_messages", &self.keep_deleted_messages)
            .finish()
    }
}
