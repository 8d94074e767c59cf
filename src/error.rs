use thiserror::Error;

/// Errors surfaced by the tracker's fallible lookups.
///
/// Plain absence is reported as `None` by the accessors; these variants exist
/// for the paths that need to say *what* was missing (cache handles, the
/// partial-success flag of the permission queries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("guild {guild_id} is not tracked on this shard")]
    GuildNotFound { guild_id: u64 },

    #[error("channel {channel_id} is not in the guild snapshot")]
    ChannelNotFound { channel_id: u64 },
}
