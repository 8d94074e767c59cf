//! statehouse — shard-partitioned in-memory guild state tracker.
//!
//! For each connected gateway shard this crate ingests the event stream
//! (guild lifecycle, channel/role/emoji/thread mutations, member and
//! presence updates, voice state changes, message create/update/delete) and
//! maintains a read-optimized snapshot of per-guild topology, membership,
//! and a bounded tail of recent messages per channel.
//!
//! Guild topology is published as copy-on-write snapshots
//! ([`GuildSet`]): readers grab a handle under a short read lock and keep
//! using it lock-free; writers copy only the slice they touch. Membership
//! fuses partial event payloads (member without presence, presence without
//! member) into one coherent record per `(guild, user)`. A per-guild
//! single-flight [`Cache`] coalesces fetch-through lookups.
//!
//! Decoding, outbound API calls, and shard dispatch live upstream; this
//! crate consumes already-decoded [`Event`] values through
//! [`InMemoryTracker::handle_event`] and answers queries through the typed
//! accessors.

mod cache;
mod config;
mod error;
mod events;
mod guild_state;
mod message_buffer;
mod model;
mod permissions;
mod shard;
mod tracker;


pub use cache::{Cache, CacheStats, GuildCache};
pub use config::{MessageLimitsFn, TrackerConfig};
pub use error::StateError;
pub use events::{
    EmojisUpdatePayload, Event, GuildDeletePayload, GuildPayload, GuildStub, MemberPayload,
    MemberRemovePayload, MessageDeleteBulkPayload, MessageDeletePayload, MessagePatch,
    MessagePayload, PresencePayload, ReadyPayload, RoleDeletePayload, RolePayload,
    ThreadListSyncPayload, ThreadMemberUpdatePayload, ThreadMembersUpdatePayload,
};
pub use guild_state::GuildSet;
pub use message_buffer::MessageBuffer;
pub use model::{
    snowflake_time, Activity, Attachment, ChannelState, ChannelType, Embed, Emoji, GuildState,
    MemberFields, MemberState, MessageState, OverwriteKind, PermissionOverwrite, PresenceFields,
    PresenceStatus, Role, ThreadMember, ThreadMetadata, User, VoiceState, SNOWFLAKE_EPOCH_MS,
};
pub use permissions::{calculate_permissions, ALL_PERMISSIONS, CHANNEL_PERMS_MASK};
pub use shard::{ShardTracker, WrappedMember};
pub use tracker::InMemoryTracker;

/// Permission bit constants.
pub mod perms {
    pub use crate::permissions::*;
}
