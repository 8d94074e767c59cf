//! The tracker facade: shard routing, typed read accessors, and the
//! background GC workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::GuildCache;
use crate::config::TrackerConfig;
use crate::error::StateError;
use crate::events::Event;
use crate::guild_state::GuildSet;
use crate::model::{ChannelState, Emoji, MemberState, MessageState, Role, VoiceState};
use crate::shard::ShardTracker;

/// Shard-partitioned in-memory state store.
///
/// Events enter through [`handle_event`](Self::handle_event) with the shard
/// they arrived on; accessors route by guild id. Everything returned is
/// either an immutable snapshot handle or a defensive copy — safe to read,
/// never meant to be written.
pub struct InMemoryTracker {
    shards: Vec<Arc<ShardTracker>>,
    conf: Arc<TrackerConfig>,
}

impl InMemoryTracker {
    /// Create a tracker with `shard_count` independent shards.
    pub fn new(conf: TrackerConfig, shard_count: u32) -> Self {
        assert!(shard_count > 0, "tracker needs at least one shard");

        let conf = Arc::new(conf);
        let shards = (0..shard_count)
            .map(|id| Arc::new(ShardTracker::new(conf.clone(), id)))
            .collect();

        Self { shards, conf }
    }

    pub fn shard_count(&self) -> u32 {
        self.shards.len() as u32
    }

    /// Apply one gateway event on the shard it was received from. Events
    /// from a single shard are applied in arrival order.
    pub fn handle_event(&self, shard_id: u32, event: Event) {
        if let Some(shard) = self.shards.get(shard_id as usize) {
            shard.handle_event(event);
        }
    }

    /// The shard a guild hashes to: `(guild_id >> 22) % shard_count`, the
    /// same mapping the gateway uses to assign guilds to shards.
    fn guild_shard(&self, guild_id: u64) -> &Arc<ShardTracker> {
        let index = ((guild_id >> 22) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The guild's current snapshot handle. Cheap to clone and remains
    /// valid (and unchanging) after later events publish newer snapshots.
    pub fn get_guild(&self, guild_id: u64) -> Option<GuildSet> {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();
        state.guilds.get(&guild_id).cloned()
    }

    /// Snapshot handles for every guild currently tracked on a shard.
    pub fn get_shard_guilds(&self, shard_id: u32) -> Vec<GuildSet> {
        let Some(shard) = self.shards.get(shard_id as usize) else {
            return Vec::new();
        };

        let state = shard.state.read().unwrap();
        state.guilds.values().cloned().collect()
    }

    pub fn get_channel(&self, guild_id: u64, channel_id: u64) -> Option<ChannelState> {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();
        state
            .guilds
            .get(&guild_id)
            .and_then(|gs| gs.channel(channel_id))
            .cloned()
    }

    pub fn get_role(&self, guild_id: u64, role_id: u64) -> Option<Role> {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();
        state
            .guilds
            .get(&guild_id)
            .and_then(|gs| gs.role(role_id))
            .cloned()
    }

    pub fn get_emoji(&self, guild_id: u64, emoji_id: u64) -> Option<Emoji> {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();
        state
            .guilds
            .get(&guild_id)
            .and_then(|gs| gs.emoji(emoji_id))
            .cloned()
    }

    pub fn get_voice_state(&self, guild_id: u64, user_id: u64) -> Option<VoiceState> {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();
        state
            .guilds
            .get(&guild_id)
            .and_then(|gs| gs.voice_state(user_id))
            .cloned()
    }

    pub fn get_member(&self, guild_id: u64, user_id: u64) -> Option<MemberState> {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();
        state
            .members
            .get(&guild_id)
            .and_then(|members| members.get(&user_id))
            .map(|wrapped| wrapped.member.clone())
    }

    /// Effective permissions of a tracked member. `channel_id = 0` skips
    /// channel overwrites. Returns `(0, false)` when the guild or member is
    /// unknown, and `(partial, false)` when a non-zero channel id is not in
    /// the snapshot.
    pub fn get_member_permissions(
        &self,
        guild_id: u64,
        channel_id: u64,
        user_id: u64,
    ) -> (u64, bool) {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();

        let Some(wrapped) = state
            .members
            .get(&guild_id)
            .and_then(|members| members.get(&user_id))
        else {
            return (0, false);
        };
        let Some(gs) = state.guilds.get(&guild_id) else {
            return (0, false);
        };

        gs.member_permissions(channel_id, user_id, &wrapped.member.roles)
    }

    /// Like [`get_member_permissions`](Self::get_member_permissions) but
    /// with a caller-supplied role set, for members not in state.
    pub fn get_role_permissions(
        &self,
        guild_id: u64,
        channel_id: u64,
        user_id: u64,
        roles: &[u64],
    ) -> (u64, bool) {
        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();

        match state.guilds.get(&guild_id) {
            Some(gs) => gs.member_permissions(channel_id, user_id, roles),
            None => (0, false),
        }
    }

    /// Up to `limit` messages from the channel's tail with id below
    /// `before`, newest last. Zero disables either bound. The passed buffer
    /// is cleared and reused when its capacity suffices.
    pub fn get_messages(
        &self,
        guild_id: u64,
        channel_id: u64,
        before: u64,
        limit: usize,
        mut buf: Vec<MessageState>,
    ) -> Vec<MessageState> {
        buf.clear();

        let shard = self.guild_shard(guild_id);
        let state = shard.state.read().unwrap();
        if let Some(buffer) = state.messages.get(&channel_id) {
            buffer.collect_recent(before, limit, &mut buf);
        }

        buf
    }

    /// Call `f` with chunks of the guild's members until it returns false
    /// or the members run out. `f` is never invoked concurrently, so it may
    /// mutate caller-local state freely; this implementation delivers one
    /// chunk. `f` is not called at all when the guild has no members.
    pub fn iterate_members(&self, guild_id: u64, mut f: impl FnMut(&[MemberState]) -> bool) {
        let members: Vec<MemberState> = {
            let shard = self.guild_shard(guild_id);
            let state = shard.state.read().unwrap();
            state
                .members
                .get(&guild_id)
                .map(|members| members.values().map(|w| w.member.clone()).collect())
                .unwrap_or_default()
        };

        if members.is_empty() {
            return;
        }

        f(&members);
    }

    /// The guild's request-coalescing cache, created on first use. Caches
    /// exist only for tracked guilds and die with them.
    pub fn guild_cache(&self, guild_id: u64) -> Result<Arc<GuildCache>, StateError> {
        let shard = self.guild_shard(guild_id);

        let tracked = {
            let state = shard.state.read().unwrap();
            state.guilds.contains_key(&guild_id)
        };
        if !tracked {
            return Err(StateError::GuildNotFound { guild_id });
        }

        Ok(shard
            .caches
            .entry(guild_id)
            .or_insert_with(|| Arc::new(GuildCache::new()))
            .clone())
    }

    // ── GC ──────────────────────────────────────────────────────────

    /// Start one background GC worker per shard. Each tick the worker
    /// sweeps a round-robin batch of guilds sized so that a 10ms interval
    /// walks the whole shard about once a minute; per guild it evicts cache
    /// entries past `cache_expiry` and, when configured, members that have
    /// sat offline past `remove_offline_members_after`. The shard lock is
    /// only held for the guild being processed.
    ///
    /// Note the workers are per shard: ten shards at a 1s interval means
    /// ten guilds swept per second overall.
    pub fn run_gc_loop(&self, interval: Duration) -> Vec<JoinHandle<()>> {
        info!(
            shards = self.shards.len(),
            ?interval,
            cache_expiry = ?self.conf.cache_expiry,
            "starting gc workers"
        );

        self.shards
            .iter()
            .map(|shard| {
                let shard = Arc::clone(shard);
                tokio::spawn(async move {
                    gc_worker(shard, interval).await;
                })
            })
            .collect()
    }
}

async fn gc_worker(shard: Arc<ShardTracker>, interval: Duration) {
    let mut cursor = 0usize;
    loop {
        tokio::time::sleep(interval).await;

        let ids = shard.guild_ids();
        if ids.is_empty() {
            continue;
        }

        // Full sweep target is one minute at a 10ms tick.
        let batch = (ids.len() / (60 * 100)).max(1);
        for _ in 0..batch {
            cursor %= ids.len();
            let guild_id = ids[cursor];
            cursor += 1;

            shard.run_guild_gc(guild_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        GuildDeletePayload, GuildPayload, GuildStub, MemberPayload, MemberRemovePayload,
        MessagePayload, PresencePayload, ReadyPayload, RoleDeletePayload, RolePayload,
        ThreadListSyncPayload, ThreadMemberUpdatePayload, ThreadMembersUpdatePayload,
    };
    use crate::model::{
        ChannelType, PresenceStatus, ThreadMember, ThreadMetadata, User,
    };

    const GUILD_ID: u64 = 1;
    const CHANNEL_ID: u64 = 10;
    const THREAD_ID: u64 = 10_000;
    const SECOND_THREAD_ID: u64 = 50;
    const ROLE_ID: u64 = 100;
    const MEMBER_ID: u64 = 1_000;
    const BOT_ID: u64 = 100_000;

    fn test_channel(guild_id: u64, id: u64) -> ChannelState {
        ChannelState {
            id,
            guild_id,
            name: format!("test channel-{id}"),
            kind: ChannelType::Text,
            ..Default::default()
        }
    }

    fn test_thread(guild_id: u64, id: u64) -> ChannelState {
        ChannelState {
            id,
            guild_id,
            parent_id: CHANNEL_ID,
            name: format!("test thread-{id}"),
            kind: ChannelType::PublicThread,
            thread_metadata: Some(ThreadMetadata { archived: false }),
            ..Default::default()
        }
    }

    fn test_user(id: u64) -> User {
        User {
            id,
            username: format!("test member-{id}"),
            discriminator: "0000".into(),
            ..Default::default()
        }
    }

    fn test_member(guild_id: u64, id: u64, roles: Vec<u64>) -> MemberPayload {
        MemberPayload {
            guild_id,
            user: test_user(id),
            roles,
            ..Default::default()
        }
    }

    fn test_tracker() -> InMemoryTracker {
        let mut conf = TrackerConfig::new();
        conf.bot_member_id = BOT_ID;
        let tracker = InMemoryTracker::new(conf, 1);

        tracker.handle_event(
            0,
            Event::GuildCreate(Box::new(GuildPayload {
                id: GUILD_ID,
                name: "test guild".into(),
                owner_id: MEMBER_ID,
                member_count: 1,
                members: vec![test_member(0, MEMBER_ID, vec![ROLE_ID])],
                presences: vec![PresencePayload {
                    user: test_user(MEMBER_ID),
                    status: PresenceStatus::Online,
                    ..Default::default()
                }],
                channels: vec![test_channel(0, CHANNEL_ID)],
                threads: vec![test_thread(0, THREAD_ID)],
                roles: vec![Role {
                    id: ROLE_ID,
                    ..Default::default()
                }],
                ..Default::default()
            })),
        );

        tracker
    }

    fn threads_index_contains(tracker: &InMemoryTracker, thread_id: u64) -> bool {
        let shard = tracker.guild_shard(GUILD_ID);
        let state = shard.state.read().unwrap();
        state.threads_to_guild.contains_key(&thread_id)
    }

    #[test]
    fn test_guild_create() {
        let tracker = test_tracker();

        let ms = tracker.get_member(GUILD_ID, MEMBER_ID).expect("member");
        assert!(ms.member.is_some());
        assert!(ms.presence.is_some());

        let gs = tracker.get_guild(GUILD_ID).expect("guild");
        assert!(gs.role(ROLE_ID).is_some());
        assert!(gs.channel(CHANNEL_ID).is_some());
        assert!(gs.channel(THREAD_ID).is_some());
        assert_eq!(gs.guild.member_count, 1);

        assert!(threads_index_contains(&tracker, THREAD_ID));
    }

    #[test]
    fn test_guild_delete() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::GuildDelete(GuildDeletePayload {
                id: GUILD_ID,
                unavailable: false,
            }),
        );

        assert!(tracker.get_guild(GUILD_ID).is_none());
        assert!(tracker.get_member(GUILD_ID, MEMBER_ID).is_none());
        assert!(!threads_index_contains(&tracker, THREAD_ID));
        assert_eq!(
            tracker.guild_cache(GUILD_ID),
            Err(StateError::GuildNotFound { guild_id: GUILD_ID })
        );
    }

    #[test]
    fn test_guild_delete_unavailable_keeps_state() {
        let tracker = test_tracker();
        let before = tracker.get_guild(GUILD_ID).expect("guild");

        tracker.handle_event(
            0,
            Event::GuildDelete(GuildDeletePayload {
                id: GUILD_ID,
                unavailable: true,
            }),
        );

        let after = tracker.get_guild(GUILD_ID).expect("guild");
        assert!(!after.guild.available);
        assert_eq!(after.guild.member_count, before.guild.member_count);
        // Everything but the scalar still aliases the previous snapshot.
        assert!(Arc::ptr_eq(&before.channels, &after.channels));
        assert!(Arc::ptr_eq(&before.roles, &after.roles));
        assert!(tracker.get_member(GUILD_ID, MEMBER_ID).is_some());
    }

    #[test]
    fn test_nonexistent_lookups() {
        let tracker = test_tracker();

        assert!(tracker.get_member(GUILD_ID, 10_001).is_none());
        assert!(tracker.get_guild(2).is_none());
        assert!(tracker.get_channel(GUILD_ID, 999).is_none());
        assert!(tracker.get_role(GUILD_ID, 999).is_none());
        assert!(tracker.get_emoji(GUILD_ID, 999).is_none());
    }

    #[test]
    fn test_member_add_and_remove() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::GuildMemberAdd(test_member(GUILD_ID, 1_001, vec![])),
        );

        let ms = tracker.get_member(GUILD_ID, 1_001).expect("member");
        assert!(ms.member.is_some());
        assert!(ms.presence.is_none());
        assert_eq!(tracker.get_guild(GUILD_ID).unwrap().guild.member_count, 2);

        tracker.handle_event(
            0,
            Event::GuildMemberRemove(MemberRemovePayload {
                guild_id: GUILD_ID,
                user: test_user(1_001),
            }),
        );

        assert!(tracker.get_member(GUILD_ID, 1_001).is_none());
        assert_eq!(tracker.get_guild(GUILD_ID).unwrap().guild.member_count, 1);
    }

    #[test]
    fn test_guild_update_preserves_member_count() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::GuildUpdate(Box::new(GuildPayload {
                id: GUILD_ID,
                name: "renamed guild".into(),
                owner_id: MEMBER_ID,
                // The update payload carries no member count.
                member_count: 0,
                ..Default::default()
            })),
        );

        let gs = tracker.get_guild(GUILD_ID).expect("guild");
        assert_eq!(gs.guild.name, "renamed guild");
        assert_eq!(gs.guild.member_count, 1);
        assert!(gs.channel(CHANNEL_ID).is_some());
    }

    #[test]
    fn test_channel_update() {
        let tracker = test_tracker();

        let mut updated = test_channel(GUILD_ID, CHANNEL_ID);
        updated.name = "this is a new name!".into();
        tracker.handle_event(0, Event::ChannelUpdate(updated));

        let channel = tracker.get_channel(GUILD_ID, CHANNEL_ID).expect("channel");
        assert_eq!(channel.name, "this is a new name!");
    }

    #[test]
    fn test_thread_update() {
        let tracker = test_tracker();

        let mut updated = test_thread(GUILD_ID, THREAD_ID);
        updated.name = "this is a new name!".into();
        tracker.handle_event(0, Event::ThreadUpdate(updated));

        let thread = tracker.get_channel(GUILD_ID, THREAD_ID).expect("thread");
        assert_eq!(thread.name, "this is a new name!");
    }

    #[test]
    fn test_role_update() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::GuildRoleUpdate(RolePayload {
                guild_id: GUILD_ID,
                role: Role {
                    id: ROLE_ID,
                    name: "new role name!".into(),
                    ..Default::default()
                },
            }),
        );

        let role = tracker.get_role(GUILD_ID, ROLE_ID).expect("role");
        assert_eq!(role.name, "new role name!");
    }

    #[test]
    fn test_role_delete() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::GuildRoleDelete(RoleDeletePayload {
                guild_id: GUILD_ID,
                role_id: ROLE_ID,
            }),
        );

        assert!(tracker.get_role(GUILD_ID, ROLE_ID).is_none());
    }

    #[test]
    fn test_thread_events() {
        let tracker = test_tracker();

        // Sync that includes our member record for the existing thread.
        tracker.handle_event(
            0,
            Event::ThreadListSync(ThreadListSyncPayload {
                guild_id: GUILD_ID,
                channel_ids: vec![CHANNEL_ID],
                members: vec![ThreadMember {
                    id: THREAD_ID,
                    user_id: BOT_ID,
                    flags: 1 << 1,
                    ..Default::default()
                }],
                threads: vec![test_thread(GUILD_ID, THREAD_ID)],
            }),
        );

        let thread = tracker.get_channel(GUILD_ID, THREAD_ID).expect("thread");
        assert!(thread.member.is_some());

        // Sync with the parent listed but no threads: stale unarchived
        // threads of that parent are cleared.
        tracker.handle_event(
            0,
            Event::ThreadListSync(ThreadListSyncPayload {
                guild_id: GUILD_ID,
                channel_ids: vec![CHANNEL_ID],
                ..Default::default()
            }),
        );

        assert!(tracker.get_channel(GUILD_ID, THREAD_ID).is_none());
        assert!(!threads_index_contains(&tracker, THREAD_ID));

        // Sync that introduces a brand-new thread.
        tracker.handle_event(
            0,
            Event::ThreadListSync(ThreadListSyncPayload {
                guild_id: GUILD_ID,
                threads: vec![ChannelState {
                    id: SECOND_THREAD_ID,
                    guild_id: GUILD_ID,
                    kind: ChannelType::PublicThread,
                    ..Default::default()
                }],
                ..Default::default()
            }),
        );
        assert!(threads_index_contains(&tracker, SECOND_THREAD_ID));

        // Thread member update carries no guild id; the index resolves it.
        tracker.handle_event(
            0,
            Event::ThreadMemberUpdate(ThreadMemberUpdatePayload {
                member: ThreadMember {
                    id: SECOND_THREAD_ID,
                    user_id: BOT_ID,
                    flags: 1 << 2,
                    ..Default::default()
                },
            }),
        );
        let member = tracker
            .get_channel(GUILD_ID, SECOND_THREAD_ID)
            .and_then(|c| c.member)
            .expect("bot thread member");
        assert_eq!(member.flags, 1 << 2);

        // Members update: bot added.
        tracker.handle_event(
            0,
            Event::ThreadMembersUpdate(ThreadMembersUpdatePayload {
                id: SECOND_THREAD_ID,
                guild_id: GUILD_ID,
                member_count: 3,
                added_members: vec![ThreadMember {
                    id: SECOND_THREAD_ID,
                    user_id: BOT_ID,
                    flags: 1 << 3,
                    ..Default::default()
                }],
                ..Default::default()
            }),
        );
        let thread = tracker
            .get_channel(GUILD_ID, SECOND_THREAD_ID)
            .expect("thread");
        assert_eq!(thread.member_count, 3);
        assert_eq!(thread.member.as_ref().map(|m| m.flags), Some(1 << 3));

        // Members update: bot removed.
        tracker.handle_event(
            0,
            Event::ThreadMembersUpdate(ThreadMembersUpdatePayload {
                id: SECOND_THREAD_ID,
                guild_id: GUILD_ID,
                removed_member_ids: vec![BOT_ID],
                ..Default::default()
            }),
        );
        let thread = tracker
            .get_channel(GUILD_ID, SECOND_THREAD_ID)
            .expect("thread");
        assert!(thread.member.is_none());

        // Thread delete clears the channel, its messages, and the index.
        tracker.handle_event(
            0,
            Event::ThreadDelete(ChannelState {
                id: SECOND_THREAD_ID,
                guild_id: GUILD_ID,
                kind: ChannelType::PublicThread,
                ..Default::default()
            }),
        );
        assert!(tracker.get_channel(GUILD_ID, SECOND_THREAD_ID).is_none());
        assert!(!threads_index_contains(&tracker, SECOND_THREAD_ID));
    }

    #[test]
    fn test_emojis_update() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::GuildEmojisUpdate(crate::events::EmojisUpdatePayload {
                guild_id: GUILD_ID,
                emojis: vec![Emoji {
                    id: 77,
                    name: "blob".into(),
                    animated: false,
                }],
            }),
        );

        assert_eq!(
            tracker.get_emoji(GUILD_ID, 77).map(|e| e.name),
            Some("blob".into())
        );
    }

    #[test]
    fn test_ready_resets_shard() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::Ready(ReadyPayload {
                guilds: vec![
                    GuildStub {
                        id: 2,
                        unavailable: false,
                    },
                    GuildStub {
                        id: 3,
                        unavailable: true,
                    },
                ],
            }),
        );

        // The old guild is gone, the stubs are seeded.
        assert!(tracker.get_guild(GUILD_ID).is_none());
        assert!(tracker.get_member(GUILD_ID, MEMBER_ID).is_none());
        assert!(tracker.get_guild(2).expect("stub").guild.available);
        assert!(!tracker.get_guild(3).expect("stub").guild.available);
        assert_eq!(tracker.get_shard_guilds(0).len(), 2);
    }

    #[test]
    fn test_shard_routing() {
        let tracker = InMemoryTracker::new(TrackerConfig::new(), 4);

        for shard_id in 0..4u64 {
            let guild_id = shard_id << 22;
            tracker.handle_event(
                shard_id as u32,
                Event::GuildCreate(Box::new(GuildPayload {
                    id: guild_id,
                    name: format!("guild on shard {shard_id}"),
                    ..Default::default()
                })),
            );
        }

        for shard_id in 0..4u32 {
            let guild_id = (shard_id as u64) << 22;
            assert!(tracker.get_guild(guild_id).is_some());
            let guilds = tracker.get_shard_guilds(shard_id);
            assert_eq!(guilds.len(), 1);
            assert_eq!(guilds[0].guild.id, guild_id);
        }

        assert!(tracker.get_shard_guilds(99).is_empty());
    }

    #[test]
    fn test_iterate_members_single_chunk() {
        let tracker = test_tracker();
        tracker.handle_event(
            0,
            Event::GuildMemberAdd(test_member(GUILD_ID, 1_001, vec![])),
        );

        let mut seen = Vec::new();
        let mut calls = 0;
        tracker.iterate_members(GUILD_ID, |chunk| {
            calls += 1;
            seen.extend(chunk.iter().map(|m| m.user.id));
            true
        });

        assert_eq!(calls, 1);
        seen.sort_unstable();
        assert_eq!(seen, vec![MEMBER_ID, 1_001]);

        // No members, no calls.
        tracker.iterate_members(999, |_| panic!("must not be called"));
    }

    #[test]
    fn test_guild_cache_roundtrip_and_gc() {
        let mut conf = TrackerConfig::new();
        conf.cache_expiry = Duration::ZERO;
        let tracker = InMemoryTracker::new(conf, 1);
        tracker.handle_event(
            0,
            Event::GuildCreate(Box::new(GuildPayload {
                id: GUILD_ID,
                ..Default::default()
            })),
        );

        let cache = tracker.guild_cache(GUILD_ID).expect("cache");
        cache.set(5, "user", Arc::new(String::from("cached value")));

        let value = cache.get(&5).expect("value");
        let downcast = value.downcast_ref::<String>().expect("string");
        assert_eq!(downcast, "cached value");

        // The same handle comes back for the same guild.
        let again = tracker.guild_cache(GUILD_ID).expect("cache");
        assert!(Arc::ptr_eq(&cache, &again));

        // A zero expiry sweep clears everything previously created.
        std::thread::sleep(Duration::from_millis(5));
        let shard = tracker.guild_shard(GUILD_ID);
        assert_eq!(shard.run_guild_gc(GUILD_ID), 1);
        assert!(cache.get(&5).is_none());
    }

    #[tokio::test]
    async fn test_gc_loop_sweeps_caches() {
        let mut conf = TrackerConfig::new();
        conf.cache_expiry = Duration::ZERO;
        let tracker = InMemoryTracker::new(conf, 1);
        tracker.handle_event(
            0,
            Event::GuildCreate(Box::new(GuildPayload {
                id: GUILD_ID,
                ..Default::default()
            })),
        );

        let cache = tracker.guild_cache(GUILD_ID).expect("cache");
        cache.set(5, "user", Arc::new(1u64));

        let handles = tracker.run_gc_loop(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get(&5).is_none());
        for handle in handles {
            handle.abort();
        }
    }

    #[test]
    fn test_messages_dropped_with_their_channel() {
        let tracker = test_tracker();

        tracker.handle_event(
            0,
            Event::MessageCreate(Box::new(MessagePayload {
                id: 1,
                channel_id: CHANNEL_ID,
                guild_id: GUILD_ID,
                author: test_user(MEMBER_ID),
                content: "about to be orphaned".into(),
                ..Default::default()
            })),
        );
        assert_eq!(
            tracker
                .get_messages(GUILD_ID, CHANNEL_ID, 0, 0, Vec::new())
                .len(),
            1
        );

        tracker.handle_event(0, Event::ChannelDelete(test_channel(GUILD_ID, CHANNEL_ID)));

        assert!(tracker.get_channel(GUILD_ID, CHANNEL_ID).is_none());
        assert!(tracker
            .get_messages(GUILD_ID, CHANNEL_ID, 0, 0, Vec::new())
            .is_empty());
    }
}
