//! Copy-on-write guild snapshots.
//!
//! A [`GuildSet`] is immutable after publication: every mutation produces a
//! new outer record, and only the targeted slice is actually reallocated.
//! The other slices keep aliasing the previous snapshot, so readers holding
//! an old handle keep seeing a fully consistent guild at O(1) cost, and
//! writers pay O(len) only for the slice they touch.

use std::sync::Arc;

use crate::error::StateError;
use crate::model::{
    ChannelState, Emoji, GuildState, PermissionOverwrite, Role, VoiceState,
};
use crate::permissions::calculate_permissions;

/// One guild's published snapshot: the scalar record plus the four
/// independently-copied slices. Cloning a `GuildSet` is cheap (five
/// reference bumps) and the result stays valid after the shard lock is
/// released; treat everything it exposes as read-only.
#[derive(Debug, Clone)]
pub struct GuildSet {
    pub guild: Arc<GuildState>,
    pub channels: Arc<[ChannelState]>,
    pub roles: Arc<[Role]>,
    pub emojis: Arc<[Emoji]>,
    pub voice_states: Arc<[VoiceState]>,
}

impl GuildSet {
    /// Assemble a snapshot from already-normalized parts. Channel and role
    /// ordering is the caller's responsibility.
    pub(crate) fn new(
        guild: GuildState,
        channels: Vec<ChannelState>,
        roles: Vec<Role>,
        emojis: Vec<Emoji>,
        voice_states: Vec<VoiceState>,
    ) -> Self {
        Self {
            guild: Arc::new(guild),
            channels: channels.into(),
            roles: roles.into(),
            emojis: emojis.into(),
            voice_states: voice_states.into(),
        }
    }

    /// A snapshot holding only the scalar record, used for guild stubs
    /// seeded from the ready payload.
    pub(crate) fn stub(guild: GuildState) -> Self {
        Self::new(guild, Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    // ── Copy-on-write mutators ──────────────────────────────────────
    //
    // Each returns a new snapshot whose targeted part was cloned and passed
    // through `f`; everything else aliases `self`.

    pub(crate) fn with_guild(&self, f: impl FnOnce(&mut GuildState)) -> Self {
        let mut guild = (*self.guild).clone();
        f(&mut guild);

        let mut copy = self.clone();
        copy.guild = Arc::new(guild);
        copy
    }

    pub(crate) fn with_channels(&self, f: impl FnOnce(&mut Vec<ChannelState>)) -> Self {
        let mut channels = self.channels.to_vec();
        f(&mut channels);

        let mut copy = self.clone();
        copy.channels = channels.into();
        copy
    }

    pub(crate) fn with_roles(&self, f: impl FnOnce(&mut Vec<Role>)) -> Self {
        let mut roles = self.roles.to_vec();
        f(&mut roles);

        let mut copy = self.clone();
        copy.roles = roles.into();
        copy
    }

    pub(crate) fn with_emojis(&self, f: impl FnOnce(&mut Vec<Emoji>)) -> Self {
        let mut emojis = self.emojis.to_vec();
        f(&mut emojis);

        let mut copy = self.clone();
        copy.emojis = emojis.into();
        copy
    }

    pub(crate) fn with_voice_states(&self, f: impl FnOnce(&mut Vec<VoiceState>)) -> Self {
        let mut voice_states = self.voice_states.to_vec();
        f(&mut voice_states);

        let mut copy = self.clone();
        copy.voice_states = voice_states.into();
        copy
    }

    // ── Lookups ─────────────────────────────────────────────────────
    //
    // The slices are small and read-mostly; a linear scan beats any index.

    pub fn channel(&self, id: u64) -> Option<&ChannelState> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn role(&self, id: u64) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn emoji(&self, id: u64) -> Option<&Emoji> {
        self.emojis.iter().find(|e| e.id == id)
    }

    pub fn voice_state(&self, user_id: u64) -> Option<&VoiceState> {
        self.voice_states.iter().find(|v| v.user_id == user_id)
    }

    pub(crate) fn require_channel(&self, channel_id: u64) -> Result<&ChannelState, StateError> {
        self.channel(channel_id)
            .ok_or(StateError::ChannelNotFound { channel_id })
    }

    /// Effective permissions for a member with the given role set.
    ///
    /// `channel_id = 0` skips channel overwrites. A non-zero id that is not
    /// in the snapshot yields the guild-scope result with `ok = false`.
    pub fn member_permissions(
        &self,
        channel_id: u64,
        member_id: u64,
        member_roles: &[u64],
    ) -> (u64, bool) {
        let mut ok = true;
        let mut overwrites: &[PermissionOverwrite] = &[];

        if channel_id != 0 {
            match self.require_channel(channel_id) {
                Ok(channel) => overwrites = &channel.permission_overwrites,
                // Carry on with guild-scope permissions only.
                Err(_) => ok = false,
            }
        }

        let perms = calculate_permissions(
            &self.guild,
            &self.roles,
            overwrites,
            member_id,
            member_roles,
        );
        (perms, ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{ALL_PERMISSIONS, SEND_MESSAGES, VIEW_CHANNEL};

    fn sample() -> GuildSet {
        GuildSet::new(
            GuildState {
                id: 1,
                available: true,
                member_count: 2,
                owner_id: 1000,
                ..Default::default()
            },
            vec![
                ChannelState {
                    id: 10,
                    guild_id: 1,
                    ..Default::default()
                },
                ChannelState {
                    id: 11,
                    guild_id: 1,
                    ..Default::default()
                },
            ],
            vec![Role {
                id: 1,
                permissions: VIEW_CHANNEL | SEND_MESSAGES,
                ..Default::default()
            }],
            vec![Emoji {
                id: 77,
                name: "blob".into(),
                ..Default::default()
            }],
            vec![VoiceState {
                guild_id: 1,
                channel_id: 11,
                user_id: 500,
                ..Default::default()
            }],
        )
    }

    #[test]
    fn test_targeted_copy_leaves_other_slices_aliased() {
        let old = sample();
        let new = old.with_channels(|channels| channels.retain(|c| c.id != 11));

        // Only the channels slice was reallocated.
        assert!(!Arc::ptr_eq(&old.channels, &new.channels));
        assert!(Arc::ptr_eq(&old.guild, &new.guild));
        assert!(Arc::ptr_eq(&old.roles, &new.roles));
        assert!(Arc::ptr_eq(&old.emojis, &new.emojis));
        assert!(Arc::ptr_eq(&old.voice_states, &new.voice_states));

        // The old snapshot is untouched.
        assert_eq!(old.channels.len(), 2);
        assert_eq!(new.channels.len(), 1);
    }

    #[test]
    fn test_scalar_copy_leaves_slices_aliased() {
        let old = sample();
        let new = old.with_guild(|g| g.available = false);

        assert!(old.guild.available);
        assert!(!new.guild.available);
        assert!(Arc::ptr_eq(&old.channels, &new.channels));
        assert!(Arc::ptr_eq(&old.roles, &new.roles));
    }

    #[test]
    fn test_lookups() {
        let gs = sample();
        assert!(gs.channel(10).is_some());
        assert!(gs.channel(99).is_none());
        assert!(gs.role(1).is_some());
        assert_eq!(gs.emoji(77).map(|e| e.name.as_str()), Some("blob"));
        assert_eq!(gs.voice_state(500).map(|v| v.channel_id), Some(11));
        assert!(gs.voice_state(9).is_none());
    }

    #[test]
    fn test_member_permissions_without_channel() {
        let gs = sample();
        let (perms, ok) = gs.member_permissions(0, 500, &[]);
        assert!(ok);
        assert_eq!(perms, VIEW_CHANNEL | SEND_MESSAGES);
    }

    #[test]
    fn test_member_permissions_missing_channel_is_partial() {
        let gs = sample();
        let (perms, ok) = gs.member_permissions(999, 500, &[]);
        assert!(!ok);
        assert_eq!(perms, VIEW_CHANNEL | SEND_MESSAGES);
    }

    #[test]
    fn test_owner_gets_everything() {
        let gs = sample();
        let (perms, ok) = gs.member_permissions(10, 1000, &[]);
        assert!(ok);
        assert_eq!(perms, ALL_PERMISSIONS);
    }
}
