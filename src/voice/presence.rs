//! Channel eligibility rules.

use crate::voice::ChannelMember;

/// Returns `true` if at least one member is not a bot.
///
/// Audio is only ever played to channels passing this check, so an empty
/// channel or one holding only bots (the alerter included) stays silent.
pub fn is_eligible(members: &[ChannelMember]) -> bool {
    has_human_members(members, 1)
}

/// Returns `true` if the channel holds at least `count` human members.
pub fn has_human_members(members: &[ChannelMember], count: usize) -> bool {
    members.iter().filter(|member| !member.bot).count() >= count
}
