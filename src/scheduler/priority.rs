//! Pure priority-bucket computation.
//!
//! [`compute_priority_queue`] is deterministic and side-effect-free:
//! identical inputs always yield identical bucket contents and order. The
//! stateful engine treats content inequality of the result as "the queue
//! changed" and rebuilds its work queue from scratch; nothing here is
//! mutated incrementally.

use std::collections::HashMap;

use crate::models::channel::{Channel, ChannelId, Membership};

/// Priority tier for a prefetch bucket. Lower levels drain first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Channel carries at least one root-level mention.
    Mention,
    /// Channel carries unread posts but no mention.
    Unread,
    /// Reserved third tier. No current input populates it; the slot keeps
    /// the tier ordering closed for future use.
    Deferred,
}

impl Priority {
    /// All tiers in drain order.
    pub const IN_ORDER: [Self; 3] = [Self::Mention, Self::Unread, Self::Deferred];

    /// Numeric level, 1 = highest urgency.
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::Mention => 1,
            Self::Unread => 2,
            Self::Deferred => 3,
        }
    }
}

/// Priority-bucketed channel queue.
///
/// Bucket membership is mutually exclusive per channel: a mentioned channel
/// sits only in the mention bucket, an unread-but-unmentioned channel only
/// in the unread bucket, and the currently open channel in neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityQueue {
    mentions: Vec<ChannelId>,
    unreads: Vec<ChannelId>,
    deferred: Vec<ChannelId>,
}

impl PriorityQueue {
    /// Channel ids in the given bucket, in insertion order.
    #[must_use]
    pub fn bucket(&self, priority: Priority) -> &[ChannelId] {
        match priority {
            Priority::Mention => &self.mentions,
            Priority::Unread => &self.unreads,
            Priority::Deferred => &self.deferred,
        }
    }

    /// All channel ids in strict priority-then-insertion order.
    pub fn iter_in_order(&self) -> impl Iterator<Item = &ChannelId> {
        Priority::IN_ORDER
            .iter()
            .flat_map(|priority| self.bucket(*priority).iter())
    }

    /// Total number of queued channels across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mentions.len() + self.unreads.len() + self.deferred.len()
    }

    /// Whether every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition unread channels into priority buckets.
///
/// Bucket 1 holds channels whose membership carries a root-level mention;
/// bucket 2 holds channels with unread posts but no mention; bucket 3 stays
/// empty. Input order is preserved within each bucket. The currently open
/// channel is excluded from both (it is dispatched separately, always
/// first), and a channel with no membership record is treated as not unread
/// and excluded entirely.
#[must_use]
pub fn compute_priority_queue(
    current_channel: Option<&ChannelId>,
    unread_channels: &[Channel],
    memberships: &HashMap<ChannelId, Membership>,
) -> PriorityQueue {
    let mut queue = PriorityQueue::default();

    for channel in unread_channels {
        if current_channel == Some(&channel.id) {
            continue;
        }
        let Some(membership) = memberships.get(&channel.id) else {
            continue;
        };
        if membership.has_mention() {
            queue.mentions.push(channel.id.clone());
        } else if membership.has_unread() {
            queue.unreads.push(channel.id.clone());
        }
    }

    queue
}
