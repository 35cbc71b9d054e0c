use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::member::UserRef;
use crate::domain::message::MessageRef;

/// What happens to a join once the participant list is at capacity and the
/// waitlist is disabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Capacity is only the alert threshold; the list keeps growing.
    Unbounded,
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuePolicy {
    pub capacity: usize,
    pub waitlist_enabled: bool,
    pub overflow: OverflowPolicy,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self { capacity: 5, waitlist_enabled: true, overflow: OverflowPolicy::Unbounded }
    }
}

impl QueuePolicy {
    pub fn one_more_threshold(&self) -> usize {
        self.capacity.saturating_sub(1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LastEventKind {
    Join,
    Leave,
    JoinWaitlist,
    LeaveWaitlist,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LastEvent {
    pub kind: LastEventKind,
    pub actor: UserRef,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    Waitlisted,
    AlreadyPresent,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left { promoted: Option<UserRef> },
    LeftWaitlist,
    NotPresent,
}

/// Presence reconciliation for one notification kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconcile {
    Keep,
    Post,
    Delete(MessageRef),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationPlan {
    pub one_more: Reconcile,
    pub capacity: Reconcile,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueSession {
    is_open: bool,
    participants: Vec<UserRef>,
    waitlist: Vec<UserRef>,
    last_event: Option<LastEvent>,
    primary_message: Option<MessageRef>,
    capacity_notification: Option<MessageRef>,
    one_more_notification: Option<MessageRef>,
}

impl QueueSession {
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn participants(&self) -> &[UserRef] {
        &self.participants
    }

    pub fn waitlist(&self) -> &[UserRef] {
        &self.waitlist
    }

    pub fn last_event(&self) -> Option<&LastEvent> {
        self.last_event.as_ref()
    }

    pub fn primary_message(&self) -> Option<&MessageRef> {
        self.primary_message.as_ref()
    }

    pub fn capacity_notification(&self) -> Option<&MessageRef> {
        self.capacity_notification.as_ref()
    }

    pub fn one_more_notification(&self) -> Option<&MessageRef> {
        self.one_more_notification.as_ref()
    }

    pub fn contains(&self, user: &UserRef) -> bool {
        self.participants.contains(user) || self.waitlist.contains(user)
    }

    /// Whether `message_ref` is the live queue post of an open session.
    pub fn is_active_post(&self, message_ref: &MessageRef) -> bool {
        self.is_open && self.primary_message.as_ref() == Some(message_ref)
    }

    pub(crate) fn open(&mut self) {
        *self = Self { is_open: true, ..Self::default() };
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn attach_primary(&mut self, message_ref: MessageRef) {
        self.primary_message = Some(message_ref);
    }

    pub(crate) fn set_capacity_notification(&mut self, message_ref: Option<MessageRef>) {
        self.capacity_notification = message_ref;
    }

    pub(crate) fn set_one_more_notification(&mut self, message_ref: Option<MessageRef>) {
        self.one_more_notification = message_ref;
    }

    pub(crate) fn take_notifications(&mut self) -> Vec<MessageRef> {
        [self.capacity_notification.take(), self.one_more_notification.take()]
            .into_iter()
            .flatten()
            .collect()
    }

    pub(crate) fn join(
        &mut self,
        user: UserRef,
        policy: &QueuePolicy,
        at: DateTime<Utc>,
    ) -> JoinOutcome {
        if self.contains(&user) {
            return JoinOutcome::AlreadyPresent;
        }

        let has_room = self.participants.len() < policy.capacity;
        let (kind, outcome) = match (has_room, policy.waitlist_enabled, policy.overflow) {
            (true, _, _) | (false, false, OverflowPolicy::Unbounded) => {
                self.participants.push(user.clone());
                (LastEventKind::Join, JoinOutcome::Joined)
            }
            (false, true, _) => {
                self.waitlist.push(user.clone());
                (LastEventKind::JoinWaitlist, JoinOutcome::Waitlisted)
            }
            (false, false, OverflowPolicy::Reject) => return JoinOutcome::Rejected,
        };

        self.last_event = Some(LastEvent { kind, actor: user, at });
        outcome
    }

    pub(crate) fn leave(&mut self, user: &UserRef, at: DateTime<Utc>) -> LeaveOutcome {
        if let Some(position) = self.participants.iter().position(|member| member == user) {
            self.participants.remove(position);
            let promoted = if self.waitlist.is_empty() {
                None
            } else {
                let head = self.waitlist.remove(0);
                self.participants.push(head.clone());
                Some(head)
            };
            self.last_event =
                Some(LastEvent { kind: LastEventKind::Leave, actor: user.clone(), at });
            return LeaveOutcome::Left { promoted };
        }

        if let Some(position) = self.waitlist.iter().position(|member| member == user) {
            self.waitlist.remove(position);
            self.last_event =
                Some(LastEvent { kind: LastEventKind::LeaveWaitlist, actor: user.clone(), at });
            return LeaveOutcome::LeftWaitlist;
        }

        LeaveOutcome::NotPresent
    }

    pub fn notification_plan(&self, policy: &QueuePolicy) -> NotificationPlan {
        let count = self.participants.len();
        NotificationPlan {
            one_more: reconcile(
                count == policy.one_more_threshold(),
                self.one_more_notification.as_ref(),
            ),
            capacity: reconcile(count >= policy.capacity, self.capacity_notification.as_ref()),
        }
    }
}

fn reconcile(wanted: bool, existing: Option<&MessageRef>) -> Reconcile {
    match (wanted, existing) {
        (true, None) => Reconcile::Post,
        (false, Some(message_ref)) => Reconcile::Delete(message_ref.clone()),
        _ => Reconcile::Keep,
    }
}
