//! Outbound collaborators of the queue: the channel message gateway and the
//! guild role lookups. The Discord REST client implements these traits in the
//! `standby-discord` crate; [`InMemoryGateway`] backs tests and dry runs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::member::{GuildId, GuildMember, RoleId, UserRef};
use crate::domain::message::{ChannelId, MessageRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    Join,
    Leave,
    Close,
    Open,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonTone {
    Primary,
    Danger,
    Secondary,
    Success,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonSpec {
    pub action: QueueAction,
    pub label: String,
    pub tone: ButtonTone,
    pub disabled: bool,
}

impl ButtonSpec {
    pub fn new(action: QueueAction, label: impl Into<String>, tone: ButtonTone) -> Self {
        Self { action, label: label.into(), tone, disabled: false }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTone {
    Active,
    Closed,
}

/// Platform-neutral queue post: embed text plus its button row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rendering {
    pub title: String,
    pub body: String,
    pub tone: RenderTone,
    pub buttons: Vec<ButtonSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text { content: String },
    Rendering(Rendering),
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { content: content.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content } => Some(content),
            Self::Rendering(_) => None,
        }
    }

    pub fn as_rendering(&self) -> Option<&Rendering> {
        match self {
            Self::Rendering(rendering) => Some(rendering),
            Self::Text { .. } => None,
        }
    }
}

impl From<Rendering> for OutboundMessage {
    fn from(value: Rendering) -> Self {
        Self::Rendering(value)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(String),
    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("gateway response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    /// The target no longer exists on the platform (already deleted, member left).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_message(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageRef, GatewayError>;

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message_ref: &MessageRef,
        message: &OutboundMessage,
    ) -> Result<(), GatewayError>;

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message_ref: &MessageRef,
    ) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn member_roles(
        &self,
        guild: &GuildId,
        user: &UserRef,
    ) -> Result<BTreeSet<RoleId>, GatewayError>;
}

#[async_trait]
pub trait RoleDirectory: RoleResolver {
    async fn add_member_role(
        &self,
        guild: &GuildId,
        user: &UserRef,
        role: &RoleId,
    ) -> Result<(), GatewayError>;

    async fn remove_member_role(
        &self,
        guild: &GuildId,
        user: &UserRef,
        role: &RoleId,
    ) -> Result<(), GatewayError>;

    async fn list_members(&self, guild: &GuildId) -> Result<Vec<GuildMember>, GatewayError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayOperation {
    Send,
    Edit,
    Delete,
    MemberRoles,
    AddRole,
    RemoveRole,
    ListMembers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayCall {
    Send { channel: ChannelId, message_ref: MessageRef, message: OutboundMessage },
    Edit { channel: ChannelId, message_ref: MessageRef, message: OutboundMessage },
    Delete { channel: ChannelId, message_ref: MessageRef },
}

#[derive(Default)]
struct InMemoryState {
    next_id: u64,
    live: BTreeMap<String, OutboundMessage>,
    calls: Vec<GatewayCall>,
    failures: VecDeque<GatewayOperation>,
    members: BTreeMap<UserRef, GuildMember>,
}

/// Gateway that keeps posted messages in memory and records every call.
///
/// Failures can be scripted with [`InMemoryGateway::fail_next`]. Scripted failures
/// are consumed in order: the head of the script fails the next call of its kind
/// with [`GatewayError::Request`] and no side effects.
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<InMemoryState>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(members: Vec<GuildMember>) -> Self {
        let gateway = Self::default();
        {
            let mut state = gateway.lock();
            for member in members {
                state.members.insert(member.user.clone(), member);
            }
        }
        gateway
    }

    pub fn fail_next(&self, operation: GatewayOperation) {
        self.lock().failures.push_back(operation);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn live_message(&self, message_ref: &MessageRef) -> Option<OutboundMessage> {
        self.lock().live.get(message_ref.as_str()).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Text content of every live plain-text message, in posting order.
    pub fn live_texts(&self) -> Vec<String> {
        let state = self.lock();
        let mut texts: Vec<(u64, String)> = state
            .live
            .iter()
            .filter_map(|(id, message)| {
                let order = id.parse::<u64>().ok()?;
                message.as_text().map(|text| (order, text.to_owned()))
            })
            .collect();
        texts.sort_by_key(|(order, _)| *order);
        texts.into_iter().map(|(_, text)| text).collect()
    }

    pub fn member(&self, user: &UserRef) -> Option<GuildMember> {
        self.lock().members.get(user).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure(state: &mut InMemoryState, operation: GatewayOperation) -> bool {
        if state.failures.front() == Some(&operation) {
            state.failures.pop_front();
            return true;
        }
        false
    }

    fn scripted_failure(operation: GatewayOperation) -> GatewayError {
        GatewayError::Request(format!("scripted {operation:?} failure"))
    }
}

#[async_trait]
impl NotificationGateway for InMemoryGateway {
    async fn send_message(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageRef, GatewayError> {
        let mut state = self.lock();
        if Self::take_failure(&mut state, GatewayOperation::Send) {
            return Err(Self::scripted_failure(GatewayOperation::Send));
        }

        state.next_id += 1;
        let message_ref = MessageRef::new(state.next_id.to_string());
        state.live.insert(message_ref.as_str().to_owned(), message.clone());
        state.calls.push(GatewayCall::Send {
            channel: channel.clone(),
            message_ref: message_ref.clone(),
            message: message.clone(),
        });
        Ok(message_ref)
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message_ref: &MessageRef,
        message: &OutboundMessage,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if Self::take_failure(&mut state, GatewayOperation::Edit) {
            return Err(Self::scripted_failure(GatewayOperation::Edit));
        }

        let Some(slot) = state.live.get_mut(message_ref.as_str()) else {
            return Err(GatewayError::Status { status: 404, body: "Unknown Message".to_owned() });
        };
        *slot = message.clone();
        state.calls.push(GatewayCall::Edit {
            channel: channel.clone(),
            message_ref: message_ref.clone(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message_ref: &MessageRef,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if Self::take_failure(&mut state, GatewayOperation::Delete) {
            return Err(Self::scripted_failure(GatewayOperation::Delete));
        }

        if state.live.remove(message_ref.as_str()).is_none() {
            return Err(GatewayError::Status { status: 404, body: "Unknown Message".to_owned() });
        }
        state
            .calls
            .push(GatewayCall::Delete { channel: channel.clone(), message_ref: message_ref.clone() });
        Ok(())
    }
}

#[async_trait]
impl RoleResolver for InMemoryGateway {
    async fn member_roles(
        &self,
        _guild: &GuildId,
        user: &UserRef,
    ) -> Result<BTreeSet<RoleId>, GatewayError> {
        let mut state = self.lock();
        if Self::take_failure(&mut state, GatewayOperation::MemberRoles) {
            return Err(Self::scripted_failure(GatewayOperation::MemberRoles));
        }

        let member = state
            .members
            .get(user)
            .ok_or_else(|| GatewayError::Status { status: 404, body: "Unknown Member".to_owned() })?;
        Ok(member.roles.iter().cloned().collect())
    }
}

#[async_trait]
impl RoleDirectory for InMemoryGateway {
    async fn add_member_role(
        &self,
        _guild: &GuildId,
        user: &UserRef,
        role: &RoleId,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if Self::take_failure(&mut state, GatewayOperation::AddRole) {
            return Err(Self::scripted_failure(GatewayOperation::AddRole));
        }

        let member = state.members.entry(user.clone()).or_insert_with(|| GuildMember {
            user: user.clone(),
            is_bot: false,
            roles: Vec::new(),
        });
        if !member.has_role(role) {
            member.roles.push(role.clone());
        }
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _guild: &GuildId,
        user: &UserRef,
        role: &RoleId,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if Self::take_failure(&mut state, GatewayOperation::RemoveRole) {
            return Err(Self::scripted_failure(GatewayOperation::RemoveRole));
        }

        if let Some(member) = state.members.get_mut(user) {
            member.roles.retain(|candidate| candidate != role);
        }
        Ok(())
    }

    async fn list_members(&self, _guild: &GuildId) -> Result<Vec<GuildMember>, GatewayError> {
        let mut state = self.lock();
        if Self::take_failure(&mut state, GatewayOperation::ListMembers) {
            return Err(Self::scripted_failure(GatewayOperation::ListMembers));
        }

        Ok(state.members.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        GatewayError, GatewayOperation, InMemoryGateway, NotificationGateway, OutboundMessage,
    };
    use crate::domain::message::{ChannelId, MessageRef};

    #[tokio::test]
    async fn in_memory_gateway_tracks_live_messages() {
        let gateway = InMemoryGateway::new();
        let channel = ChannelId::new("C1");

        let first = gateway.send_message(&channel, &OutboundMessage::text("a")).await.expect("send");
        let second =
            gateway.send_message(&channel, &OutboundMessage::text("b")).await.expect("send");
        gateway.delete_message(&channel, &first).await.expect("delete");

        assert_eq!(gateway.live_count(), 1);
        assert_eq!(gateway.live_texts(), vec!["b".to_owned()]);
        assert_eq!(gateway.live_message(&second), Some(OutboundMessage::text("b")));
    }

    #[tokio::test]
    async fn scripted_failure_applies_to_next_matching_call_only() {
        let gateway = InMemoryGateway::new();
        let channel = ChannelId::new("C1");
        gateway.fail_next(GatewayOperation::Send);

        let failed = gateway.send_message(&channel, &OutboundMessage::text("a")).await;
        assert!(matches!(failed, Err(GatewayError::Request(_))));

        let recovered = gateway.send_message(&channel, &OutboundMessage::text("a")).await;
        assert!(recovered.is_ok());
        assert!(gateway.calls().len() == 1, "failed calls are not recorded");
    }

    #[tokio::test]
    async fn editing_unknown_message_reports_not_found() {
        let gateway = InMemoryGateway::new();
        let result = gateway
            .edit_message(&ChannelId::new("C1"), &MessageRef::new("404"), &OutboundMessage::text("x"))
            .await;

        assert!(matches!(result, Err(GatewayError::Status { status: 404, .. })));
    }
}
