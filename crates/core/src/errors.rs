use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("a queue is already open in this channel")]
    AlreadyOpen,
    #[error("caller is not allowed to perform this action")]
    NotAuthorized,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("member role lookup failed: {0}")]
    MemberResolution(#[source] GatewayError),
}

impl QueueError {
    /// Ephemeral text shown to the user who triggered the failed interaction.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AlreadyOpen => "Queue already exists",
            Self::NotAuthorized => "Only admins can use this command.",
            Self::Gateway(_) => "Something went wrong talking to Discord. Please try again.",
            Self::MemberResolution(_) => "Could not verify your roles. Please try again shortly.",
        }
    }
}
