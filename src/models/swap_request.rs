// src/models/swap_request.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// Lifecycle of a swap request, stored as the Postgres enum `swap_status`.
///
/// `Pending` is the only non-terminal state; a request leaves it at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "swap_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/// How the caller relates to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Sender,
    Receiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The target is `Pending`, which can never be entered again.
    InvalidTarget,
    /// The request already reached a terminal status.
    AlreadyFinal(SwapStatus),
    /// This party may not move the request to the target.
    NotPermitted { party: Party, target: SwapStatus },
}

impl SwapStatus {
    pub const ALL: [SwapStatus; 4] = [
        SwapStatus::Pending,
        SwapStatus::Accepted,
        SwapStatus::Rejected,
        SwapStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "PENDING",
            SwapStatus::Accepted => "ACCEPTED",
            SwapStatus::Rejected => "REJECTED",
            SwapStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }

    /// The one rule set for status changes.
    ///
    /// Receivers accept or reject, senders cancel, and only from `Pending`.
    pub fn transition(
        self,
        target: SwapStatus,
        party: Party,
    ) -> Result<SwapStatus, TransitionError> {
        if target == SwapStatus::Pending {
            return Err(TransitionError::InvalidTarget);
        }
        if self.is_terminal() {
            return Err(TransitionError::AlreadyFinal(self));
        }
        let allowed = match target {
            SwapStatus::Accepted | SwapStatus::Rejected => party == Party::Receiver,
            SwapStatus::Cancelled => party == Party::Sender,
            SwapStatus::Pending => false,
        };
        if !allowed {
            return Err(TransitionError::NotPermitted { party, target });
        }
        Ok(target)
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwapStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SwapStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::BadRequest(format!("Invalid status '{}'", s)))
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTarget => {
                AppError::BadRequest("A request cannot be moved back to PENDING".to_string())
            }
            TransitionError::AlreadyFinal(current) => AppError::Conflict(format!(
                "Request is already {} and can no longer change",
                current
            )),
            TransitionError::NotPermitted { party, target } => {
                let who = match party {
                    Party::Sender => "the sender",
                    Party::Receiver => "the receiver",
                };
                AppError::Forbidden(format!("{} cannot mark this request {}", who, target))
            }
        }
    }
}

/// Represents the 'swap_requests' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub offered_skill: String,
    pub requested_skill: String,
    pub message: String,
    pub status: SwapStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl SwapRequest {
    /// `None` when the profile is neither sender nor receiver.
    pub fn party_of(&self, profile_id: i64) -> Option<Party> {
        if profile_id == self.sender_id {
            Some(Party::Sender)
        } else if profile_id == self.receiver_id {
            Some(Party::Receiver)
        } else {
            None
        }
    }
}

/// A request joined with the other side's public details, as the caller sees it.
#[derive(Debug, Clone, FromRow)]
pub struct SwapRequestRow {
    #[sqlx(flatten)]
    pub request: SwapRequest,
    pub counterpart_name: String,
    pub counterpart_avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterpart {
    pub id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequestView {
    #[serde(flatten)]
    pub request: SwapRequest,
    /// True when the viewing profile is the receiver.
    pub is_incoming: bool,
    pub counterpart: Counterpart,
}

impl SwapRequestView {
    pub fn for_profile(row: SwapRequestRow, profile_id: i64) -> Self {
        let is_incoming = row.request.receiver_id == profile_id;
        let counterpart_id = if is_incoming {
            row.request.sender_id
        } else {
            row.request.receiver_id
        };
        Self {
            request: row.request,
            is_incoming,
            counterpart: Counterpart {
                id: counterpart_id,
                name: row.counterpart_name,
                avatar_url: row.counterpart_avatar_url,
            },
        }
    }
}

/// DTO for creating a swap request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
    #[serde(alias = "targetProfileId")]
    pub receiver_id: i64,
    #[serde(default)]
    pub offered_skill: String,
    #[serde(default)]
    pub requested_skill: String,
    #[serde(default)]
    pub message: String,
}

/// DTO for a status change. Parsed by hand so a bad value is a 400.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Query parameters for listing the caller's requests.
#[derive(Debug, Default, Deserialize)]
pub struct SwapListParams {
    pub status: Option<String>,
    /// 'incoming' or 'outgoing'.
    pub direction: Option<String>,
}

impl SwapListParams {
    pub fn status_filter(&self) -> Result<Option<SwapStatus>, AppError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }

    /// `Some(true)` keeps incoming only, `Some(false)` outgoing only.
    pub fn incoming_filter(&self) -> Result<Option<bool>, AppError> {
        match self.direction.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(d) if d.eq_ignore_ascii_case("incoming") => Ok(Some(true)),
            Some(d) if d.eq_ignore_ascii_case("outgoing") => Ok(Some(false)),
            Some(d) => Err(AppError::BadRequest(format!("Invalid direction '{}'", d))),
        }
    }
}
