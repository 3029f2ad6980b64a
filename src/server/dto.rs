use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::domain::{ChoiceId, ContestSettings, UserId, UserRecord, WinStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBetsRequest {
    pub choice_ids: Vec<ChoiceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub contest_closed: bool,
}

impl From<UpdateSettingsRequest> for ContestSettings {
    fn from(request: UpdateSettingsRequest) -> Self {
        ContestSettings {
            contest_closed: request.contest_closed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChoiceWinStatusRequest {
    pub choice_id: ChoiceId,
    pub is_primary_win: bool,
    pub is_secondary_win: bool,
}

impl UpdateChoiceWinStatusRequest {
    pub fn status(&self) -> WinStatus {
        WinStatus {
            is_primary_win: self.is_primary_win,
            is_secondary_win: self.is_secondary_win,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub has_paid: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNameRequest {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub has_paid: bool,
    pub is_admin: bool,
}

impl ProfileResponse {
    pub fn from_domain(user: UserRecord, identity: &Identity) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            display_name: user.display_name,
            has_paid: user.has_paid,
            is_admin: identity.is_admin,
        }
    }
}
