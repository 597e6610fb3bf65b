use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, CommunityId};

// -- Board configuration --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardChannelRequest {
    pub channel_id: ChannelId,
}

#[derive(Debug, Serialize)]
pub struct BoardStatusResponse {
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
    pub threshold: u32,
}

// -- Errors --

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
