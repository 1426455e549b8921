use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Client id placed in `${clientid}` when the caller supplies none.
pub const DEFAULT_CLIENT_ID: &str = "00000000402B5328";

const DEFAULT_USERNAME: &str = "Player";
const OFFLINE_ACCESS_TOKEN: &str = "offline_access_token";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
}

/// Identity handed to the game through launch placeholders.
///
/// Microsoft tokens are obtained elsewhere and passed in as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub mode: AccountMode,
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
    pub client_id: String,
}

impl Default for Account {
    fn default() -> Self {
        Self::offline(DEFAULT_USERNAME)
    }
}

impl Account {
    pub fn offline(username: &str) -> Self {
        let username = match username.trim() {
            "" => DEFAULT_USERNAME,
            name => name,
        };
        Self {
            mode: AccountMode::Offline,
            username: username.to_string(),
            uuid: offline_uuid(username),
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            xuid: "0".into(),
            user_type: "legacy".into(),
            client_id: DEFAULT_CLIENT_ID.into(),
        }
    }

    pub fn microsoft(username: &str, uuid: &str, access_token: &str) -> Self {
        Self {
            mode: AccountMode::Microsoft,
            username: username.trim().to_string(),
            uuid: uuid.trim().to_string(),
            access_token: access_token.trim().to_string(),
            xuid: "0".into(),
            user_type: "msa".into(),
            client_id: DEFAULT_CLIENT_ID.into(),
        }
        .sanitized()
    }

    /// Fill blank fields with values the game accepts.
    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = DEFAULT_USERNAME.into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = offline_uuid(&self.username);
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = match self.mode {
                AccountMode::Offline => "legacy".into(),
                AccountMode::Microsoft => "msa".into(),
            };
        }
        if self.client_id.trim().is_empty() {
            self.client_id = DEFAULT_CLIENT_ID.into();
        }
        self
    }
}

/// Name-based (v3) UUID of `OfflinePlayer:<name>`, as offline-mode servers compute it.
pub fn offline_uuid(username: &str) -> String {
    let digest = Md5::digest(format!("OfflinePlayer:{username}").as_bytes());
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&digest);
    uuid::Builder::from_md5_bytes(bytes)
        .into_uuid()
        .as_hyphenated()
        .to_string()
}
