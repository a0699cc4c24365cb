use super::ids::ChatroomId;

pub const CHATROOMS_KEY: &str = "chatrooms";
pub const AUTH_KEY: &str = "auth";
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const MESSAGES_KEY_PREFIX: &str = "messages-";

pub fn messages_key(chatroom_id: &ChatroomId) -> String {
    format!("{MESSAGES_KEY_PREFIX}{chatroom_id}")
}
