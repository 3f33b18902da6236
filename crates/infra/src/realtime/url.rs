//! WebSocket URL derivation

use tidylinker_domain::constants::{CHAT_WS_PATH_PREFIX, NOTIFICATIONS_WS_PATH};
use tidylinker_domain::{Config, EntityId};

/// Turn an HTTP(S) origin into a WebSocket origin.
///
/// `https` becomes `wss`, `http` becomes `ws`, existing `ws`/`wss` origins are
/// kept and a bare host gets `ws://`. Trailing slashes are removed and an
/// empty input stays empty.
pub fn to_ws_origin(origin: &str) -> String {
    let trimmed = origin.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("ws://") || lower.starts_with("wss://") {
        trimmed.to_string()
    } else if lower.starts_with("https://") {
        format!("wss://{}", &trimmed["https://".len()..])
    } else if lower.starts_with("http://") {
        format!("ws://{}", &trimmed["http://".len()..])
    } else {
        format!("ws://{trimmed}")
    }
}

/// Join `base` and `path` with exactly one slash between them.
pub fn build_ws_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// WebSocket origin for `config`: the dedicated realtime URL when set,
/// otherwise the API base URL.
pub fn ws_base(config: &Config) -> String {
    let origin = config
        .realtime
        .ws_base_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(&config.api.base_url);
    to_ws_origin(origin)
}

pub fn notifications_path(token: &str) -> String {
    format!("{NOTIFICATIONS_WS_PATH}?token={}", urlencoding::encode(token))
}

pub fn chat_path(chat: &EntityId, token: &str) -> String {
    format!("{CHAT_WS_PATH_PREFIX}{chat}/?token={}", urlencoding::encode(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_http_schemes() {
        assert_eq!(to_ws_origin("https://cgsabiozard.co.uk/"), "wss://cgsabiozard.co.uk");
        assert_eq!(to_ws_origin("http://localhost:8000"), "ws://localhost:8000");
        assert_eq!(to_ws_origin("wss://rt.example.com//"), "wss://rt.example.com");
        assert_eq!(to_ws_origin("ws://rt.example.com"), "ws://rt.example.com");
        assert_eq!(to_ws_origin("localhost:8000"), "ws://localhost:8000");
        assert_eq!(to_ws_origin(""), "");
    }

    #[test]
    fn joins_with_single_slash() {
        assert_eq!(build_ws_url("ws://h/", "/ws/x/"), "ws://h/ws/x/");
        assert_eq!(build_ws_url("ws://h", "ws/x/"), "ws://h/ws/x/");
    }

    #[test]
    fn encodes_token_in_paths() {
        assert_eq!(notifications_path("a b+c"), "/ws/notifications/?token=a%20b%2Bc");
        assert_eq!(chat_path(&EntityId::Int(12), "t"), "/ws/chat/12/?token=t");
    }

    #[test]
    fn prefers_dedicated_realtime_origin() {
        let mut config = Config::default();
        assert_eq!(ws_base(&config), "wss://cgsabiozard.co.uk");

        config.realtime.ws_base_url = Some("http://127.0.0.1:9000/".into());
        assert_eq!(ws_base(&config), "ws://127.0.0.1:9000");
    }
}
