//! Browser-facing client URL construction.

/// Build the noVNC client page URL for a local bridge port.
///
/// The base parameters are emitted in a fixed order; `password` (when
/// present) and `extra` entries override existing keys in place or append
/// as new keys in the order supplied. Values are inserted literally — they
/// are expected to be simple tokens, not percent-encoded material.
pub fn build_client_url(
    local_port: u16,
    password: Option<&str>,
    extra: &[(String, String)],
) -> String {
    let mut params: Vec<(String, String)> = vec![
        ("host".to_string(), "127.0.0.1".to_string()),
        ("port".to_string(), local_port.to_string()),
        ("path".to_string(), "websockify".to_string()),
        ("autoconnect".to_string(), "1".to_string()),
        ("reconnect".to_string(), "1".to_string()),
        ("reconnect_delay".to_string(), "1000".to_string()),
        ("resize".to_string(), "scale".to_string()),
        ("view_only".to_string(), "false".to_string()),
    ];

    if let Some(password) = password {
        upsert(&mut params, "password", password);
    }
    for (key, value) in extra {
        upsert(&mut params, key, value);
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("http://127.0.0.1:{local_port}/vnc.html?{query}")
}

/// Replace `key` in place if present, otherwise append it.
fn upsert(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value.to_string(),
        None => params.push((key.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_without_password() {
        assert_eq!(
            build_client_url(6080, None, &[]),
            "http://127.0.0.1:6080/vnc.html?host=127.0.0.1&port=6080&path=websockify\
             &autoconnect=1&reconnect=1&reconnect_delay=1000&resize=scale&view_only=false"
        );
    }

    #[test]
    fn password_appends_after_base_params() {
        let url = build_client_url(6080, Some("abc"), &[]);
        assert!(url.ends_with("&view_only=false&password=abc"));
    }

    #[test]
    fn extra_params_override_in_place() {
        let extra = [("resize".to_string(), "remote".to_string())];
        let url = build_client_url(6080, None, &extra);
        // Overridden key keeps its original position.
        assert!(url.contains("reconnect_delay=1000&resize=remote&view_only=false"));
        assert!(!url.contains("resize=scale"));
    }

    #[test]
    fn new_extra_params_append_in_supplied_order() {
        let extra = [
            ("quality".to_string(), "6".to_string()),
            ("compression".to_string(), "2".to_string()),
        ];
        let url = build_client_url(6080, Some("abc"), &extra);
        assert!(url.ends_with("password=abc&quality=6&compression=2"));
    }
}
