//! Extracts what the rotation engine needs to know about a request.

use http::HeaderMap;
use http::header::USER_AGENT;
use std::net::SocketAddr;

// Link preview fetchers and common crawlers. Matched case-insensitively as
// substrings of the user agent.
const BOT_TOKENS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "facebookexternalhit",
    "whatsapp",
    "telegram",
    "slack",
    "discord",
    "skypeuripreview",
    "preview",
    "curl",
    "wget",
    "python-requests",
    "headless",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

impl Platform {
    pub fn detect(user_agent: &str) -> Self {
        if user_agent.contains("Android") {
            Platform::Android
        } else if ["iPhone", "iPad", "iPod"]
            .iter()
            .any(|device| user_agent.contains(device))
        {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Desktop => "desktop",
        }
    }
}

pub fn is_bot(user_agent: &str) -> bool {
    if user_agent.trim().is_empty() {
        return true;
    }
    let ua = user_agent.to_ascii_lowercase();
    BOT_TOKENS.iter().any(|token| ua.contains(token))
}

pub fn user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Client address as seen by the first proxy in front of us, falling back to
/// the connection peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    match forwarded.or_else(real_ip) {
        Some(ip) => ip.to_string(),
        None => peer.map(|p| p.ip().to_string()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/126.0 Mobile Safari/537.36";
    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36";

    #[test]
    fn test_platform_detection() {
        assert_eq!(Platform::detect(ANDROID_UA), Platform::Android);
        assert_eq!(Platform::detect(IPHONE_UA), Platform::Ios);
        assert_eq!(
            Platform::detect("Mozilla/5.0 (iPad; CPU OS 17_5 like Mac OS X)"),
            Platform::Ios
        );
        assert_eq!(Platform::detect(DESKTOP_UA), Platform::Desktop);
        assert_eq!(Platform::detect(""), Platform::Desktop);
    }

    #[test]
    fn test_bot_detection() {
        assert!(is_bot(""));
        assert!(is_bot("   "));
        assert!(is_bot("facebookexternalhit/1.1"));
        assert!(is_bot("WhatsApp/2.23.20.0 A"));
        assert!(is_bot("Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(is_bot("curl/8.4.0"));

        assert!(!is_bot(ANDROID_UA));
        assert!(!is_bot(IPHONE_UA));
        assert!(!is_bot(DESKTOP_UA));
    }

    #[test]
    fn test_client_ip() {
        let peer: SocketAddr = "192.0.2.10:51000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "192.0.2.10");
        assert_eq!(client_ip(&headers, None), "");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.4");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7");

        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.4");
    }

    #[test]
    fn test_user_agent_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_agent(&headers), "");
        headers.insert(USER_AGENT, HeaderValue::from_static("agent/1.0"));
        assert_eq!(user_agent(&headers), "agent/1.0");
    }
}
