/// Browser/OS identity extracted from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser: &'static str,
    pub browser_version: String,
    pub os: &'static str,
}

pub const UNKNOWN: &str = "Unknown";

/// Browser families, most specific first: Edge and Opera also carry a
/// `Chrome/` token, and every Chromium/WebKit UA carries `Safari`.
/// Each entry is (family, tokens that identify it, version token).
const BROWSERS: &[(&str, &[&str], &str)] = &[
    ("Edge", &["Edg/", "EdgA/", "EdgiOS/"], ""),
    ("Opera", &["OPR/", "OPT/"], ""),
    ("Samsung Internet", &["SamsungBrowser/"], "SamsungBrowser/"),
    ("Chrome", &["Chrome", "CriOS/"], ""),
    ("Firefox", &["Firefox", "FxiOS/"], ""),
    ("Safari", &["Safari"], "Version/"),
];

/// OS families, most specific first: Android UAs also say `Linux`, iOS UAs
/// also say `Mac OS X`, ChromeOS also says `X11`.
const OPERATING_SYSTEMS: &[(&str, &[&str])] = &[
    ("Windows", &["Windows"]),
    ("Android", &["Android"]),
    ("iOS", &["iPhone", "iPad", "iPod", "iOS"]),
    ("macOS", &["Mac"]),
    ("ChromeOS", &["CrOS"]),
    ("Linux", &["Linux"]),
];

/// Parse a UA string. Never fails: unmatched parts come back as
/// [`UNKNOWN`] and an empty version.
pub fn parse_user_agent(ua: &str) -> UserAgentInfo {
    let (browser, browser_version) = BROWSERS
        .iter()
        .find_map(|(name, tokens, version_token)| {
            let matched = tokens.iter().find(|token| ua.contains(*token))?;
            let version_token = if version_token.is_empty() {
                versioned_token(*matched)
            } else {
                *version_token
            };
            Some((*name, version_after(ua, version_token)))
        })
        .unwrap_or((UNKNOWN, String::new()));

    let os = OPERATING_SYSTEMS
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|token| ua.contains(token)))
        .map_or(UNKNOWN, |(name, _)| *name);

    UserAgentInfo {
        browser,
        browser_version,
        os,
    }
}

/// `"Chrome"` is matched loosely but its version lives after `"Chrome/"`.
fn versioned_token(token: &'static str) -> &'static str {
    match token {
        "Chrome" => "Chrome/",
        "Firefox" => "Firefox/",
        other => other,
    }
}

/// Major version: the run of ASCII digits right after `token`.
fn version_after(ua: &str, token: &str) -> String {
    let Some(start) = ua.find(token) else {
        return String::new();
    };
    ua[start + token.len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect()
}
