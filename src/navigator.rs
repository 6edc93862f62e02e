//! Platform-aware handoff to the payment processor's hosted verification.
//!
//! Some runtimes silently block the processor's verification challenge
//! when it is framed or reached by an in-page redirect; on those, the
//! continuation URL must be presented as a user-initiated external
//! navigation instead. The strategy is chosen once from a capability
//! probe at session start, not re-derived at each use site.

use serde::{Deserialize, Serialize};
use tracing::info;

/// The client runtime hosting the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientPlatform {
    /// Ordinary browser tab.
    Web,
    /// Home-screen installed web app on iOS; full-page redirects out of
    /// the app shell are known to drop the verification challenge.
    IosStandalone,
    /// In-app embedded web view (social apps and the like); framing the
    /// challenge is blocked.
    EmbeddedWebView,
}

/// Raw capability signals gathered by the host when the wizard mounts.
#[derive(Debug, Clone, Default)]
pub struct PlatformHints {
    pub user_agent: String,
    /// Display-mode standalone (installed web app).
    pub standalone_display: bool,
}

impl ClientPlatform {
    /// Probe once at session start.
    pub fn from_hints(hints: &PlatformHints) -> Self {
        let ua = hints.user_agent.to_lowercase();
        let ios = ua.contains("iphone") || ua.contains("ipad");
        if ios && hints.standalone_display {
            return Self::IosStandalone;
        }
        // Android WebView marks itself "; wv"; several in-app browsers
        // carry their own token instead.
        if ua.contains("; wv") || ua.contains("instagram") || ua.contains("fban") {
            return Self::EmbeddedWebView;
        }
        Self::Web
    }

    /// Whether this runtime blocks the framed/redirected challenge.
    pub fn blocks_framed_challenge(&self) -> bool {
        matches!(self, Self::IosStandalone | Self::EmbeddedWebView)
    }
}

/// How to leave the wizard for the hosted verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffStrategy {
    /// Full-page redirect away from the wizard.
    Redirect,
    /// Present the URL for the user to open in a new tab themselves.
    UserInitiatedTab,
}

impl HandoffStrategy {
    pub fn for_platform(platform: ClientPlatform) -> Self {
        if platform.blocks_framed_challenge() {
            Self::UserInitiatedTab
        } else {
            Self::Redirect
        }
    }
}

/// A one-way exit to the hosted verification flow. The wizard does not
/// regain control; re-entry happens through a separate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub url: String,
    pub strategy: HandoffStrategy,
}

impl Handoff {
    pub fn plan(strategy: HandoffStrategy, url: String) -> Self {
        info!(strategy = ?strategy, "Planning verification handoff");
        Self { url, strategy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_browsers_redirect() {
        let hints = PlatformHints {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X) Safari/605.1".into(),
            standalone_display: false,
        };
        let platform = ClientPlatform::from_hints(&hints);
        assert_eq!(platform, ClientPlatform::Web);
        assert_eq!(
            HandoffStrategy::for_platform(platform),
            HandoffStrategy::Redirect
        );
    }

    #[test]
    fn ios_standalone_gets_user_initiated_tab() {
        let hints = PlatformHints {
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)".into(),
            standalone_display: true,
        };
        let platform = ClientPlatform::from_hints(&hints);
        assert_eq!(platform, ClientPlatform::IosStandalone);
        assert_eq!(
            HandoffStrategy::for_platform(platform),
            HandoffStrategy::UserInitiatedTab
        );
    }

    #[test]
    fn ios_in_browser_tab_is_plain_web() {
        let hints = PlatformHints {
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)".into(),
            standalone_display: false,
        };
        assert_eq!(ClientPlatform::from_hints(&hints), ClientPlatform::Web);
    }

    #[test]
    fn embedded_webviews_detected() {
        let hints = PlatformHints {
            user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8; wv) Chrome/120".into(),
            standalone_display: false,
        };
        assert_eq!(
            ClientPlatform::from_hints(&hints),
            ClientPlatform::EmbeddedWebView
        );
    }
}
