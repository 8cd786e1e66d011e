//! Pass-through mirrors for the widget endpoint.
//!
//! Browsers cannot call the widget endpoint cross-origin, so requests are
//! routed through public CORS proxies. Each proxy takes the target URL
//! percent-encoded after a fixed prefix; `direct` means no proxy at all.

use std::fmt;

use anyhow::{bail, Result};
use url::form_urlencoded;

/// Config value that selects a direct request.
const DIRECT: &str = "direct";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    Direct,
    Prefix(String),
}

impl ProxyRoute {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(DIRECT) {
            ProxyRoute::Direct
        } else {
            ProxyRoute::Prefix(raw.to_string())
        }
    }

    /// Build the request URL for `target` through this route.
    pub fn url_for(&self, target: &str) -> String {
        match self {
            ProxyRoute::Direct => target.to_string(),
            ProxyRoute::Prefix(prefix) => {
                let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
                format!("{}{}", prefix, encoded)
            }
        }
    }
}

impl fmt::Display for ProxyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyRoute::Direct => f.write_str(DIRECT),
            ProxyRoute::Prefix(prefix) => f.write_str(prefix),
        }
    }
}

/// Ordered, non-empty list of mirrors. Selection is by index so the cursor
/// can live with the rest of the sync state.
#[derive(Debug, Clone)]
pub struct ProxyList {
    routes: Vec<ProxyRoute>,
}

impl ProxyList {
    pub fn new(routes: Vec<ProxyRoute>) -> Result<Self> {
        if routes.is_empty() {
            bail!("At least one proxy route is required (use \"direct\" for none)");
        }
        Ok(Self { routes })
    }

    pub fn from_strings<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        Self::new(raw.iter().map(|r| ProxyRoute::parse(r.as_ref())).collect())
    }

    /// Route at `index`, wrapping if the index is out of range.
    pub fn get(&self, index: usize) -> &ProxyRoute {
        &self.routes[index % self.routes.len()]
    }

    /// The index after `index`, wrapping to the start of the list.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.routes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "https://discord.com/api/guilds/1/widget.json";

    #[test]
    fn test_direct_route_passes_target_through() {
        assert_eq!(ProxyRoute::parse("direct").url_for(TARGET), TARGET);
        assert_eq!(ProxyRoute::parse(" DIRECT ").url_for(TARGET), TARGET);
    }

    #[test]
    fn test_prefix_route_encodes_target() {
        let route = ProxyRoute::parse("https://corsproxy.io/?");
        assert_eq!(
            route.url_for(TARGET),
            "https://corsproxy.io/?https%3A%2F%2Fdiscord.com%2Fapi%2Fguilds%2F1%2Fwidget.json"
        );
    }

    #[test]
    fn test_next_index_wraps() {
        let list = ProxyList::from_strings(&["https://a.test/?u=", "https://b.test/?u=", "direct"]).unwrap();
        assert_eq!(list.next_index(0), 1);
        assert_eq!(list.next_index(2), 0);
        assert_eq!(list.get(4), &ProxyRoute::Prefix("https://b.test/?u=".to_string()));
    }

    #[test]
    fn test_empty_list_rejected() {
        let empty: [&str; 0] = [];
        assert!(ProxyList::from_strings(&empty).is_err());
    }
}
