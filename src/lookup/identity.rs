//! Per-request browser identity
//!
//! The lookup site correlates requests by their client fingerprint. Every
//! fetch asks an [`IdentityGenerator`] for a fresh identity so consecutive
//! requests do not share a user agent, cookie jar, or forwarded address.

use rand::Rng;

const CHROME_VERSIONS: [&str; 4] = ["119", "120", "121", "122"];
const PLATFORMS: [&str; 2] = ["Windows NT 10.0; Win64; x64", "Windows NT 11.0; Win64; x64"];
const IP_PREFIXES: [&str; 6] = ["114.114.", "8.8.", "1.1.", "223.5.", "180.76.", "202.96."];

const TOKEN_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const SESSION_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const HEX_CHARS: &[u8] = b"0123456789abcdef";

const ANTIFORGERY_PREFIX: &str = "CfDJ8G8XS_ifn0dFsP7uazyotqy";
const ANTIFORGERY_LEN: usize = 88;
const SESSION_PREFIX: &str = "CfDJ8G8XS%2Fifn0dFsP7uazyotqx";
const SESSION_SUFFIX_LEN: usize = 60;

/// Identity fields attached to a single lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_agent: String,
    pub sec_ch_ua: String,
    pub cookie: String,
    pub forwarded_for: String,
}

impl RequestIdentity {
    /// Header name/value pairs carrying this identity
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("sec-ch-ua".to_string(), self.sec_ch_ua.clone()),
            ("Cookie".to_string(), self.cookie.clone()),
            ("X-Forwarded-For".to_string(), self.forwarded_for.clone()),
        ]
    }
}

/// Source of request identities
pub trait IdentityGenerator: Send + Sync {
    fn generate(&self) -> RequestIdentity;
}

/// Randomized desktop-Chrome identity, regenerated on every call
#[derive(Debug, Clone, Default)]
pub struct BrowserIdentity;

impl BrowserIdentity {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityGenerator for BrowserIdentity {
    fn generate(&self) -> RequestIdentity {
        let mut rng = rand::rng();
        let version = CHROME_VERSIONS[rng.random_range(0..CHROME_VERSIONS.len())];
        let platform = PLATFORMS[rng.random_range(0..PLATFORMS.len())];

        RequestIdentity {
            user_agent: format!(
                "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36",
                platform, version
            ),
            sec_ch_ua: format!(
                "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"{}\", \"Google Chrome\";v=\"{}\"",
                version, version
            ),
            cookie: random_cookie(&mut rng),
            forwarded_for: random_ip(&mut rng),
        }
    }
}

/// A fixed identity, for tests and for running without fingerprint rotation
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    identity: RequestIdentity,
}

impl StaticIdentity {
    pub fn new(identity: RequestIdentity) -> Self {
        Self { identity }
    }
}

impl Default for StaticIdentity {
    fn default() -> Self {
        Self::new(RequestIdentity {
            user_agent: concat!("beian-exporter/", env!("CARGO_PKG_VERSION")).to_string(),
            sec_ch_ua: String::new(),
            cookie: String::new(),
            forwarded_for: "127.0.0.1".to_string(),
        })
    }
}

impl IdentityGenerator for StaticIdentity {
    fn generate(&self) -> RequestIdentity {
        self.identity.clone()
    }
}

fn random_cookie<R: Rng>(rng: &mut R) -> String {
    let antiforgery = random_suffixed(
        rng,
        ANTIFORGERY_PREFIX,
        TOKEN_CHARS,
        ANTIFORGERY_LEN - ANTIFORGERY_PREFIX.len(),
    );
    let session = random_suffixed(rng, SESSION_PREFIX, SESSION_CHARS, SESSION_SUFFIX_LEN);
    let mac = uuid::Uuid::new_v4();
    let acw_tc = random_suffixed(rng, "", HEX_CHARS, 32);

    format!(
        ".AspNetCore.Antiforgery.OGq99nrNx5I={}; .AspNetCore.Session={}; mac_string={}; acw_tc={}",
        antiforgery, session, mac, acw_tc
    )
}

fn random_suffixed<R: Rng>(rng: &mut R, prefix: &str, alphabet: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(prefix.len() + len);
    out.push_str(prefix);
    for _ in 0..len {
        out.push(alphabet[rng.random_range(0..alphabet.len())] as char);
    }
    out
}

fn random_ip<R: Rng>(rng: &mut R) -> String {
    let prefix = IP_PREFIXES[rng.random_range(0..IP_PREFIXES.len())];
    let third: u8 = rng.random_range(1..=255);
    let fourth: u8 = rng.random_range(1..=255);
    format!("{}{}.{}", prefix, third, fourth)
}
