//! Canonical robots.txt directives and the key normalization used to find them.
//!
//! Configuration keys are matched loosely: `User_Agent`, `USER-AGENT` and
//! `useragent` all name [`Directive::UserAgent`]. Keys that do not normalize to
//! a known directive are ignored by the resolver rather than rejected.
use std::fmt;

/// One of the seven directives the generator knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Directive {
    UserAgent,
    CrawlDelay,
    Disallow,
    Allow,
    Host,
    Sitemap,
    CleanParam,
}

impl Directive {
    /// Number of known directives.
    pub const COUNT: usize = 7;

    /// Every directive in table order. Within one rule item, resolved output
    /// follows this order regardless of how the keys were declared.
    pub const ALL: [Directive; Self::COUNT] = [
        Directive::UserAgent,
        Directive::CrawlDelay,
        Directive::Disallow,
        Directive::Allow,
        Directive::Host,
        Directive::Sitemap,
        Directive::CleanParam,
    ];

    /// Normalized lookup key (`useragent`, `crawldelay`, ...).
    pub const fn key(self) -> &'static str {
        match self {
            Directive::UserAgent => "useragent",
            Directive::CrawlDelay => "crawldelay",
            Directive::Disallow => "disallow",
            Directive::Allow => "allow",
            Directive::Host => "host",
            Directive::Sitemap => "sitemap",
            Directive::CleanParam => "cleanparam",
        }
    }

    /// Directive name as written in the output document.
    pub const fn name(self) -> &'static str {
        match self {
            Directive::UserAgent => "User-agent",
            Directive::CrawlDelay => "Crawl-delay",
            Directive::Disallow => "Disallow",
            Directive::Allow => "Allow",
            Directive::Host => "Host",
            Directive::Sitemap => "Sitemap",
            Directive::CleanParam => "Clean-param",
        }
    }

    /// Position of this directive in [`Directive::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up an already normalized key.
    pub fn from_normalized(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|directive| directive.key() == key)
    }

    /// Normalize a raw configuration key and look it up.
    pub fn from_key(raw: &str) -> Option<Self> {
        Self::from_normalized(&normalize_key(raw))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercase `raw` and drop every character that is not an ASCII letter or digit.
///
/// Total and idempotent: any input yields a (possibly empty) string, and
/// normalizing twice gives the same result as normalizing once.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
