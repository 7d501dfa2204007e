//! Redirect table of the main site
//!
//! The main site routes `/<slug>/*` to each published invitation through a
//! `_redirects` file. A slug keeps exactly one rule: a missing rule is
//! appended, a rule for the same prefix with another target or status is
//! replaced in place. The catch-all fallback is kept as the last line.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::archive::{REDIRECTS_FILE, SiteArchive};
use crate::error::{DeployError, HostingError};
use crate::hosting::{HostingProvider, with_timeout};

/// Single-page fallback, always the last rule of a table
pub const CATCH_ALL_RULE: &str = "/*  /index.html  200";

/// Status Netlify applies to a rule that names none
const DEFAULT_STATUS: &str = "301";

/// Status of an invitation rule: a rewrite, the URL stays on the main site
const PROXY_STATUS: &str = "200";

/// A proxy rule from a path prefix to another site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    /// Path prefix without trailing slash, e.g. `/ayu-budi`
    pub prefix: String,
    /// Base URL of the destination without trailing slash
    pub destination: String,
    /// HTTP status, including any `!` force marker
    pub status: String,
}

impl RedirectRule {
    pub fn for_slug(slug: &str, site_url: &str) -> Self {
        Self {
            prefix: format!("/{slug}"),
            destination: site_url.trim_end_matches('/').to_string(),
            status: PROXY_STATUS.to_string(),
        }
    }

    /// Parse a `<prefix>/*  <destination>/:splat  [status]` line
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let from = fields.next()?;
        let to = fields.next()?;
        let status = fields.next().unwrap_or(DEFAULT_STATUS);
        let prefix = from.strip_suffix("/*")?;
        let destination = to.strip_suffix("/:splat")?;
        if prefix.is_empty() {
            return None;
        }
        Some(Self {
            prefix: prefix.to_string(),
            destination: destination.to_string(),
            status: status.to_string(),
        })
    }

    pub fn line(&self) -> String {
        format!("{}/*  {}/:splat  {}", self.prefix, self.destination, self.status)
    }
}

fn is_catch_all(line: &str) -> bool {
    line.split_whitespace().eq(CATCH_ALL_RULE.split_whitespace())
}

/// Parsed `_redirects` file
///
/// Lines are kept verbatim so comments and unrelated rules survive a
/// rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectTable {
    lines: Vec<String>,
}

impl RedirectTable {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(|line| line.trim_end().to_string()).collect(),
        }
    }

    /// Proxy rules in file order
    pub fn rules(&self) -> Vec<RedirectRule> {
        self.lines
            .iter()
            .filter_map(|line| RedirectRule::parse(line))
            .collect()
    }

    pub fn contains(&self, rule: &RedirectRule) -> bool {
        self.lines
            .iter()
            .filter_map(|line| RedirectRule::parse(line))
            .any(|existing| existing == *rule)
    }

    /// Make `rule` the only rule for its prefix and keep a single catch-all
    /// as the last line. Returns whether the table changed.
    ///
    /// An existing rule for the prefix keeps its position; later duplicates
    /// are dropped since the first match shadows them.
    pub fn append(&mut self, rule: &RedirectRule) -> bool {
        let before = self.lines.clone();
        let same_prefix = |line: &String| {
            RedirectRule::parse(line).is_some_and(|existing| existing.prefix == rule.prefix)
        };

        match self.lines.iter().position(same_prefix) {
            Some(first) => {
                self.lines[first] = rule.line();
                let mut index = 0;
                self.lines.retain(|line| {
                    let keep = index <= first || !same_prefix(line);
                    index += 1;
                    keep
                });
            }
            None => {
                self.lines.retain(|line| !is_catch_all(line));
                self.trim_trailing_blanks();
                self.lines.push(rule.line());
            }
        }

        self.keep_catch_all_last();
        self.lines != before
    }

    fn keep_catch_all_last(&mut self) {
        let catch_alls = self.lines.iter().filter(|line| is_catch_all(line)).count();
        let last = self.lines.iter().rev().find(|line| !line.trim().is_empty());
        if catch_alls == 1 && last.is_some_and(|line| is_catch_all(line)) {
            return;
        }

        self.lines.retain(|line| !is_catch_all(line));
        self.trim_trailing_blanks();
        self.lines.push(CATCH_ALL_RULE.to_string());
    }

    fn trim_trailing_blanks(&mut self) {
        while self.lines.last().is_some_and(|line| line.trim().is_empty()) {
            self.lines.pop();
        }
    }

    pub fn render(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Where the current redirect table lives
#[async_trait]
pub trait RedirectStore: Send + Sync {
    /// Current table text. `HostingError::NotFound` means no table yet.
    async fn fetch_current(&self) -> Result<String, HostingError>;

    /// Replace the whole table
    async fn replace(&self, table: &str) -> Result<(), DeployError>;
}

/// Redirect table deployed as the `_redirects` file of the main site
pub struct HostedRedirects {
    provider: Arc<dyn HostingProvider>,
    site_id: String,
    timeout: Duration,
}

impl HostedRedirects {
    pub fn new(provider: Arc<dyn HostingProvider>, site_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            site_id: site_id.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RedirectStore for HostedRedirects {
    async fn fetch_current(&self) -> Result<String, HostingError> {
        with_timeout(
            "fetch_file",
            self.timeout,
            self.provider.fetch_file(&self.site_id, REDIRECTS_FILE),
        )
        .await
    }

    async fn replace(&self, table: &str) -> Result<(), DeployError> {
        let archive = SiteArchive::redirects_only(table)?;
        with_timeout(
            "deploy_archive",
            self.timeout,
            self.provider.deploy_archive(&self.site_id, archive),
        )
        .await
        .map_err(DeployError::Redirects)?;
        Ok(())
    }
}

/// Result of an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Appended,
    /// The prefix had a rule, but the table needed rewriting: a different
    /// target or status, or a missing or misplaced catch-all.
    Corrected,
    AlreadyPresent,
}

/// Append-only access to a redirect table
///
/// Appends from this process are serialised; the table is re-read right
/// before every write.
pub struct RedirectLedger {
    store: Arc<dyn RedirectStore>,
    write_lock: Mutex<()>,
}

impl RedirectLedger {
    pub fn new(store: Arc<dyn RedirectStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Current table. An unreadable table is treated as empty.
    pub async fn current(&self) -> RedirectTable {
        match self.store.fetch_current().await {
            Ok(text) => RedirectTable::parse(&text),
            Err(HostingError::NotFound(_)) => {
                debug!("no redirect table yet");
                RedirectTable::default()
            }
            Err(e) => {
                warn!(error = %e, "could not read redirect table, starting from an empty one");
                RedirectTable::default()
            }
        }
    }

    pub async fn append_if_absent(&self, rule: &RedirectRule) -> Result<LedgerOutcome, DeployError> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.current().await;
        let had_prefix = table.rules().iter().any(|existing| existing.prefix == rule.prefix);
        if !table.append(rule) {
            debug!(prefix = %rule.prefix, "redirect rule already present");
            return Ok(LedgerOutcome::AlreadyPresent);
        }

        self.store.replace(&table.render()).await?;
        if had_prefix {
            info!(rule = %rule.line(), "corrected redirect table");
            Ok(LedgerOutcome::Corrected)
        } else {
            info!(rule = %rule.line(), "appended redirect rule");
            Ok(LedgerOutcome::Appended)
        }
    }
}
