/// Data model for LinkDeck shared link lists.
///
/// A `LinkList` is an ordered, collaboratively curated collection of
/// `UrlItem`s. Item order is the user-visible display order and must survive
/// any mutation that is not itself a reorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health classification of a single link, refreshed by background sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Never probed
    Unknown,
    /// Responded 2xx within the fast threshold
    Healthy,
    /// Reachable but suspicious (slow, redirected, gated, odd 4xx)
    Warning,
    /// 404, 5xx, timeout or network failure
    Broken,
}

impl Default for HealthState {
    fn default() -> Self {
        HealthState::Unknown
    }
}

/// A single URL entry inside a list.
///
/// The id is unique within its parent list only, not globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlItem {
    /// Id unique within the parent list
    pub id: String,
    /// Target address
    pub url: String,
    /// Display title
    pub title: String,
    /// Display description
    #[serde(default)]
    pub description: String,
    /// Monotonically non-decreasing click counter
    pub clicks: u64,
    /// Last observed health classification
    #[serde(default)]
    pub health: HealthState,
    /// Error detail from the last failed probe, if any
    #[serde(default)]
    pub health_detail: Option<String>,
    /// When the health state was last observed
    pub checked_at: Option<DateTime<Utc>>,
    /// Last modification of any field
    pub updated_at: DateTime<Utc>,
}

impl UrlItem {
    /// Create a new item with a fresh id, zero clicks and unknown health.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            title: title.into(),
            description: String::new(),
            clicks: 0,
            health: HealthState::Unknown,
            health_detail: None,
            checked_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Record a freshly observed health state.
    ///
    /// Every health transition carries a fresh `checked_at` timestamp.
    pub fn set_health(&mut self, health: HealthState, detail: Option<String>) {
        self.health = health;
        self.health_detail = detail;
        self.checked_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}

/// A shared ordered collection of URL entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkList {
    /// Stable identity
    pub id: String,
    /// Human-readable slug
    pub slug: String,
    /// Owner identity
    pub owner_id: String,
    /// Whether the list is publicly viewable
    pub is_public: bool,
    /// Collaborator identities allowed to mutate the list
    #[serde(default)]
    pub collaborators: Vec<String>,
    /// Ordered items; order is display order
    pub urls: Vec<UrlItem>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl LinkList {
    /// Create an empty list owned by `owner_id`.
    pub fn new(slug: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            slug: normalize_slug(&slug.into()),
            owner_id: owner_id.into(),
            is_public: false,
            collaborators: Vec::new(),
            urls: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Find an item by id.
    pub fn find_url(&self, item_id: &str) -> Option<&UrlItem> {
        self.urls.iter().find(|u| u.id == item_id)
    }

    /// Position of an item by id.
    pub fn position_of(&self, item_id: &str) -> Option<usize> {
        self.urls.iter().position(|u| u.id == item_id)
    }
}

/// Normalize a slug for use in channel and cache keys: lowercase,
/// non-alphanumerics collapsed to single dashes, trimmed.
pub fn normalize_slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = true;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Kind of background maintenance job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Probe every item's URL and reclassify health
    HealthSweep,
    /// Re-fetch page titles and descriptions
    MetadataRefresh,
}

/// A maintenance job submission.
///
/// Identity carries no idempotency guarantee; duplicate submissions are
/// tolerated because every handler is safe to re-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// What to run
    pub kind: JobKind,
    /// Target list
    pub list_id: String,
    /// Cron expression for recurring jobs; None for one-shot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
}

impl JobRequest {
    /// One-shot job targeting a single list.
    pub fn once(kind: JobKind, list_id: impl Into<String>) -> Self {
        Self {
            kind,
            list_id: list_id.into(),
            cron: None,
        }
    }

    /// Recurring job on a cron schedule.
    pub fn recurring(kind: JobKind, list_id: impl Into<String>, cron: impl Into<String>) -> Self {
        Self {
            kind,
            list_id: list_id.into(),
            cron: Some(cron.into()),
        }
    }
}

/// Result of a health sweep over one list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSweepSummary {
    /// Items probed
    pub checked: usize,
    /// Items classified healthy
    pub healthy: usize,
    /// Items classified warning
    pub warning: usize,
    /// Items classified broken
    pub broken: usize,
    /// Wall-clock sweep duration in milliseconds
    pub duration_ms: u64,
}

/// Result of a metadata refresh over one list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRefreshSummary {
    /// Items visited
    pub refreshed: usize,
    /// Items whose metadata was updated
    pub succeeded: usize,
    /// Items left unchanged due to fetch failure
    pub failed: usize,
    /// Wall-clock refresh duration in milliseconds
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_starts_unknown() {
        let item = UrlItem::new("https://example.com", "Example");
        assert_eq!(item.clicks, 0);
        assert_eq!(item.health, HealthState::Unknown);
        assert!(item.checked_at.is_none());
    }

    #[test]
    fn test_set_health_stamps_checked_at() {
        let mut item = UrlItem::new("https://example.com", "Example");
        item.set_health(HealthState::Broken, Some("timeout".into()));
        assert_eq!(item.health, HealthState::Broken);
        assert_eq!(item.health_detail.as_deref(), Some("timeout"));
        assert!(item.checked_at.is_some());
    }

    #[test]
    fn test_find_url_by_id() {
        let mut list = LinkList::new("reading", "user-1");
        let item = UrlItem::new("https://example.com", "Example");
        let id = item.id.clone();
        list.urls.push(item);

        assert!(list.find_url(&id).is_some());
        assert_eq!(list.position_of(&id), Some(0));
        assert!(list.find_url("missing").is_none());
    }

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug("My Reading List!"), "my-reading-list");
        assert_eq!(normalize_slug("--weird__input--"), "weird-input");
        assert_eq!(normalize_slug("simple"), "simple");
    }

    #[test]
    fn test_job_request_serializes_without_cron() {
        let job = JobRequest::once(JobKind::HealthSweep, "list-1");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"], "health_sweep");
        assert!(json.get("cron").is_none());
    }

    #[test]
    fn test_health_state_roundtrip() {
        let json = serde_json::to_string(&HealthState::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        let back: HealthState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HealthState::Warning);
    }
}
