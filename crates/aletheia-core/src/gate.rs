//! Audit pattern gate.
//!
//! Holds the compiled regular expression that decides which canonicalized
//! request paths are audit-worthy, extracts endpoint-specific extra
//! information, and offers the bypass self-check used to warn administrators
//! about patterns that crafted URLs can evade.

use crate::error::{Error, Result};
use regex::Regex;
use tracing::debug;
use url::form_urlencoded;

/// Administrative endpoint keywords the default pattern covers.
pub const KNOWN_KEYWORDS: &[&str] = &[
    "configSubmit",
    "doDelete",
    "postBuildResult",
    "enable",
    "disable",
    "cancelQueue",
    "stop",
    "toggleLogKeep",
    "doWipeOutWorkspace",
    "createItem",
    "createView",
    "toggleOffline",
    "cancelQuietDown",
    "quietDown",
    "restart",
    "exit",
    "safeExit",
];

/// Historical default patterns that crafted URLs can bypass.
///
/// Deployments still carrying one of these should be warned and moved to the
/// current default.
pub const LEGACY_DEFAULT_PATTERNS: &[&str] = &[
    // up until 3.5
    ".*/(?:configSubmit|doDelete|postBuildResult|enable|disable|\
     cancelQueue|stop|toggleLogKeep|doWipeOutWorkspace|createItem|createView|toggleOffline|\
     cancelQuietDown|quietDown|restart|exit|safeExit)",
    // up until 2.1
    ".*/(?:configSubmit|doDelete|postBuildResult|\
     cancelQueue|stop|toggleLogKeep|doWipeOutWorkspace|createItem|createView|toggleOffline)",
    // up until 1.1
    ".*/(?:configSubmit|doDelete|build|toggleLogKeep|doWipeOutWorkspace|createItem|createView)",
];

/// Returns the default audit pattern over [`KNOWN_KEYWORDS`].
///
/// The trailing `/?.*` is what makes the pattern resistant to suffix tricks
/// like `/configSubmit/forged`.
#[must_use]
pub fn default_pattern() -> String {
    format!(".*/(?:{})/?.*", KNOWN_KEYWORDS.join("|"))
}

/// Returns true if `pattern` is one of the known bypassable legacy defaults.
#[must_use]
pub fn is_legacy_default_pattern(pattern: &str) -> bool {
    LEGACY_DEFAULT_PATTERNS.contains(&pattern)
}

/// Collaborator that resolves a queued task id to the task's URL.
///
/// Implemented by the host; lookup failures are expected (the item may have
/// left the queue already) and degrade to no enrichment.
pub trait QueueTaskResolver: Send + Sync {
    /// Returns the URL of the queued task with the given id, if still known.
    fn task_url(&self, item_id: u64) -> Option<String>;
}

/// Resolver used when no host queue is available; never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQueueResolver;

impl QueueTaskResolver for NoQueueResolver {
    fn task_url(&self, _item_id: u64) -> Option<String> {
        None
    }
}

/// Endpoint-specific enrichment of a matched request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Suffix appended to the logged path (the original query string for
    /// queue cancellations).
    pub path_suffix: String,

    /// Extra information appended after the path, e.g. `" (<task-url>)"`.
    pub extra: String,
}

/// A default-pattern keyword that the configured pattern fails to protect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassWarning {
    /// The keyword whose legitimate URL matches.
    pub keyword: String,

    /// Crafted URLs that evade the pattern for this keyword.
    pub crafted_urls: Vec<String>,
}

/// Compiled audit-worthiness pattern.
///
/// Matching is always full-string, so `contains`-style partial hits cannot
/// widen the audited surface. Instances are immutable; reconfiguration swaps
/// in a freshly compiled gate and keeps the previous one on compile failure.
#[derive(Debug)]
pub struct AuditPatternGate {
    pattern: String,
    regex: Regex,
}

impl AuditPatternGate {
    /// Compiles a gate from the given pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the pattern is not a valid
    /// regular expression. Callers must keep the previously active gate in
    /// that case so the gate is never left pattern-less.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            Error::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Compiles the gate for the default keyword pattern.
    #[must_use]
    pub fn with_default_pattern() -> Self {
        Self::new(&default_pattern()).expect("default pattern compiles")
    }

    /// Returns the configured pattern string.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the canonicalized path is audit-worthy.
    ///
    /// The match is anchored to the whole path.
    #[must_use]
    pub fn matches(&self, canonical_path: &str) -> bool {
        self.regex.is_match(canonical_path)
    }

    /// Extracts endpoint-specific enrichment for an already-matched path.
    ///
    /// `query` is the raw query string without the leading `?`. Lookup
    /// failures never propagate; they degrade to an empty enrichment and a
    /// diagnostic.
    pub fn enrich(
        &self,
        canonical_path: &str,
        query: &str,
        resolver: &dyn QueueTaskResolver,
    ) -> Enrichment {
        if let Some(rest) = canonical_path.strip_prefix("/queue/item/") {
            let id = rest.split('/').next().unwrap_or_default();
            return Enrichment {
                path_suffix: String::new(),
                extra: Self::resolve_task_extra(id, resolver),
            };
        }

        if canonical_path.starts_with("/queue/cancelItem") {
            let id = query_param(query, "id").unwrap_or_default();
            let path_suffix = if query.is_empty() {
                String::new()
            } else {
                format!("?{query}")
            };
            return Enrichment {
                path_suffix,
                extra: Self::resolve_task_extra(&id, resolver),
            };
        }

        if canonical_path.contains("/createItem") {
            let extra = query_param(query, "name")
                .map(|name| format!(" ({name})"))
                .unwrap_or_default();
            return Enrichment {
                path_suffix: String::new(),
                extra,
            };
        }

        Enrichment::default()
    }

    fn resolve_task_extra(raw_id: &str, resolver: &dyn QueueTaskResolver) -> String {
        let Ok(id) = raw_id.parse::<u64>() else {
            debug!(raw_id, "queue item id is not numeric, skipping enrichment");
            return String::new();
        };
        match resolver.task_url(id) {
            Some(url) => format!(" ({url})"),
            None => {
                debug!(id, "queue item not found, skipping enrichment");
                String::new()
            }
        }
    }

    /// Probes the pattern against every known keyword with crafted URLs.
    ///
    /// For each keyword whose legitimate URL (`/<keyword>`) matches, the
    /// prefix variant (`/static/forged/<keyword>`) and suffix variant
    /// (`/<keyword>/forged`) are probed; a variant that fails to match is a
    /// bypass. This is an administrative safety net only and never alters
    /// runtime matching.
    #[must_use]
    pub fn bypass_warnings(&self) -> Vec<BypassWarning> {
        KNOWN_KEYWORDS
            .iter()
            .filter_map(|keyword| {
                if !self.matches(&format!("/{keyword}")) {
                    return None;
                }
                let mut crafted_urls = Vec::new();
                let prefix_url = format!("/static/forged/{keyword}");
                if !self.matches(&prefix_url) {
                    crafted_urls.push(prefix_url);
                }
                let suffix_url = format!("/{keyword}/forged");
                if !self.matches(&suffix_url) {
                    crafted_urls.push(suffix_url);
                }
                if crafted_urls.is_empty() {
                    None
                } else {
                    Some(BypassWarning {
                        keyword: (*keyword).to_string(),
                        crafted_urls,
                    })
                }
            })
            .collect()
    }

    /// Returns true if the pattern can be evaded for at least one keyword.
    #[must_use]
    pub fn is_bypassable(&self) -> bool {
        !self.bypass_warnings().is_empty()
    }
}

/// Returns the decoded value of the first occurrence of `name` in a raw
/// query string.
#[must_use]
pub fn query_param(query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::canonicalize;

    struct FixedResolver;

    impl QueueTaskResolver for FixedResolver {
        fn task_url(&self, item_id: u64) -> Option<String> {
            (item_id == 42).then(|| "job/test-job/".to_string())
        }
    }

    #[test]
    fn test_default_pattern_matches_known_keywords() {
        let gate = AuditPatternGate::with_default_pattern();
        for keyword in KNOWN_KEYWORDS {
            assert!(gate.matches(&format!("/{keyword}")), "missed /{keyword}");
        }
    }

    #[test]
    fn test_default_pattern_resists_crafted_urls() {
        let gate = AuditPatternGate::with_default_pattern();
        for keyword in KNOWN_KEYWORDS {
            assert!(
                gate.matches(&canonicalize(&format!("/static/forged/{keyword}"))),
                "prefix bypass for {keyword}"
            );
            assert!(
                gate.matches(&canonicalize(&format!("/{keyword}/forged"))),
                "suffix bypass for {keyword}"
            );
        }
        assert!(!gate.is_bypassable());
    }

    #[test]
    fn test_match_is_full_string() {
        let gate = AuditPatternGate::new("/job/[^/]+/enable").unwrap();
        assert!(gate.matches("/job/test/enable"));
        assert!(!gate.matches("/prefix/job/test/enable"));
        assert!(!gate.matches("/job/test/enable/suffix"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = AuditPatternGate::new("(").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_non_matching_path() {
        let gate = AuditPatternGate::with_default_pattern();
        assert!(!gate.matches("/view/all/"));
    }

    #[test]
    fn test_legacy_default_is_bypassable() {
        assert!(is_legacy_default_pattern(LEGACY_DEFAULT_PATTERNS[0]));
        let gate = AuditPatternGate::new(LEGACY_DEFAULT_PATTERNS[0]).unwrap();
        let warnings = gate.bypass_warnings();
        assert!(!warnings.is_empty());
        // The legacy pattern has no /?.* suffix, so suffixed URLs escape it.
        assert!(warnings
            .iter()
            .any(|w| w.crafted_urls.iter().any(|u| u.ends_with("/forged"))));
    }

    #[test]
    fn test_enrich_queue_item() {
        let gate = AuditPatternGate::with_default_pattern();
        let enrichment = gate.enrich("/queue/item/42/cancelQueue", "", &FixedResolver);
        assert_eq!(enrichment.extra, " (job/test-job/)");
        assert!(enrichment.path_suffix.is_empty());
    }

    #[test]
    fn test_enrich_queue_item_gone() {
        let gate = AuditPatternGate::with_default_pattern();
        let enrichment = gate.enrich("/queue/item/7/cancelQueue", "", &FixedResolver);
        assert_eq!(enrichment, Enrichment::default());
    }

    #[test]
    fn test_enrich_queue_item_non_numeric_id() {
        let gate = AuditPatternGate::with_default_pattern();
        let enrichment = gate.enrich("/queue/item/abc/cancelQueue", "", &FixedResolver);
        assert_eq!(enrichment, Enrichment::default());
    }

    #[test]
    fn test_enrich_cancel_item_keeps_query() {
        let gate = AuditPatternGate::with_default_pattern();
        let enrichment = gate.enrich("/queue/cancelItem", "id=42", &FixedResolver);
        assert_eq!(enrichment.path_suffix, "?id=42");
        assert_eq!(enrichment.extra, " (job/test-job/)");
    }

    #[test]
    fn test_enrich_create_item_decodes_name() {
        let gate = AuditPatternGate::with_default_pattern();
        let enrichment = gate.enrich("/createItem", "name=Job%20With%20Space", &NoQueueResolver);
        assert_eq!(enrichment.extra, " (Job With Space)");
    }

    #[test]
    fn test_enrich_other_paths_empty() {
        let gate = AuditPatternGate::with_default_pattern();
        let enrichment = gate.enrich("/job/test/configSubmit", "", &NoQueueResolver);
        assert_eq!(enrichment, Enrichment::default());
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param("a=1&b=2", "b").as_deref(), Some("2"));
        assert_eq!(query_param("a=1", "missing"), None);
        assert_eq!(
            query_param("name=hello+world", "name").as_deref(),
            Some("hello world")
        );
    }
}
