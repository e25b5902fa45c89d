//! Directory importance tiers used to order traversal.
//!
//! Tiers are a visiting-order hint only. A directory can land in
//! [`PriorityTier::Excluded`] (searched last) without being pruned; hard pruning
//! is the job of the query's exclusion list.
use crate::error::Result;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path};

/// Importance tier, highest first. `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityTier {
    Source,
    Project,
    Config,
    Main,
    Modules,
    Utils,
    Build,
    Cache,
    Temp,
    Generated,
    Excluded,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 11] = [
        PriorityTier::Source,
        PriorityTier::Project,
        PriorityTier::Config,
        PriorityTier::Main,
        PriorityTier::Modules,
        PriorityTier::Utils,
        PriorityTier::Build,
        PriorityTier::Cache,
        PriorityTier::Temp,
        PriorityTier::Generated,
        PriorityTier::Excluded,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PriorityTier::Source => "SOURCE",
            PriorityTier::Project => "PROJECT",
            PriorityTier::Config => "CONFIG",
            PriorityTier::Main => "MAIN",
            PriorityTier::Modules => "MODULES",
            PriorityTier::Utils => "UTILS",
            PriorityTier::Build => "BUILD",
            PriorityTier::Cache => "CACHE",
            PriorityTier::Temp => "TEMP",
            PriorityTier::Generated => "GENERATED",
            PriorityTier::Excluded => "EXCLUDED",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default rule table: segment alternatives and the tier they map to.
///
/// Evaluated top to bottom. Noise directories come first so that a `src/`
/// nested inside `node_modules/` or `target/` still sorts with its noisy parent.
pub const DEFAULT_RULES: &[(&str, PriorityTier)] = &[
    (
        r"\.git|\.hg|\.svn|\.venv|venv|node_modules|\.tox|\.idea|\.vscode|\.eggs|site-packages",
        PriorityTier::Excluded,
    ),
    (
        r"generated|__generated__|gen|autogen|\.generated",
        PriorityTier::Generated,
    ),
    (r"tmp|temp|\.tmp|\.temp", PriorityTier::Temp),
    (
        r"\.cache|cache|__pycache__|\.pytest_cache|\.mypy_cache|\.ruff_cache|\.next|\.parcel-cache",
        PriorityTier::Cache,
    ),
    (r"build|dist|target|out|bin|obj|_build", PriorityTier::Build),
    (r"src|source|sources|lib|app|core", PriorityTier::Source),
    (
        r"tests?|docs?|scripts|examples|benches|spec|specs",
        PriorityTier::Project,
    ),
    (
        r"config|configs|conf|settings|etc|\.config|\.github",
        PriorityTier::Config,
    ),
    (
        r"modules|packages|pkg|vendor|third_party|external",
        PriorityTier::Modules,
    ),
    (r"utils?|helpers?|tools|common|shared", PriorityTier::Utils),
];

struct PriorityRule {
    pattern: Regex,
    tier: PriorityTier,
}

/// Classifies root-relative directory paths into tiers, first matching rule wins.
pub struct DirectoryPriority {
    rules: Vec<PriorityRule>,
}

impl DirectoryPriority {
    /// Builds a classifier from `(segment alternatives, tier)` pairs.
    ///
    /// Each entry is anchored to whole path segments, so `lib` matches
    /// `a/lib/b` but not `library`.
    pub fn with_rules(rules: &[(&str, PriorityTier)]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|(fragment, tier)| {
                let pattern = Regex::new(&format!(r"(?i)(?:^|/)(?:{fragment})(?:/|$)"))?;
                Ok(PriorityRule {
                    pattern,
                    tier: *tier,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Classifier over [`DEFAULT_RULES`].
    pub fn standard() -> Result<Self> {
        Self::with_rules(DEFAULT_RULES)
    }

    pub fn priority_of(&self, relative_dir: &Path) -> PriorityTier {
        let normalized = normalize(relative_dir);
        if normalized.is_empty() {
            return PriorityTier::Main;
        }
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(&normalized))
            .map(|rule| rule.tier)
            .unwrap_or(PriorityTier::Main)
    }
}

/// `/`-joined normal components, independent of the platform separator.
fn normalize(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(path: &str) -> PriorityTier {
        DirectoryPriority::standard().unwrap().priority_of(Path::new(path))
    }

    #[test]
    fn test_tier_ordering() {
        assert!(PriorityTier::Source < PriorityTier::Project);
        assert!(PriorityTier::Main < PriorityTier::Modules);
        assert!(PriorityTier::Generated < PriorityTier::Excluded);
        let mut sorted = PriorityTier::ALL;
        sorted.sort();
        assert_eq!(sorted, PriorityTier::ALL);
    }

    #[test]
    fn test_common_directories() {
        assert_eq!(tier("src"), PriorityTier::Source);
        assert_eq!(tier("crates/foo/src"), PriorityTier::Source);
        assert_eq!(tier("tests"), PriorityTier::Project);
        assert_eq!(tier("docs/guide"), PriorityTier::Project);
        assert_eq!(tier("config"), PriorityTier::Config);
        assert_eq!(tier("vendor"), PriorityTier::Modules);
        assert_eq!(tier("utils"), PriorityTier::Utils);
        assert_eq!(tier("target/debug"), PriorityTier::Build);
        assert_eq!(tier("__pycache__"), PriorityTier::Cache);
        assert_eq!(tier("tmp"), PriorityTier::Temp);
        assert_eq!(tier("generated"), PriorityTier::Generated);
        assert_eq!(tier(".git/objects"), PriorityTier::Excluded);
    }

    #[test]
    fn test_default_is_main() {
        assert_eq!(tier(""), PriorityTier::Main);
        assert_eq!(tier("photos/holiday"), PriorityTier::Main);
    }

    #[test]
    fn test_segment_anchoring() {
        assert_eq!(tier("library"), PriorityTier::Main);
        assert_eq!(tier("mysrc"), PriorityTier::Main);
        assert_eq!(tier("outbox"), PriorityTier::Main);
    }

    #[test]
    fn test_first_rule_wins() {
        assert_eq!(tier("node_modules/pkg/src"), PriorityTier::Excluded);
        assert_eq!(tier("src/build"), PriorityTier::Build);
    }

    #[test]
    fn test_custom_rules() {
        let priority = DirectoryPriority::with_rules(&[("important", PriorityTier::Source)]).unwrap();
        assert_eq!(priority.priority_of(Path::new("a/important")), PriorityTier::Source);
        assert_eq!(priority.priority_of(Path::new("src")), PriorityTier::Main);
    }

    #[test]
    fn test_invalid_rule_is_an_error() {
        assert!(DirectoryPriority::with_rules(&[("(", PriorityTier::Source)]).is_err());
    }
}
