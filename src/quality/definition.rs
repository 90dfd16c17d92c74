use serde::{Deserialize, Serialize};

/// A named quality tier with its ladder weight and expected sizes.
///
/// Definitions are seeded into the database at startup and loaded into a
/// [`QualityLadder`] for weight lookups. The ladder is strictly ordered by
/// weight; names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityDefinition {
    pub id: String,
    pub name: String,
    pub weight: i32,
    pub min_size_mb: Option<i64>,
    pub max_size_mb: Option<i64>,
    pub preferred_size_mb: Option<i64>,
    pub resolution: Option<i32>,
    pub source: Option<String>,
}

impl QualityDefinition {
    fn seed(name: &str, weight: i32, resolution: Option<i32>, source: Option<&str>) -> Self {
        Self {
            id: format!("qd-{weight:02}"),
            name: name.to_string(),
            weight,
            min_size_mb: None,
            max_size_mb: None,
            preferred_size_mb: None,
            resolution,
            source: source.map(str::to_string),
        }
    }

    /// The built-in ladder, worst to best.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::seed("WORKPRINT", 1, None, Some("WORKPRINT")),
            Self::seed("CAM", 2, None, Some("CAM")),
            Self::seed("TELESYNC", 3, None, Some("TELESYNC")),
            Self::seed("TELECINE", 4, None, Some("TELECINE")),
            Self::seed("DVDSCR", 5, None, Some("DVDSCR")),
            Self::seed("REGIONAL", 6, None, Some("REGIONAL")),
            Self::seed("SDTV", 7, Some(480), Some("SDTV")),
            Self::seed("DVD", 8, Some(480), Some("DVD")),
            Self::seed("HDTV-720p", 9, Some(720), Some("HDTV")),
            Self::seed("WEBRip-720p", 10, Some(720), Some("WEBRip")),
            Self::seed("WEBDL-720p", 11, Some(720), Some("WEBDL")),
            Self::seed("Bluray-720p", 12, Some(720), Some("Bluray")),
            Self::seed("HDTV-1080p", 13, Some(1080), Some("HDTV")),
            Self::seed("WEBRip-1080p", 14, Some(1080), Some("WEBRip")),
            Self::seed("WEBDL-1080p", 15, Some(1080), Some("WEBDL")),
            Self::seed("Bluray-1080p", 16, Some(1080), Some("Bluray")),
            Self::seed("Remux-1080p", 17, Some(1080), Some("Remux")),
            Self::seed("HDTV-2160p", 18, Some(2160), Some("HDTV")),
            Self::seed("WEBRip-2160p", 19, Some(2160), Some("WEBRip")),
            Self::seed("WEBDL-2160p", 20, Some(2160), Some("WEBDL")),
            Self::seed("Bluray-2160p", 21, Some(2160), Some("Bluray")),
            Self::seed("Remux-2160p", 22, Some(2160), Some("Remux")),
        ]
    }
}

/// Normalize a quality label to its group form: `WEBDL-1080p` and
/// `WEBRip-1080p` both become `WEB-1080p`. Labels without a WEB source
/// pass through unchanged.
#[must_use]
pub fn normalize_group(quality: &str) -> String {
    for prefix in ["WEBDL-", "WEBRip-", "WEB-DL-"] {
        if let Some(rest) = strip_prefix_ignore_case(quality, prefix) {
            return format!("WEB-{rest}");
        }
    }
    quality.to_string()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// The ordered set of quality definitions, supporting weight resolution.
#[derive(Debug, Clone)]
pub struct QualityLadder {
    definitions: Vec<QualityDefinition>,
}

impl QualityLadder {
    #[must_use]
    pub fn new(mut definitions: Vec<QualityDefinition>) -> Self {
        definitions.sort_by_key(|d| d.weight);
        Self { definitions }
    }

    #[must_use]
    pub fn defaults() -> Self {
        Self::new(QualityDefinition::defaults())
    }

    #[must_use]
    pub fn definitions(&self) -> &[QualityDefinition] {
        &self.definitions
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&QualityDefinition> {
        self.definitions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a quality label to its ladder weight.
    ///
    /// Direct name match first; otherwise fall back to the resolution token
    /// embedded in the label and take the *minimum* weight among matching
    /// definitions. Unresolvable labels weigh 0 so callers can stay
    /// conservative on unknowns.
    #[must_use]
    pub fn weight_for(&self, quality: &str) -> i32 {
        if let Some(def) = self.find(quality) {
            return def.weight;
        }

        let Some(resolution) = extract_resolution(quality) else {
            return 0;
        };

        self.definitions
            .iter()
            .filter(|d| d.resolution == Some(resolution))
            .map(|d| d.weight)
            .min()
            .unwrap_or(0)
    }

    /// Expected size in bytes for one hour of runtime at the given quality,
    /// from the definition's preferred size when set, with a resolution
    /// based fallback.
    #[must_use]
    pub fn expected_size_per_hour(&self, quality: &str) -> i64 {
        const MB: i64 = 1024 * 1024;

        if let Some(def) = self.find(quality)
            && let Some(preferred) = def.preferred_size_mb
        {
            return preferred * MB;
        }

        let per_hour_mb = match extract_resolution(quality) {
            Some(2160) => 12_000,
            Some(1080) => 4_000,
            Some(720) => 1_500,
            _ => 700,
        };
        per_hour_mb * MB
    }
}

/// Pull a resolution token out of a quality label or release title.
/// `4K` is treated as 2160p.
#[must_use]
pub fn extract_resolution(text: &str) -> Option<i32> {
    let lower = text.to_lowercase();
    if lower.contains("2160p") || lower.contains("4k") {
        Some(2160)
    } else if lower.contains("1080p") {
        Some(1080)
    } else if lower.contains("720p") {
        Some(720)
    } else if lower.contains("480p") {
        Some(480)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_weight_lookup() {
        let ladder = QualityLadder::defaults();
        assert_eq!(ladder.weight_for("WEBDL-1080p"), 15);
        assert_eq!(ladder.weight_for("Bluray-2160p"), 21);
        assert_eq!(ladder.weight_for("bluray-2160P"), 21);
    }

    #[test]
    fn resolution_fallback_takes_minimum() {
        let ladder = QualityLadder::defaults();
        // No "WEB-1080p" definition exists; the 1080p fallback picks the
        // lowest-weighted 1080p entry (HDTV-1080p).
        assert_eq!(ladder.weight_for("WEB-1080p"), 13);
        assert_eq!(ladder.weight_for("Something 4K"), 18);
    }

    #[test]
    fn unknown_quality_weighs_zero() {
        let ladder = QualityLadder::defaults();
        assert_eq!(ladder.weight_for("Nonsense"), 0);
    }

    #[test]
    fn group_normalization() {
        assert_eq!(normalize_group("WEBDL-1080p"), "WEB-1080p");
        assert_eq!(normalize_group("WEBRip-1080p"), "WEB-1080p");
        assert_eq!(normalize_group("Bluray-1080p"), "Bluray-1080p");
    }

    #[test]
    fn weights_are_strictly_ordered() {
        let defaults = QualityDefinition::defaults();
        let mut weights: Vec<i32> = defaults.iter().map(|d| d.weight).collect();
        let len_before = weights.len();
        weights.sort_unstable();
        weights.dedup();
        assert_eq!(weights.len(), len_before);
    }
}
