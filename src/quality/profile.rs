use super::definition::{QualityLadder, normalize_group};
use crate::config::PropersPreference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMediaType {
    Movie,
    Series,
    Both,
}

impl ProfileMediaType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::Both => "both",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "movie" => Self::Movie,
            "series" => Self::Series,
            _ => Self::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileItem {
    pub quality: String,
    pub allowed: bool,
}

/// Proper/repack state of a release or library file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProperFlags {
    pub is_proper: bool,
    pub is_repack: bool,
}

impl ProperFlags {
    #[must_use]
    pub const fn any(self) -> bool {
        self.is_proper || self.is_repack
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: String,
    pub name: String,
    pub media_type: ProfileMediaType,
    /// Quality name at which the profile is satisfied.
    pub cutoff: String,
    pub upgrade_allowed: bool,
    pub min_format_score: i32,
    /// Ordered worst to best.
    pub items: Vec<ProfileItem>,
    /// Per-profile custom-format score overrides, keyed by format id.
    pub format_scores: HashMap<String, i32>,
}

impl QualityProfile {
    #[must_use]
    pub fn default_profile() -> Self {
        let allowed = [
            "HDTV-720p",
            "WEBRip-720p",
            "WEBDL-720p",
            "Bluray-720p",
            "HDTV-1080p",
            "WEBRip-1080p",
            "WEBDL-1080p",
            "Bluray-1080p",
        ];

        Self {
            id: "profile-default".to_string(),
            name: "HD".to_string(),
            media_type: ProfileMediaType::Both,
            cutoff: "Bluray-1080p".to_string(),
            upgrade_allowed: true,
            min_format_score: 0,
            items: allowed
                .iter()
                .map(|q| ProfileItem {
                    quality: (*q).to_string(),
                    allowed: true,
                })
                .collect(),
            format_scores: HashMap::new(),
        }
    }

    /// Whether a quality label is allowed by this profile.
    ///
    /// Tries the label directly, then retries with both sides normalized to
    /// group form so `WEBDL-1080p` matches a profile listing `WEB-1080p`
    /// and vice versa.
    #[must_use]
    pub fn meets_profile(&self, quality: &str) -> bool {
        let direct = self
            .items
            .iter()
            .any(|item| item.allowed && item.quality.eq_ignore_ascii_case(quality));
        if direct {
            return true;
        }

        let group = normalize_group(quality);
        self.items.iter().any(|item| {
            item.allowed && normalize_group(&item.quality).eq_ignore_ascii_case(&group)
        })
    }

    /// Whether a library file at `quality` satisfies the cutoff.
    ///
    /// Requires both weights to resolve: an unknown quality never counts as
    /// satisfied, so nothing gets silently dropped from upgrade sweeps.
    #[must_use]
    pub fn meets_cutoff(&self, ladder: &QualityLadder, quality: &str) -> bool {
        let current = ladder.weight_for(quality);
        let cutoff = ladder.weight_for(&self.cutoff);
        current > 0 && cutoff > 0 && current >= cutoff
    }

    /// Full upgrade decision between a library file and a candidate release.
    #[must_use]
    pub fn should_upgrade(
        &self,
        ladder: &QualityLadder,
        current: &str,
        current_flags: ProperFlags,
        candidate: &str,
        candidate_flags: ProperFlags,
        preference: PropersPreference,
    ) -> bool {
        if !self.upgrade_allowed {
            return false;
        }

        let current_group = normalize_group(current);
        let candidate_group = normalize_group(candidate);
        let current_weight = ladder.weight_for(&current_group);
        let candidate_weight = ladder.weight_for(&candidate_group);

        if candidate_weight < current_weight {
            return false;
        }

        if candidate_weight == current_weight {
            if current_flags.any() {
                return false;
            }
            if candidate_flags.any()
                && matches!(
                    preference,
                    PropersPreference::PreferAndUpgrade | PropersPreference::DoNotPrefer
                )
            {
                return self.meets_profile(candidate);
            }
            return false;
        }

        if self.meets_cutoff(ladder, &current_group) {
            return false;
        }

        candidate_weight > current_weight && self.meets_profile(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> QualityProfile {
        QualityProfile::default_profile()
    }

    fn uhd_profile() -> QualityProfile {
        let mut p = profile();
        p.cutoff = "Bluray-2160p".to_string();
        for q in ["HDTV-2160p", "WEBDL-2160p", "Bluray-2160p", "Remux-2160p"] {
            p.items.push(ProfileItem {
                quality: q.to_string(),
                allowed: true,
            });
        }
        p
    }

    #[test]
    fn meets_profile_direct_and_group() {
        let p = profile();
        assert!(p.meets_profile("WEBDL-1080p"));
        assert!(p.meets_profile("webdl-1080p"));
        // WEBRip normalizes into the same WEB group as WEBDL.
        assert!(p.meets_profile("WEBRip-1080p"));
        assert!(!p.meets_profile("CAM"));
        assert!(!p.meets_profile("Remux-2160p"));
    }

    #[test]
    fn meets_cutoff_requires_resolvable_weights() {
        let ladder = QualityLadder::defaults();
        let p = profile();
        assert!(p.meets_cutoff(&ladder, "Bluray-1080p"));
        assert!(p.meets_cutoff(&ladder, "Remux-2160p"));
        assert!(!p.meets_cutoff(&ladder, "WEBDL-1080p"));
        assert!(!p.meets_cutoff(&ladder, "Mystery"));
    }

    #[test]
    fn upgrade_blocked_when_disabled() {
        let ladder = QualityLadder::defaults();
        let mut p = profile();
        p.upgrade_allowed = false;

        assert!(!p.should_upgrade(
            &ladder,
            "HDTV-720p",
            ProperFlags::default(),
            "Bluray-1080p",
            ProperFlags::default(),
            PropersPreference::PreferAndUpgrade,
        ));
    }

    #[test]
    fn plain_quality_upgrade() {
        let ladder = QualityLadder::defaults();
        let p = profile();

        assert!(p.should_upgrade(
            &ladder,
            "WEBDL-720p",
            ProperFlags::default(),
            "WEBDL-1080p",
            ProperFlags::default(),
            PropersPreference::PreferAndUpgrade,
        ));
        assert!(!p.should_upgrade(
            &ladder,
            "WEBDL-1080p",
            ProperFlags::default(),
            "WEBDL-720p",
            ProperFlags::default(),
            PropersPreference::PreferAndUpgrade,
        ));
    }

    #[test]
    fn proper_upgrades_at_same_weight() {
        let ladder = QualityLadder::defaults();
        let p = profile();
        let proper = ProperFlags {
            is_proper: true,
            is_repack: false,
        };

        // S1: existing WEBDL-1080p (not proper), candidate PROPER at the
        // same quality with preferAndUpgrade.
        assert!(p.should_upgrade(
            &ladder,
            "WEBDL-1080p",
            ProperFlags::default(),
            "WEBDL-1080p",
            proper,
            PropersPreference::PreferAndUpgrade,
        ));

        // Current already proper: never replaced at equal weight.
        assert!(!p.should_upgrade(
            &ladder,
            "WEBDL-1080p",
            proper,
            "WEBDL-1080p",
            proper,
            PropersPreference::PreferAndUpgrade,
        ));

        // doNotUpgrade preference suppresses the proper swap.
        assert!(!p.should_upgrade(
            &ladder,
            "WEBDL-1080p",
            ProperFlags::default(),
            "WEBDL-1080p",
            proper,
            PropersPreference::DoNotUpgrade,
        ));
    }

    #[test]
    fn cutoff_met_short_circuits() {
        let ladder = QualityLadder::defaults();
        let p = uhd_profile();

        // S2: file at Bluray-2160p with a Bluray-2160p cutoff; a Remux
        // candidate is above the cutoff but the cutoff is already met.
        assert!(!p.should_upgrade(
            &ladder,
            "Bluray-2160p",
            ProperFlags::default(),
            "Remux-2160p",
            ProperFlags::default(),
            PropersPreference::PreferAndUpgrade,
        ));
    }

    #[test]
    fn upgrade_requires_allowed_candidate() {
        let ladder = QualityLadder::defaults();
        let p = profile();

        // Remux-2160p outranks the current file but is not in the profile.
        assert!(!p.should_upgrade(
            &ladder,
            "WEBDL-720p",
            ProperFlags::default(),
            "Remux-2160p",
            ProperFlags::default(),
            PropersPreference::PreferAndUpgrade,
        ));
    }
}
