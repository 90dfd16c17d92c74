use crate::models::release::ParsedRelease;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    TitleContains,
    TitleRegex,
    ReleaseGroup,
    Source,
    Resolution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatRule {
    pub kind: RuleKind,
    pub value: String,
    #[serde(default)]
    pub negate: bool,
}

impl FormatRule {
    fn matches(&self, parsed: &ParsedRelease) -> bool {
        let hit = match self.kind {
            RuleKind::TitleContains => parsed
                .original_title
                .to_lowercase()
                .contains(&self.value.to_lowercase()),
            RuleKind::TitleRegex => regex::RegexBuilder::new(&self.value)
                .case_insensitive(true)
                .build()
                .is_ok_and(|re| re.is_match(&parsed.original_title)),
            RuleKind::ReleaseGroup => parsed
                .group
                .as_deref()
                .is_some_and(|g| g.eq_ignore_ascii_case(&self.value)),
            RuleKind::Source => parsed
                .quality
                .split('-')
                .next()
                .is_some_and(|s| s.eq_ignore_ascii_case(&self.value)),
            RuleKind::Resolution => parsed
                .resolution
                .is_some_and(|r| r.to_string() == self.value),
        };

        hit != self.negate
    }
}

/// A scored rule bundle. Matches when every rule matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFormat {
    pub id: String,
    pub name: String,
    pub score: i32,
    pub rules: Vec<FormatRule>,
}

impl CustomFormat {
    #[must_use]
    pub fn matches(&self, parsed: &ParsedRelease) -> bool {
        !self.rules.is_empty() && self.rules.iter().all(|r| r.matches(parsed))
    }
}

/// Total custom-format score for a release under a profile's overrides.
#[must_use]
pub fn score_release(
    formats: &[CustomFormat],
    overrides: &HashMap<String, i32>,
    parsed: &ParsedRelease,
) -> i32 {
    formats
        .iter()
        .filter(|f| f.matches(parsed))
        .map(|f| overrides.get(&f.id).copied().unwrap_or(f.score))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::release::parse_release_title;

    fn format(id: &str, score: i32, rules: Vec<FormatRule>) -> CustomFormat {
        CustomFormat {
            id: id.to_string(),
            name: id.to_string(),
            score,
            rules,
        }
    }

    fn rule(kind: RuleKind, value: &str) -> FormatRule {
        FormatRule {
            kind,
            value: value.to_string(),
            negate: false,
        }
    }

    #[test]
    fn all_rules_must_match() {
        let parsed = parse_release_title("Movie.Name.2023.1080p.WEB-DL.DDP5.1.Atmos-GRP");

        let atmos = format(
            "cf-atmos",
            25,
            vec![
                rule(RuleKind::TitleContains, "atmos"),
                rule(RuleKind::Resolution, "1080"),
            ],
        );
        assert!(atmos.matches(&parsed));

        let atmos_uhd = format(
            "cf-atmos-uhd",
            50,
            vec![
                rule(RuleKind::TitleContains, "atmos"),
                rule(RuleKind::Resolution, "2160"),
            ],
        );
        assert!(!atmos_uhd.matches(&parsed));
    }

    #[test]
    fn negated_rule_inverts() {
        let parsed = parse_release_title("Movie.Name.2023.1080p.WEB-DL-GRP");
        let no_cam = format(
            "cf-not-cam",
            5,
            vec![FormatRule {
                kind: RuleKind::Source,
                value: "CAM".to_string(),
                negate: true,
            }],
        );
        assert!(no_cam.matches(&parsed));
    }

    #[test]
    fn empty_rule_set_never_matches() {
        let parsed = parse_release_title("Movie.Name.2023.1080p.WEB-DL-GRP");
        assert!(!format("cf-empty", 10, vec![]).matches(&parsed));
    }

    #[test]
    fn profile_override_replaces_default_score() {
        let parsed = parse_release_title("Movie.Name.2023.1080p.WEB-DL.Atmos-GRP");
        let formats = vec![format(
            "cf-atmos",
            25,
            vec![rule(RuleKind::TitleContains, "atmos")],
        )];

        let mut overrides = HashMap::new();
        assert_eq!(score_release(&formats, &overrides, &parsed), 25);

        overrides.insert("cf-atmos".to_string(), -10);
        assert_eq!(score_release(&formats, &overrides, &parsed), -10);
    }
}
