use crate::models::release::{ParsedRelease, Release};
use crate::parser::release::parse_release_title;
use crate::parser::title_match::{TitleMatch, match_title, normalize_title};
use crate::quality::{CustomFormat, QualityLadder, QualityProfile, score_release};
use std::collections::HashSet;
use tracing::debug;

/// Everything the selector needs to judge one batch of candidates.
pub struct SelectionRequest<'a> {
    pub profile: &'a QualityProfile,
    pub ladder: &'a QualityLadder,
    pub formats: &'a [CustomFormat],
    pub expected_title: &'a str,
    pub expected_year: Option<i32>,
    pub is_movie: bool,
    /// Runtime used to judge size plausibility; falls back to a genre
    /// typical length when unknown.
    pub runtime_minutes: Option<i32>,
    /// Normalized release titles that must never be grabbed again.
    pub blacklist: &'a HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct ScoredRelease {
    pub release: Release,
    pub parsed: ParsedRelease,
    pub base_score: i32,
    pub format_score: i32,
}

impl ScoredRelease {
    #[must_use]
    pub const fn total(&self) -> i32 {
        self.base_score + self.format_score
    }
}

/// Score all candidates and return the best one, or nothing when every
/// candidate fails a hard predicate.
#[must_use]
pub fn select_best(candidates: Vec<Release>, request: &SelectionRequest<'_>) -> Option<ScoredRelease> {
    let mut scored: Vec<ScoredRelease> = candidates
        .into_iter()
        .filter_map(|release| evaluate(release, request))
        .collect();

    scored.sort_by_key(|s| std::cmp::Reverse(s.total()));
    scored.into_iter().next()
}

/// Evaluate one candidate. `None` means rejected outright.
#[must_use]
pub fn evaluate(release: Release, request: &SelectionRequest<'_>) -> Option<ScoredRelease> {
    if request.blacklist.contains(&normalize_title(&release.title)) {
        debug!(title = %release.title, "Rejected: blacklisted");
        return None;
    }

    let parsed = parse_release_title(&release.title);

    let verdict = match_title(
        &parsed,
        request.expected_title,
        request.expected_year,
        request.is_movie,
    );
    if verdict != TitleMatch::Match {
        debug!(title = %release.title, ?verdict, "Rejected: title mismatch");
        return None;
    }

    if !request.profile.meets_profile(&parsed.quality) {
        debug!(title = %release.title, quality = %parsed.quality, "Rejected: quality not in profile");
        return None;
    }

    let format_score = score_release(request.formats, &request.profile.format_scores, &parsed);
    if format_score < request.profile.min_format_score {
        debug!(
            title = %release.title,
            format_score,
            minimum = request.profile.min_format_score,
            "Rejected: below custom-format minimum"
        );
        return None;
    }

    let base_score = base_score(&release, &parsed, request);
    if base_score <= 0 {
        return None;
    }

    Some(ScoredRelease {
        release,
        parsed,
        base_score,
        format_score,
    })
}

fn base_score(release: &Release, parsed: &ParsedRelease, request: &SelectionRequest<'_>) -> i32 {
    let ladder = request.ladder;
    let mut score = 100;

    let weight = ladder.weight_for(&parsed.quality);
    let cutoff_weight = ladder.weight_for(&request.profile.cutoff);

    if weight == cutoff_weight {
        score += 50;
    } else if weight < cutoff_weight {
        score -= (5 * (cutoff_weight - weight)).min(40);
    } else {
        // Oversized releases above the cutoff cost bandwidth for quality
        // the profile does not ask for.
        score -= (2 * (weight - cutoff_weight)).min(20);
    }

    if let Some(seeders) = release.seeders {
        score += (seeders as i32 / 2).min(50);
    }

    if let Some(size) = release.size.filter(|s| *s > 0) {
        let runtime_minutes = request
            .runtime_minutes
            .unwrap_or(if request.is_movie { 105 } else { 45 });
        let expected =
            ladder.expected_size_per_hour(&parsed.quality) * i64::from(runtime_minutes) / 60;

        if expected > 0 {
            let ratio = size as f64 / expected as f64;
            if !(0.3..=3.0).contains(&ratio) {
                score -= 50;
            } else if !(0.5..=2.0).contains(&ratio) {
                score -= 20;
            }
        }
    }

    if parsed.quality.starts_with("WEBDL") || parsed.quality.starts_with("Bluray") {
        score += 20;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::release::Protocol;

    fn release(title: &str, seeders: u32, size_gb: f64) -> Release {
        Release {
            title: title.to_string(),
            guid: format!("guid-{title}"),
            download_url: format!("https://indexer.example/{title}.torrent"),
            size: Some((size_gb * 1024.0 * 1024.0 * 1024.0) as i64),
            seeders: Some(seeders),
            leechers: None,
            indexer_id: "ix-1".to_string(),
            indexer: "Test".to_string(),
            protocol: Protocol::Torrent,
            publish_date: None,
        }
    }

    fn ladder() -> QualityLadder {
        QualityLadder::defaults()
    }

    fn request<'a>(
        profile: &'a QualityProfile,
        ladder: &'a QualityLadder,
        blacklist: &'a HashSet<String>,
    ) -> SelectionRequest<'a> {
        SelectionRequest {
            profile,
            ladder,
            formats: &[],
            expected_title: "The Matrix",
            expected_year: Some(1999),
            is_movie: true,
            runtime_minutes: Some(120),
            blacklist,
        }
    }

    #[test]
    fn picks_the_cutoff_quality_over_lower_tiers() {
        let profile = QualityProfile::default_profile();
        let ladder = ladder();
        let blacklist = HashSet::new();
        let req = request(&profile, &ladder, &blacklist);

        let best = select_best(
            vec![
                release("The.Matrix.1999.720p.HDTV.x264-GRP", 30, 2.0),
                release("The.Matrix.1999.1080p.BluRay.x264-GRP", 30, 8.0),
                release("The.Matrix.1999.1080p.WEB-DL.x264-GRP", 30, 8.0),
            ],
            &req,
        )
        .unwrap();

        assert_eq!(best.parsed.quality, "Bluray-1080p");
    }

    #[test]
    fn blacklisted_title_never_selected() {
        let profile = QualityProfile::default_profile();
        let ladder = ladder();
        let mut blacklist = HashSet::new();
        blacklist.insert(normalize_title("The.Matrix.1999.1080p.BluRay.x264-GRP"));
        let req = request(&profile, &ladder, &blacklist);

        let best = select_best(
            vec![release("The.Matrix.1999.1080p.BluRay.x264-GRP", 100, 8.0)],
            &req,
        );
        assert!(best.is_none());
    }

    #[test]
    fn wrong_title_rejected() {
        let profile = QualityProfile::default_profile();
        let ladder = ladder();
        let blacklist = HashSet::new();
        let req = request(&profile, &ladder, &blacklist);

        assert!(select_best(
            vec![release("Completely.Different.1999.1080p.BluRay-GRP", 50, 8.0)],
            &req
        )
        .is_none());
    }

    #[test]
    fn quality_outside_profile_rejected() {
        let profile = QualityProfile::default_profile();
        let ladder = ladder();
        let blacklist = HashSet::new();
        let req = request(&profile, &ladder, &blacklist);

        assert!(select_best(vec![release("The.Matrix.1999.HDCAM-GRP", 500, 1.0)], &req).is_none());
    }

    #[test]
    fn implausible_size_penalized() {
        let profile = QualityProfile::default_profile();
        let ladder = ladder();
        let blacklist = HashSet::new();
        let req = request(&profile, &ladder, &blacklist);

        // Identical releases except a 100 MB fake gets penalized.
        let best = select_best(
            vec![
                release("The.Matrix.1999.1080p.BluRay.x264-TINY", 30, 0.1),
                release("The.Matrix.1999.1080p.BluRay.x264-REAL", 30, 8.0),
            ],
            &req,
        )
        .unwrap();

        assert_eq!(best.parsed.group.as_deref(), Some("REAL"));
    }

    #[test]
    fn custom_format_minimum_enforced() {
        let mut profile = QualityProfile::default_profile();
        profile.min_format_score = 10;
        let ladder = ladder();
        let blacklist = HashSet::new();
        let req = request(&profile, &ladder, &blacklist);

        // No formats configured, so every candidate scores 0 < 10.
        assert!(select_best(
            vec![release("The.Matrix.1999.1080p.BluRay.x264-GRP", 30, 8.0)],
            &req
        )
        .is_none());
    }

    #[test]
    fn seeders_break_ties() {
        let profile = QualityProfile::default_profile();
        let ladder = ladder();
        let blacklist = HashSet::new();
        let req = request(&profile, &ladder, &blacklist);

        let best = select_best(
            vec![
                release("The.Matrix.1999.1080p.BluRay.x264-FEW", 2, 8.0),
                release("The.Matrix.1999.1080p.BluRay.x264-MANY", 80, 8.0),
            ],
            &req,
        )
        .unwrap();

        assert_eq!(best.parsed.group.as_deref(), Some("MANY"));
    }
}
