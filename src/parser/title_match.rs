use crate::models::release::ParsedRelease;
use chrono::Datelike;
use regex::Regex;
use std::sync::OnceLock;

/// Words ignored when computing the overlap ratio. They still count when
/// tallying extra release words, so "The Movie" vs "A Movie" stays honest.
const ARTICLES: &[&str] = &[
    "the", "a", "an", "and", "of", "in", "on", "at", "to", "for",
];

/// Canonical form used on both sides of a title comparison: lowercase,
/// `a.i.` collapsed, ampersands spelled out, slashes as separators, all
/// remaining punctuation stripped, whitespace collapsed.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let mut s = title.to_lowercase();
    s = s.replace("a.i.", "ai");
    s = s.replace('&', " and ");
    s = s.replace(['/', '\\'], " ");
    s = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strict verdict on whether a parsed release is the expected title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    Match,
    WrongTitle,
    WrongYear,
    TvShapedForMovie,
}

impl TitleMatch {
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Validate a release against an expected title and optional year.
///
/// `is_movie` additionally rejects TV-shaped releases (`SxxEyy`,
/// `Season N`, `NxNN`, complete/mini-series markers).
#[must_use]
pub fn match_title(
    parsed: &ParsedRelease,
    expected_title: &str,
    expected_year: Option<i32>,
    is_movie: bool,
) -> TitleMatch {
    if is_movie && is_tv_shaped(parsed) {
        return TitleMatch::TvShapedForMovie;
    }

    if !words_match(&parsed.title_words, expected_title) {
        return TitleMatch::WrongTitle;
    }

    if is_movie && let Some(expected) = expected_year {
        match parsed.year {
            Some(year) if (year - expected).abs() <= 1 => {}
            Some(_) => return TitleMatch::WrongYear,
            None => {
                // Current-or-future movies share names with back catalog
                // content far too often to accept an undated release.
                if expected >= chrono::Utc::now().year() {
                    return TitleMatch::WrongYear;
                }
            }
        }
    }

    TitleMatch::Match
}

fn is_tv_shaped(parsed: &ParsedRelease) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2}x\d{2}|complete[ ._]series|mini[- ._]?series)\b")
            .expect("Invalid regex")
    });

    parsed.is_tv_shaped() || re.is_match(&parsed.original_title)
}

fn words_match(release_words: &[String], expected_title: &str) -> bool {
    let normalized = normalize_title(expected_title);
    let expected_all: Vec<&str> = normalized.split_whitespace().collect();
    let expected_content: Vec<&str> = expected_all
        .iter()
        .copied()
        .filter(|w| !ARTICLES.contains(w))
        .collect();

    if expected_content.is_empty() || release_words.is_empty() {
        return false;
    }

    let matched = expected_content
        .iter()
        .filter(|w| release_words.iter().any(|rw| rw == *w))
        .count();

    if (matched as f64) / (expected_content.len() as f64) < 0.8 {
        return false;
    }

    // The first content word must sit at the front of the release title,
    // otherwise "Masters of the Universe" accepts
    // "He-Man and the Masters of the Universe".
    let max_position = if expected_content.len() <= 2 { 1 } else { 2 };
    let first_position = release_words
        .iter()
        .position(|w| w == expected_content[0]);
    match first_position {
        Some(pos) if pos <= max_position => {}
        _ => return false,
    }

    let extra = release_words
        .iter()
        .filter(|rw| !expected_all.contains(&rw.as_str()))
        .count();
    let allowed_extra = if expected_content.len() <= 2 {
        1
    } else {
        2.max(matched / 2)
    };

    extra <= allowed_extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::release::parse_release_title;

    #[test]
    fn normalization_rules() {
        assert_eq!(normalize_title("A.I. Artificial Intelligence"), "ai artificial intelligence");
        assert_eq!(normalize_title("Fast & Furious"), "fast and furious");
        assert_eq!(normalize_title("Face/Off"), "face off");
        assert_eq!(normalize_title("Don't   Look Up!"), "don t look up");
    }

    #[test]
    fn exact_title_matches() {
        let parsed = parse_release_title("The.Matrix.1999.1080p.BluRay.x264-GRP");
        assert!(match_title(&parsed, "The Matrix", Some(1999), true).is_match());
    }

    #[test]
    fn year_off_by_one_is_tolerated() {
        let parsed = parse_release_title("The.Matrix.1998.1080p.BluRay.x264-GRP");
        assert!(match_title(&parsed, "The Matrix", Some(1999), true).is_match());

        let parsed = parse_release_title("The.Matrix.1996.1080p.BluRay.x264-GRP");
        assert_eq!(
            match_title(&parsed, "The Matrix", Some(1999), true),
            TitleMatch::WrongYear
        );
    }

    #[test]
    fn missing_year_rejected_for_upcoming_movies() {
        let parsed = parse_release_title("Future.Movie.1080p.WEB-DL-GRP");
        assert_eq!(
            match_title(&parsed, "Future Movie", Some(2999), true),
            TitleMatch::WrongYear
        );
        // Back-catalog titles tolerate an undated release.
        assert!(match_title(&parsed, "Future Movie", Some(2001), true).is_match());
    }

    #[test]
    fn prefix_hijack_rejected() {
        // S3: the first expected content word ("masters") appears too deep
        // in the candidate title.
        let parsed =
            parse_release_title("He-Man.and.the.Masters.of.the.Universe.2021.1080p.WEB-GRP");
        assert_eq!(
            match_title(&parsed, "Masters of the Universe", Some(2025), true),
            TitleMatch::WrongTitle
        );
    }

    #[test]
    fn tv_release_rejected_for_movie() {
        // S4: an episode release offered against a movie search.
        let parsed = parse_release_title("Severance.S02E03.1080p.WEB-GRP");
        assert_eq!(
            match_title(&parsed, "Severance", Some(2025), true),
            TitleMatch::TvShapedForMovie
        );
    }

    #[test]
    fn nxnn_shape_rejected_for_movie() {
        let parsed = parse_release_title("Severance.2x03.1080p.WEB-GRP");
        assert_eq!(
            match_title(&parsed, "Severance", None, true),
            TitleMatch::TvShapedForMovie
        );
    }

    #[test]
    fn episode_shape_allowed_for_series() {
        let parsed = parse_release_title("Severance.S02E03.1080p.WEB-GRP");
        assert!(match_title(&parsed, "Severance", None, false).is_match());
    }

    #[test]
    fn unrelated_extra_words_rejected() {
        let parsed = parse_release_title("Dune.Part.Two.Extended.Fan.Edit.2024.1080p.WEB-GRP");
        assert_eq!(
            match_title(&parsed, "Dune", Some(2021), true),
            TitleMatch::WrongTitle
        );
    }

    #[test]
    fn partial_overlap_below_threshold_rejected() {
        let parsed = parse_release_title("Lord.of.the.Rings.2001.1080p.BluRay-GRP");
        assert_eq!(
            match_title(
                &parsed,
                "Lord of the Rings The Fellowship of the Ring",
                Some(2001),
                true
            ),
            TitleMatch::WrongTitle
        );
    }
}
