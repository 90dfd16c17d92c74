use crate::models::release::ParsedRelease;
use regex::Regex;
use std::sync::OnceLock;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Parse a release title into its structured fields.
///
/// Never fails: a title that matches nothing still yields its normalized
/// words with a default quality, and the matcher decides what to do with it.
#[must_use]
pub fn parse_release_title(title: &str) -> ParsedRelease {
    let (season, episodes, is_season_pack) = parse_season_episodes(title);
    let year = extract_year(title);
    let (quality, resolution) = detect_quality(title);

    ParsedRelease {
        original_title: title.to_string(),
        title_words: extract_title_words(title),
        year,
        season,
        episodes,
        is_season_pack,
        quality,
        resolution,
        video_codec: extract_video_codec(title),
        audio_codec: extract_audio_codec(title),
        group: extract_group(title),
        is_proper: detect_word(title, "PROPER"),
        is_repack: detect_word(title, "REPACK") || detect_word(title, "RERIP"),
    }
}

/// Case-insensitive word-boundary check, used for proper/repack detection
/// on release titles and stored file paths alike.
#[must_use]
pub fn detect_word(text: &str, word: &str) -> bool {
    let pattern = format!(r"(?i)\b{word}\b");
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

/// Detect the quality label of a release title.
///
/// Low-quality sources win outright and are returned as bare labels.
/// Everything else composes `<source>-<resolution>`, defaulting to 1080p
/// when no resolution token is present and WEB when no source is.
#[must_use]
pub fn detect_quality(title: &str) -> (String, Option<u16>) {
    static LOW: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let low = LOW.get_or_init(|| {
        [
            (r"(?i)\bworkprint\b", "WORKPRINT"),
            (r"(?i)\b(hd-?cam|cam(rip)?)\b", "CAM"),
            (r"(?i)\b(telesync|hd-?ts|pdvd|ts-?rip)\b", "TELESYNC"),
            (r"(?i)\b(telecine|hd-?tc)\b", "TELECINE"),
            (r"(?i)\b(dvd-?scr(eener)?|screener)\b", "DVDSCR"),
            (r"(?i)\bregional\b", "REGIONAL"),
        ]
        .iter()
        .map(|(p, label)| (Regex::new(p).expect("Invalid regex"), *label))
        .collect()
    });

    for (re, label) in low {
        if re.is_match(title) {
            return ((*label).to_string(), None);
        }
    }

    let resolution = extract_resolution_token(title);
    let source = detect_source(title);
    let res = resolution.unwrap_or(1080);

    (format!("{source}-{res}p"), Some(res))
}

fn detect_source(title: &str) -> String {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let rules = RULES.get_or_init(|| {
        [
            (r"(?i)\bremux\b", "Remux"),
            (r"(?i)\b(blu-?ray|bd(rip)?|brrip)\b", "Bluray"),
            (r"(?i)\bweb[-. ]?dl\b", "WEBDL"),
            (r"(?i)\bweb-?rip\b", "WEBRip"),
            (r"(?i)\bhdtv\b", "HDTV"),
            (r"(?i)\b(dvdrip|dvd)\b", "DVD"),
            (r"(?i)\bsdtv\b", "SDTV"),
            (r"(?i)\bweb\b", "WEB"),
        ]
        .iter()
        .map(|(p, label)| (Regex::new(p).expect("Invalid regex"), *label))
        .collect()
    });

    for (re, label) in rules {
        if re.is_match(title) {
            return (*label).to_string();
        }
    }
    "WEB".to_string()
}

fn extract_resolution_token(title: &str) -> Option<u16> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)\b(2160p|1080p|720p|480p|4k)\b");

    let token = re.find(title)?.as_str().to_lowercase();
    match token.as_str() {
        "2160p" | "4k" => Some(2160),
        "1080p" => Some(1080),
        "720p" => Some(720),
        _ => Some(480),
    }
}

fn extract_year(title: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\b(19\d{2}|20\d{2})\b");

    // The last year-looking token wins: titles like "1917 2019" carry the
    // release year after the name.
    re.find_iter(title)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_season_episodes(title: &str) -> (Option<i32>, Vec<i32>, bool) {
    static EPISODE_RE: OnceLock<Regex> = OnceLock::new();
    static EXTRA_RE: OnceLock<Regex> = OnceLock::new();
    static PACK_RE: OnceLock<Regex> = OnceLock::new();
    static SEASON_WORD_RE: OnceLock<Regex> = OnceLock::new();

    // Continuations must be E-prefixed (S01E01E02, S01E01-E02, space
    // variants) or a bare dash range (S01E01-04); a bare space before
    // digits would swallow resolution tokens.
    let episode_re = get_regex(
        &EPISODE_RE,
        r"(?i)\bS(?P<season>\d{1,2})E(?P<episode>\d{1,3})(?P<rest>(?:(?:[-\s])?E\d{1,3}|-\d{1,3})*)",
    );

    if let Some(caps) = episode_re.captures(title) {
        let season = caps["season"].parse().ok();
        let mut episodes: Vec<i32> = Vec::new();
        if let Ok(first) = caps["episode"].parse() {
            episodes.push(first);
        }

        let extra_re = get_regex(&EXTRA_RE, r"\d{1,3}");
        if let Some(rest) = caps.name("rest") {
            for m in extra_re.find_iter(rest.as_str()) {
                if let Ok(n) = m.as_str().parse::<i32>() {
                    episodes.push(n);
                }
            }
        }

        // An E01-E04 style span expands to the full range.
        if episodes.len() == 2 && episodes[1] > episodes[0] + 1 {
            episodes = (episodes[0]..=episodes[1]).collect();
        }
        episodes.dedup();

        return (season, episodes, false);
    }

    let pack_re = get_regex(&PACK_RE, r"(?i)\bS(?P<season>\d{1,2})\b");
    if let Some(caps) = pack_re.captures(title) {
        return (caps["season"].parse().ok(), Vec::new(), true);
    }

    let season_word_re = get_regex(&SEASON_WORD_RE, r"(?i)\bSeason[ ._](?P<season>\d{1,2})\b");
    if let Some(caps) = season_word_re.captures(title) {
        return (caps["season"].parse().ok(), Vec::new(), true);
    }

    (None, Vec::new(), false)
}

fn extract_video_codec(title: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)\b(x264|x265|h\.?264|h\.?265|hevc|av1|xvid)\b");

    re.find(title)
        .map(|m| m.as_str().to_lowercase().replace('.', ""))
}

fn extract_audio_codec(title: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)\b(ddp?5[ .]1|ddp|dd|eac3|ac3|aac|dts(-?hd)?|truehd|flac|opus)\b",
    );

    re.find(title).map(|m| m.as_str().to_uppercase())
}

fn extract_group(title: &str) -> Option<String> {
    static BRACKET_RE: OnceLock<Regex> = OnceLock::new();
    static DASH_RE: OnceLock<Regex> = OnceLock::new();

    let bracket_re = get_regex(&BRACKET_RE, r"^\[(?P<group>[^\]]+)\]");
    if let Some(caps) = bracket_re.captures(title) {
        return Some(caps["group"].trim().to_string());
    }

    let dash_re = get_regex(&DASH_RE, r"-(?P<group>[A-Za-z0-9]+)(?:\[[^\]]*\])?$");
    let caps = dash_re.captures(title.trim())?;
    let group = caps["group"].to_string();

    // Trailing tokens that look like metadata are not release groups.
    let lower = group.to_lowercase();
    let blocked = [
        "proper", "repack", "rerip", "internal", "web", "webrip", "hdtv", "remux",
    ];
    if blocked.contains(&lower.as_str()) || group.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(group)
}

/// The normalized words of the portion of the title before the first
/// boundary token (year, SxxEyy, resolution or source tag).
fn extract_title_words(title: &str) -> Vec<String> {
    static BOUNDARY_RE: OnceLock<Regex> = OnceLock::new();
    let boundary_re = get_regex(
        &BOUNDARY_RE,
        r"(?i)\b(19\d{2}|20\d{2}|S\d{1,2}(E\d{1,3})?|Season[ ._]\d{1,2}|2160p|1080p|720p|480p|4k|remux|blu-?ray|bd(rip)?|brrip|web[-. ]?dl|web-?rip|web|hdtv|dvdrip|dvd|sdtv|cam|hd-?cam|telesync|telecine|dvdscr|screener|workprint)\b",
    );

    // Strip a leading [Group] tag before looking for the boundary.
    let stripped = if title.starts_with('[') {
        title.split_once(']').map_or(title, |(_, rest)| rest)
    } else {
        title
    };

    // A boundary token at position zero is part of the name (e.g. the
    // movie "1917"); cut at the first one that has words before it.
    let head = boundary_re
        .find_iter(stripped)
        .find(|m| stripped[..m.start()].chars().any(char::is_alphanumeric))
        .map_or(stripped, |m| &stripped[..m.start()]);

    crate::parser::title_match::normalize_title(head)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_movie_release() {
        let parsed = parse_release_title("Some.Movie.2023.1080p.BluRay.x264-GROUP");
        assert_eq!(parsed.title_words, vec!["some", "movie"]);
        assert_eq!(parsed.year, Some(2023));
        assert_eq!(parsed.quality, "Bluray-1080p");
        assert_eq!(parsed.resolution, Some(1080));
        assert_eq!(parsed.video_codec.as_deref(), Some("x264"));
        assert_eq!(parsed.group.as_deref(), Some("GROUP"));
        assert!(!parsed.is_tv_shaped());
    }

    #[test]
    fn parses_episode_release() {
        let parsed = parse_release_title("Show.Name.S02E05.720p.WEB-DL.H264-GRP");
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episodes, vec![5]);
        assert!(!parsed.is_season_pack);
        assert_eq!(parsed.quality, "WEBDL-720p");
        assert!(parsed.is_tv_shaped());
    }

    #[test]
    fn parses_multi_episode_span() {
        let parsed = parse_release_title("Show.S01E01E02.1080p.WEB-DL-GRP");
        assert_eq!(parsed.episodes, vec![1, 2]);

        let ranged = parse_release_title("Show.S01E01-E04.1080p.WEB-DL-GRP");
        assert_eq!(ranged.episodes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn space_separated_resolution_is_not_an_episode() {
        let parsed = parse_release_title("Show Name S01E01 1080p WEB-DL");
        assert_eq!(parsed.episodes, vec![1]);
    }

    #[test]
    fn parses_season_pack() {
        let parsed = parse_release_title("Show.Name.S03.1080p.BluRay.x265-GRP");
        assert_eq!(parsed.season, Some(3));
        assert!(parsed.is_season_pack);
        assert!(parsed.episodes.is_empty());

        let worded = parse_release_title("Show Name Season 2 1080p WEB-DL");
        assert_eq!(worded.season, Some(2));
        assert!(worded.is_season_pack);
    }

    #[test]
    fn low_quality_sources_win() {
        assert_eq!(detect_quality("Movie.2024.HDCAM.x264").0, "CAM");
        assert_eq!(detect_quality("Movie.2024.1080p.HDTS").0, "TELESYNC");
        assert_eq!(detect_quality("Movie.2024.DVDScr.XviD").0, "DVDSCR");
        assert_eq!(detect_quality("Movie.2024.TELECINE").0, "TELECINE");
    }

    #[test]
    fn resolution_defaults_to_1080p() {
        let (quality, _) = detect_quality("Movie.2024.WEB-DL.DDP5.1");
        assert_eq!(quality, "WEBDL-1080p");
    }

    #[test]
    fn four_k_maps_to_2160p() {
        let (quality, res) = detect_quality("Movie.2024.4K.BluRay.Remux");
        assert_eq!(quality, "Remux-2160p");
        assert_eq!(res, Some(2160));
    }

    #[test]
    fn every_source_composes_with_resolution() {
        // DVD and SDTV follow the same composition as everything else.
        assert_eq!(detect_quality("Movie.2024.1080p.DVDRip.x264").0, "DVD-1080p");
        assert_eq!(detect_quality("Movie.2024.480p.SDTV.x264").0, "SDTV-480p");
        // Without a resolution token, the 1080p default applies.
        assert_eq!(detect_quality("Movie.2024.DVDRip.x264").0, "DVD-1080p");
    }

    #[test]
    fn detects_proper_and_repack() {
        assert!(parse_release_title("Show.S01E02.PROPER.1080p.WEB-GRP").is_proper);
        assert!(parse_release_title("Show.S01E02.REPACK.1080p.WEB-GRP").is_repack);
        assert!(parse_release_title("Show.S01E02.RERIP.1080p.WEB-GRP").is_repack);
        assert!(!parse_release_title("Show.S01E02.1080p.WEB-GRP").is_proper);
        // Substrings inside words do not count.
        assert!(!detect_word("improperly", "PROPER"));
    }

    #[test]
    fn bracket_group_wins() {
        let parsed = parse_release_title("[SubGroup] Show Name S01E01 1080p WEB");
        assert_eq!(parsed.group.as_deref(), Some("SubGroup"));
        assert_eq!(parsed.title_words, vec!["show", "name"]);
    }

    #[test]
    fn numeric_tail_is_not_a_group() {
        let parsed = parse_release_title("Movie.Name.2023.1080p.WEB-DL.DDP5-1");
        assert_eq!(parsed.group, None);
    }

    #[test]
    fn year_titled_movie_keeps_its_name() {
        let parsed = parse_release_title("1917.2019.1080p.BluRay.x264-GRP");
        assert_eq!(parsed.year, Some(2019));
        assert_eq!(parsed.title_words, vec!["1917"]);
    }
}
