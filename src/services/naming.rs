use crate::entities::naming_config;
use crate::models::episode::Episode;
use crate::models::media::MediaInfo;
use crate::models::movie::Movie;
use crate::models::series::{Series, SeriesType};
use regex::Regex;
use std::sync::OnceLock;

/// Token substitution engine over the configured format strings.
///
/// Tokens come from a fixed whitelist; anything else in braces is left in
/// the output literally. Substituted values are sanitized before they hit
/// a path.
#[derive(Clone)]
pub struct FileNamer {
    config: naming_config::Model,
}

/// Everything a file-name render can draw from.
#[derive(Debug, Clone, Default)]
pub struct NamingContext {
    pub quality: Option<String>,
    pub is_proper: bool,
    pub is_repack: bool,
    pub media_info: Option<MediaInfo>,
    pub release_group: Option<String>,
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{(?P<name>[A-Za-z][A-Za-z ]*?)(?::(?P<pad>0+))?\}").expect("Invalid regex")
    })
}

const TOKEN_WHITELIST: &[&str] = &[
    "Movie Title",
    "Movie CleanTitle",
    "Movie TitleThe",
    "Series Title",
    "Series CleanTitle",
    "Series TitleThe",
    "Episode Title",
    "Air Date",
    "Year",
    "season",
    "episode",
    "absolute",
    "Quality Full",
    "Quality Title",
    "MediaInfo VideoCodec",
    "MediaInfo AudioCodec",
    "MediaInfo AudioChannels",
    "MediaInfo Resolution",
    "MediaInfo DynamicRange",
    "Release Group",
    "ImdbId",
    "TmdbId",
    "TvdbId",
];

fn clean_title(title: &str) -> String {
    title
        .replace('&', "and")
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_the(title: &str) -> String {
    for article in ["The ", "A ", "An "] {
        if let Some(rest) = title.strip_prefix(article) {
            return format!("{rest}, {}", article.trim_end());
        }
    }
    title.to_string()
}

fn pad(value: i32, width: usize) -> String {
    format!("{value:0width$}")
}

impl FileNamer {
    #[must_use]
    pub const fn new(config: naming_config::Model) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &naming_config::Model {
        &self.config
    }

    /// Illegal-character and colon handling. This is a fixed point:
    /// sanitizing twice changes nothing.
    #[must_use]
    pub fn sanitize(&self, name: &str) -> String {
        let mut s = name.replace(':', &self.config.colon_replacement);

        if self.config.replace_illegal_characters {
            s = s
                .chars()
                .filter(|c| !matches!(c, '<' | '>' | '"' | '/' | '\\' | '|' | '?' | '*'))
                .collect();
        }

        let mut prev_len = 0;
        while s.len() != prev_len {
            prev_len = s.len();
            s = s
                .replace("[]", "")
                .replace("()", "")
                .replace("{}", "")
                .replace("  ", " ")
                .replace(" - - ", " - ");
        }

        s.trim()
            .trim_end_matches([' ', '.', '-'])
            .trim_start_matches([' ', '-'])
            .to_string()
    }

    fn substitute<F>(&self, format: &str, resolve: F) -> String
    where
        F: Fn(&str, Option<usize>) -> Option<String>,
    {
        let result = token_regex().replace_all(format, |caps: &regex::Captures<'_>| {
            let name = caps.name("name").map_or("", |m| m.as_str());
            let width = caps.name("pad").map(|m| m.as_str().len());

            if !TOKEN_WHITELIST.contains(&name) {
                // Unknown tokens stay literal.
                return caps[0].to_string();
            }

            resolve(name, width).unwrap_or_default()
        });

        self.sanitize(&result)
    }

    fn quality_full(context: &NamingContext) -> Option<String> {
        let quality = context.quality.as_deref()?;
        let mut s = quality.to_string();
        if context.is_proper {
            s.push_str(" PROPER");
        } else if context.is_repack {
            s.push_str(" REPACK");
        }
        Some(s)
    }

    fn media_token(context: &NamingContext, field: &str) -> Option<String> {
        let info = context.media_info.as_ref()?;
        match field {
            "MediaInfo VideoCodec" => Some(info.video_codec.clone()),
            "MediaInfo AudioCodec" => Some(info.audio_codec.clone()),
            "MediaInfo AudioChannels" => info.audio_channels.map(|c| format!("{c:.1}")),
            "MediaInfo Resolution" => Some(info.quality_str()),
            "MediaInfo DynamicRange" => info.dynamic_range.clone(),
            _ => None,
        }
    }

    #[must_use]
    pub fn movie_file_name(&self, movie: &Movie, context: &NamingContext) -> String {
        self.substitute(&self.config.movie_format.clone(), |token, _width| {
            match token {
                "Movie Title" => Some(movie.title.clone()),
                "Movie CleanTitle" => Some(clean_title(&movie.title)),
                "Movie TitleThe" => Some(title_the(&movie.title)),
                "Year" => movie.year.map(|y| y.to_string()),
                "Quality Full" => Self::quality_full(context),
                "Quality Title" => context.quality.clone(),
                "Release Group" => context.release_group.clone(),
                "ImdbId" => movie.imdb_id.clone(),
                "TmdbId" => movie.tmdb_id.map(|id| id.to_string()),
                token if token.starts_with("MediaInfo") => Self::media_token(context, token),
                _ => None,
            }
        })
    }

    #[must_use]
    pub fn movie_folder_name(&self, movie: &Movie) -> String {
        self.substitute(&self.config.movie_folder_format.clone(), |token, _| {
            match token {
                "Movie Title" => Some(movie.title.clone()),
                "Movie CleanTitle" => Some(clean_title(&movie.title)),
                "Movie TitleThe" => Some(title_the(&movie.title)),
                "Year" => movie.year.map(|y| y.to_string()),
                "ImdbId" => movie.imdb_id.clone(),
                "TmdbId" => movie.tmdb_id.map(|id| id.to_string()),
                _ => None,
            }
        })
    }

    /// Render an episode (or multi-episode) file name. The format is
    /// chosen by series type; the `SxxEyy` block follows the configured
    /// multi-episode style.
    #[must_use]
    pub fn episode_file_name(
        &self,
        series: &Series,
        episodes: &[&Episode],
        context: &NamingContext,
    ) -> String {
        let Some(first) = episodes.first() else {
            return String::new();
        };

        let format = match series.series_type {
            SeriesType::Daily => &self.config.daily_episode_format,
            SeriesType::Anime => &self.config.anime_episode_format,
            SeriesType::Standard => &self.config.standard_episode_format,
        };

        let numbers: Vec<i32> = episodes.iter().map(|e| e.episode_number).collect();
        let format = self.expand_episode_block(format, first.season_number, &numbers);

        let episode_title = episodes
            .iter()
            .filter_map(|e| e.title.clone())
            .collect::<Vec<_>>()
            .join(" + ");

        self.substitute(&format, |token, width| {
            let width = width.unwrap_or(1);
            match token {
                "Series Title" => Some(series.title.clone()),
                "Series CleanTitle" => Some(clean_title(&series.title)),
                "Series TitleThe" => Some(title_the(&series.title)),
                "Episode Title" => Some(episode_title.clone()),
                "Air Date" => first.air_date.clone(),
                "Year" => series.year.map(|y| y.to_string()),
                "season" => Some(pad(first.season_number, width)),
                "episode" => Some(pad(first.episode_number, width)),
                "absolute" => first.absolute_number.map(|n| pad(n, width)),
                "Quality Full" => Self::quality_full(context),
                "Quality Title" => context.quality.clone(),
                "Release Group" => context.release_group.clone(),
                "TvdbId" => series.tvdb_id.map(|id| id.to_string()),
                "TmdbId" => series.tmdb_id.map(|id| id.to_string()),
                "ImdbId" => series.imdb_id.clone(),
                token if token.starts_with("MediaInfo") => Self::media_token(context, token),
                _ => None,
            }
        })
    }

    /// Rewrite the contiguous `S{season:00}E{episode:00}` block for
    /// multi-episode files according to the configured style.
    fn expand_episode_block(&self, format: &str, season: i32, episodes: &[i32]) -> String {
        static BLOCK_RE: OnceLock<Regex> = OnceLock::new();
        let block_re = BLOCK_RE.get_or_init(|| {
            Regex::new(r"S\{season:(?P<sw>0+)\}E\{episode:(?P<ew>0+)\}").expect("Invalid regex")
        });

        if episodes.len() < 2 {
            return format.to_string();
        }

        block_re
            .replace(format, |caps: &regex::Captures<'_>| {
                let sw = caps["sw"].len();
                let ew = caps["ew"].len();
                let s = pad(season, sw);
                let codes: Vec<String> = episodes.iter().map(|e| pad(*e, ew)).collect();

                match self.config.multi_episode_style.as_str() {
                    "duplicate" => codes
                        .iter()
                        .map(|e| format!("S{s}E{e}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                    "extend" => format!("S{s}E{}", codes.join("E")),
                    "range" => format!("S{s}E{}-{}", codes[0], codes[codes.len() - 1]),
                    "scene" => {
                        let season_plain = season.to_string();
                        format!("{season_plain}x{}", codes.join("x"))
                    }
                    // prefixed_range is the default.
                    _ => format!("S{s}E{}-E{}", codes[0], codes[codes.len() - 1]),
                }
            })
            .to_string()
    }

    #[must_use]
    pub fn series_folder_name(&self, series: &Series) -> String {
        self.substitute(&self.config.series_folder_format.clone(), |token, _| {
            match token {
                "Series Title" => Some(series.title.clone()),
                "Series CleanTitle" => Some(clean_title(&series.title)),
                "Series TitleThe" => Some(title_the(&series.title)),
                "Year" => series.year.map(|y| y.to_string()),
                "TvdbId" => series.tvdb_id.map(|id| id.to_string()),
                _ => None,
            }
        })
    }

    #[must_use]
    pub fn season_folder_name(&self, season_number: i32) -> String {
        if season_number == 0 {
            return self.sanitize(&self.config.specials_folder_format.clone());
        }

        self.substitute(&self.config.season_folder_format.clone(), |token, width| {
            match token {
                "season" => Some(pad(season_number, width.unwrap_or(1))),
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::NamingRepository;
    use crate::models::movie::MinimumAvailability;

    fn namer() -> FileNamer {
        FileNamer::new(NamingRepository::default_config())
    }

    fn movie() -> Movie {
        Movie {
            id: "m1".to_string(),
            tmdb_id: Some(603),
            imdb_id: Some("tt0133093".to_string()),
            title: "The Matrix".to_string(),
            year: Some(1999),
            runtime: Some(136),
            overview: None,
            status: None,
            certification: None,
            collection_title: None,
            genres: vec![],
            credits: crate::models::movie::MovieCreditsInfo::default(),
            vote_average: None,
            theatrical_release_date: None,
            digital_release_date: None,
            physical_release_date: None,
            poster_path: None,
            backdrop_path: None,
            minimum_availability: MinimumAvailability::Released,
            monitored: true,
            has_file: false,
            file_path: None,
            file_size: None,
            quality: None,
            video_codec: None,
            audio_codec: None,
            release_group: None,
            is_proper: false,
            is_repack: false,
            quality_profile_id: None,
            root_folder: None,
            folder_path: None,
            tags: vec![],
            added_at: None,
        }
    }

    fn series() -> Series {
        Series {
            id: "s1".to_string(),
            tvdb_id: Some(371980),
            tmdb_id: Some(95396),
            imdb_id: None,
            title: "Severance".to_string(),
            year: Some(2022),
            network: None,
            overview: None,
            status: None,
            series_type: SeriesType::Standard,
            monitor_new_seasons: crate::models::series::NewSeasonMonitor::All,
            use_season_folder: true,
            monitored: true,
            quality_profile_id: None,
            root_folder: None,
            folder_path: None,
            poster_path: None,
            genres: vec![],
            tags: vec![],
            added_at: None,
        }
    }

    fn episode(season: i32, number: i32, title: &str) -> Episode {
        Episode {
            id: format!("e{season}-{number}"),
            series_id: "s1".to_string(),
            season_number: season,
            episode_number: number,
            title: Some(title.to_string()),
            overview: None,
            air_date: Some("2022-02-18".to_string()),
            monitored: true,
            has_file: false,
            file_path: None,
            file_size: None,
            quality: None,
            video_codec: None,
            audio_codec: None,
            release_group: None,
            is_proper: false,
            is_repack: false,
            absolute_number: None,
        }
    }

    fn context(quality: &str) -> NamingContext {
        NamingContext {
            quality: Some(quality.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn movie_file_name_renders_tokens() {
        let name = namer().movie_file_name(&movie(), &context("Bluray-1080p"));
        assert_eq!(name, "The Matrix (1999) Bluray-1080p");
    }

    #[test]
    fn proper_flag_shows_in_quality_full() {
        let mut ctx = context("WEBDL-1080p");
        ctx.is_proper = true;
        let name = namer().movie_file_name(&movie(), &ctx);
        assert!(name.ends_with("WEBDL-1080p PROPER"));
    }

    #[test]
    fn episode_file_name_standard() {
        let ep = episode(1, 2, "Half Loop");
        let name = namer().episode_file_name(&series(), &[&ep], &context("WEBDL-1080p"));
        assert_eq!(name, "Severance - S01E02 - Half Loop WEBDL-1080p");
    }

    #[test]
    fn multi_episode_styles() {
        let e1 = episode(1, 1, "Good News");
        let e2 = episode(1, 2, "Half Loop");
        let eps = [&e1, &e2];

        let mut config = NamingRepository::default_config();
        for (style, expected) in [
            ("prefixed_range", "S01E01-E02"),
            ("extend", "S01E01E02"),
            ("duplicate", "S01E01 S01E02"),
            ("range", "S01E01-02"),
            ("scene", "1x01x02"),
        ] {
            config.multi_episode_style = style.to_string();
            let namer = FileNamer::new(config.clone());
            let name = namer.episode_file_name(&series(), &eps, &context("WEBDL-1080p"));
            assert!(
                name.contains(expected),
                "style {style}: expected {expected} in {name}"
            );
        }
    }

    #[test]
    fn season_folder_names() {
        let n = namer();
        assert_eq!(n.season_folder_name(2), "Season 02");
        assert_eq!(n.season_folder_name(0), "Specials");
    }

    #[test]
    fn unknown_tokens_stay_literal() {
        let mut config = NamingRepository::default_config();
        config.movie_format = "{Movie Title} {Bogus Token}".to_string();
        let name = FileNamer::new(config).movie_file_name(&movie(), &context("SDTV"));
        assert!(name.contains("{Bogus Token}"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let n = namer();
        for input in [
            "Mission: Impossible",
            "What <If>? * \\ / |",
            "Brackets [] () left - ",
            "Many    spaces",
            "Trailing dots...",
        ] {
            let once = n.sanitize(input);
            assert_eq!(n.sanitize(&once), once, "input: {input}");
        }
    }

    #[test]
    fn colon_gets_configured_replacement() {
        let name = namer().sanitize("Mission: Impossible");
        assert_eq!(name, "Mission - Impossible");
    }

    #[test]
    fn quality_token_survives_parsing_roundtrip() {
        let name = namer().movie_file_name(&movie(), &context("WEBDL-1080p"));
        let parsed = crate::parser::release::parse_release_title(&name);
        assert_eq!(parsed.quality, "WEBDL-1080p");
    }

    #[test]
    fn title_the_moves_article() {
        assert_eq!(title_the("The Matrix"), "Matrix, The");
        assert_eq!(title_the("A Quiet Place"), "Quiet Place, A");
        assert_eq!(title_the("Heat"), "Heat");
    }
}
