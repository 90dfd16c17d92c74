use crate::entities::{naming_config, prelude::NamingConfig};
use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

pub struct NamingRepository {
    conn: DatabaseConnection,
}

impl NamingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub fn default_config() -> naming_config::Model {
        naming_config::Model {
            id: 1,
            movie_format: "{Movie Title} ({Year}) {Quality Full}".to_string(),
            movie_folder_format: "{Movie Title} ({Year})".to_string(),
            standard_episode_format:
                "{Series Title} - S{season:00}E{episode:00} - {Episode Title} {Quality Full}"
                    .to_string(),
            daily_episode_format:
                "{Series Title} - {Air Date} - {Episode Title} {Quality Full}".to_string(),
            anime_episode_format:
                "{Series Title} - {absolute:000} - {Episode Title} {Quality Full}".to_string(),
            series_folder_format: "{Series Title} ({Year})".to_string(),
            season_folder_format: "Season {season:00}".to_string(),
            specials_folder_format: "Specials".to_string(),
            colon_replacement: " - ".to_string(),
            replace_illegal_characters: true,
            multi_episode_style: "prefixed_range".to_string(),
        }
    }

    /// Ensure the single config row exists.
    pub async fn initialize(&self) -> Result<()> {
        let existing = NamingConfig::find_by_id(1).one(&self.conn).await?;
        if existing.is_none() {
            let defaults = Self::default_config();
            NamingConfig::insert(naming_config::ActiveModel {
                id: Set(1),
                movie_format: Set(defaults.movie_format),
                movie_folder_format: Set(defaults.movie_folder_format),
                standard_episode_format: Set(defaults.standard_episode_format),
                daily_episode_format: Set(defaults.daily_episode_format),
                anime_episode_format: Set(defaults.anime_episode_format),
                series_folder_format: Set(defaults.series_folder_format),
                season_folder_format: Set(defaults.season_folder_format),
                specials_folder_format: Set(defaults.specials_folder_format),
                colon_replacement: Set(defaults.colon_replacement),
                replace_illegal_characters: Set(defaults.replace_illegal_characters),
                multi_episode_style: Set(defaults.multi_episode_style),
            })
            .exec_without_returning(&self.conn)
            .await?;
        }
        Ok(())
    }

    pub async fn get(&self) -> Result<naming_config::Model> {
        Ok(NamingConfig::find_by_id(1)
            .one(&self.conn)
            .await?
            .unwrap_or_else(Self::default_config))
    }

    pub async fn update(&self, config: &naming_config::Model) -> Result<()> {
        NamingConfig::update(naming_config::ActiveModel {
            id: Set(1),
            movie_format: Set(config.movie_format.clone()),
            movie_folder_format: Set(config.movie_folder_format.clone()),
            standard_episode_format: Set(config.standard_episode_format.clone()),
            daily_episode_format: Set(config.daily_episode_format.clone()),
            anime_episode_format: Set(config.anime_episode_format.clone()),
            series_folder_format: Set(config.series_folder_format.clone()),
            season_folder_format: Set(config.season_folder_format.clone()),
            specials_folder_format: Set(config.specials_folder_format.clone()),
            colon_replacement: Set(config.colon_replacement.clone()),
            replace_illegal_characters: Set(config.replace_illegal_characters),
            multi_episode_style: Set(config.multi_episode_style.clone()),
        })
        .exec(&self.conn)
        .await?;
        Ok(())
    }
}
