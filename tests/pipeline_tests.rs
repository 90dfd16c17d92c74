//! Store-level invariants of the automation pipeline: single active
//! download per item, RSS cache dedup, monitor cascades, availability
//! gating, exclusions.

mod support;

use mediastack::db::new_id;
use mediastack::models::download::{Download, DownloadState};
use mediastack::models::episode::Episode;
use mediastack::models::movie::MinimumAvailability;
use mediastack::models::release::{Protocol, Release};
use mediastack::models::series::{NewSeasonMonitor, Season, SeriesType};
use mediastack::services::library::{NewMovie, NewSeries};
use mediastack::services::naming::FileNamer;

use support::test_state;

fn new_movie(title: &str, tmdb_id: i64) -> NewMovie {
    NewMovie {
        tmdb_id: Some(tmdb_id),
        imdb_id: None,
        title: title.to_string(),
        year: Some(2020),
        monitored: true,
        minimum_availability: Some(MinimumAvailability::Released),
        quality_profile_id: None,
        root_folder: Some("/library/movies".to_string()),
    }
}

fn queued_download(movie_id: &str, url: &str) -> Download {
    Download {
        id: new_id(),
        movie_id: Some(movie_id.to_string()),
        series_id: None,
        season_number: None,
        episode_number: None,
        title: "Some.Movie.2020.1080p.WEB-DL-GRP".to_string(),
        download_url: url.to_string(),
        size: None,
        indexer: None,
        quality: Some("WEBDL-1080p".to_string()),
        status: DownloadState::Queued,
        progress: 0.0,
        download_client_id: None,
        client_job_id: None,
        error_message: None,
        created_at: None,
        updated_at: None,
    }
}

fn rss_release(guid: &str, title: &str) -> Release {
    Release {
        title: title.to_string(),
        guid: guid.to_string(),
        download_url: format!("https://indexer.example/{guid}.torrent"),
        size: Some(4_000_000_000),
        seeders: Some(25),
        leechers: None,
        indexer_id: "ix-1".to_string(),
        indexer: "Test Indexer".to_string(),
        protocol: Protocol::Torrent,
        publish_date: None,
    }
}

#[tokio::test]
async fn active_download_guard_allows_at_most_one() {
    let state = test_state().await;
    let namer = FileNamer::new(state.store.naming().get().await.unwrap());

    let movie = state
        .library
        .create_movie(new_movie("Guarded Movie", 100), &namer)
        .await
        .unwrap();

    assert!(!state
        .store
        .downloads()
        .has_active_for_movie(&movie.id)
        .await
        .unwrap());

    let download = queued_download(&movie.id, "https://indexer.example/a.torrent");
    state.store.downloads().insert(&download).await.unwrap();

    assert!(state
        .store
        .downloads()
        .has_active_for_movie(&movie.id)
        .await
        .unwrap());
    assert!(state
        .store
        .downloads()
        .has_url("https://indexer.example/a.torrent")
        .await
        .unwrap());

    // A terminal download releases the slot.
    state
        .store
        .downloads()
        .set_status(&download.id, DownloadState::Completed, None)
        .await
        .unwrap();
    assert!(!state
        .store
        .downloads()
        .has_active_for_movie(&movie.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn rss_cache_dedupes_by_indexer_and_guid() {
    let state = test_state().await;

    let indexer = mediastack::entities::indexers::Model {
        id: "ix-1".to_string(),
        name: "Test Indexer".to_string(),
        base_url: "https://indexer.example".to_string(),
        api_key: None,
        protocol: "torrent".to_string(),
        categories: None,
        enabled: true,
        supports_rss: true,
        rss_interval_minutes: 15,
        priority: 1,
    };
    state.store.indexers().upsert(&indexer).await.unwrap();

    let release = rss_release("guid-1", "Some.Movie.2020.1080p.WEB-DL-GRP");

    assert!(state.store.rss_cache().insert_if_new(&release).await.unwrap());
    // Second sighting of the same (indexer, guid) is a no-op.
    assert!(!state.store.rss_cache().insert_if_new(&release).await.unwrap());

    state
        .store
        .rss_cache()
        .mark("ix-1", "guid-1", true, true)
        .await
        .unwrap();

    let row = state
        .store
        .rss_cache()
        .get("ix-1", "guid-1")
        .await
        .unwrap()
        .unwrap();
    assert!(row.processed);
    assert!(row.grabbed);
}

#[tokio::test]
async fn series_monitor_cascades_down_and_up() {
    let state = test_state().await;
    let namer = FileNamer::new(state.store.naming().get().await.unwrap());

    let series = state
        .library
        .create_series(
            NewSeries {
                tmdb_id: Some(200),
                tvdb_id: None,
                imdb_id: None,
                title: "Cascade Show".to_string(),
                year: Some(2020),
                monitored: true,
                series_type: Some(SeriesType::Standard),
                monitor_new_seasons: Some(NewSeasonMonitor::All),
                quality_profile_id: None,
                root_folder: Some("/library/series".to_string()),
            },
            &namer,
        )
        .await
        .unwrap();

    for season_number in 1..=2 {
        state
            .store
            .series()
            .upsert_season(&Season {
                series_id: series.id.clone(),
                season_number,
                monitored: true,
                episode_count: 2,
                episode_file_count: 0,
            })
            .await
            .unwrap();

        for episode_number in 1..=2 {
            state
                .store
                .series()
                .upsert_episode(&Episode {
                    id: new_id(),
                    series_id: series.id.clone(),
                    season_number,
                    episode_number,
                    title: None,
                    overview: None,
                    air_date: Some("2020-01-01".to_string()),
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
                })
                .await
                .unwrap();
        }
    }

    // Unmonitoring the series reaches every season and episode.
    state
        .library
        .set_series_monitored(&series.id, false)
        .await
        .unwrap();

    for season in state.store.series().seasons(&series.id).await.unwrap() {
        assert!(!season.monitored);
    }
    for episode in state.store.series().episodes(&series.id).await.unwrap() {
        assert!(!episode.monitored);
    }

    // Remonitor, then unmonitor season by season: dropping the last one
    // auto-unmonitors the series.
    state
        .library
        .set_series_monitored(&series.id, true)
        .await
        .unwrap();
    state
        .library
        .set_season_monitored(&series.id, 1, false)
        .await
        .unwrap();
    assert!(state.store.series().get(&series.id).await.unwrap().unwrap().monitored);

    state
        .library
        .set_season_monitored(&series.id, 2, false)
        .await
        .unwrap();
    assert!(!state.store.series().get(&series.id).await.unwrap().unwrap().monitored);
}

#[tokio::test]
async fn availability_gates_missing_search() {
    let state = test_state().await;
    let namer = FileNamer::new(state.store.naming().get().await.unwrap());

    let mut released = new_movie("Released Movie", 301);
    released.minimum_availability = Some(MinimumAvailability::Released);
    let released = state.library.create_movie(released, &namer).await.unwrap();

    let mut upcoming = new_movie("Upcoming Movie", 302);
    upcoming.minimum_availability = Some(MinimumAvailability::Released);
    let upcoming = state.library.create_movie(upcoming, &namer).await.unwrap();

    // Give the released movie a past date and the upcoming one a future
    // date. The gate reads the dates, not the add-time state.
    let mut m = state.store.movies().get(&released.id).await.unwrap().unwrap();
    m.theatrical_release_date = Some("2020-01-01".to_string());
    state.store.movies().update(&m).await.unwrap();

    let mut m = state.store.movies().get(&upcoming.id).await.unwrap().unwrap();
    m.theatrical_release_date = Some("2999-01-01".to_string());
    state.store.movies().update(&m).await.unwrap();

    let missing = state.library.find_missing_and_available().await.unwrap();
    let titles: Vec<&str> = missing.iter().map(|m| m.title.as_str()).collect();

    assert!(titles.contains(&"Released Movie"));
    assert!(!titles.contains(&"Upcoming Movie"));
}

#[tokio::test]
async fn exclusions_block_and_store_deleted_movies() {
    let state = test_state().await;
    let namer = FileNamer::new(state.store.naming().get().await.unwrap());

    let movie = state
        .library
        .create_movie(new_movie("Excluded Movie", 400), &namer)
        .await
        .unwrap();

    state
        .library
        .delete_movie(&movie.id, false, true)
        .await
        .unwrap();

    assert!(state.store.exclusions().contains(400, "movie").await.unwrap());
    assert!(state.store.movies().get(&movie.id).await.unwrap().is_none());
}

#[tokio::test]
async fn blacklist_is_scoped_per_movie() {
    let state = test_state().await;
    let namer = FileNamer::new(state.store.naming().get().await.unwrap());

    let a = state
        .library
        .create_movie(new_movie("Franchise One", 501), &namer)
        .await
        .unwrap();
    let b = state
        .library
        .create_movie(new_movie("Franchise Two", 502), &namer)
        .await
        .unwrap();

    state
        .store
        .blacklist()
        .add(
            "Franchise.One.2020.1080p.WEB-DL-GRP",
            Some(&a.id),
            None,
            None,
            None,
            Some("bad release"),
        )
        .await
        .unwrap();

    let for_a = state.store.blacklist().titles_for_movie(&a.id).await.unwrap();
    let for_b = state.store.blacklist().titles_for_movie(&b.id).await.unwrap();

    assert_eq!(for_a.len(), 1);
    assert!(for_b.is_empty());
}

#[tokio::test]
async fn duplicate_tmdb_id_is_rejected() {
    let state = test_state().await;
    let namer = FileNamer::new(state.store.naming().get().await.unwrap());

    state
        .library
        .create_movie(new_movie("First", 600), &namer)
        .await
        .unwrap();

    let result = state
        .library
        .create_movie(new_movie("Second", 600), &namer)
        .await;

    assert!(result.is_err());
}
