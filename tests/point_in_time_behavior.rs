//! Behavior-driven tests for point-in-time resolution
//!
//! These tests verify HOW historical requests are routed to archived or
//! preseason snapshots, and that nothing published on or after the event
//! date ever reaches the caller.

use kenpom_core::{
    AccessError, ApiRequest, ArchiveRating, Endpoint, ErrorClass, GameDate, HttpResponse,
    KenPomClient, PointInTimeResolver, Provenance, ResolverConfig, ScriptedHttpClient,
    SeasonStart, Settings, SourceDate,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn date(value: &str) -> GameDate {
    GameDate::parse(value).expect("valid date")
}

fn settings(dir: &Path) -> Settings {
    let mut settings = Settings::new("test-key");
    settings.base_url = String::from("https://kenpom.test");
    settings.cache_dir = dir.to_path_buf();
    settings.rate_limit_rps = 0.0;
    settings.backoff_base = Duration::from_millis(1);
    settings.max_backoff = Duration::from_millis(5);
    settings
}

fn archive_body(archive_date: &str, preseason: bool) -> String {
    format!(
        r#"[{{"ArchiveDate":"{archive_date}","Season":2024,"Preseason":"{preseason}","TeamName":"Houston","ConfShort":"B12","AdjEM":31.2,"AdjOE":118.9,"AdjDE":87.7,"AdjTempo":63.4}}]"#
    )
}

fn resolver(stabilization_days: u32) -> PointInTimeResolver {
    PointInTimeResolver::new(ResolverConfig {
        stabilization_days,
        season_start: SeasonStart::new(11, 6).expect("valid"),
        earliest_archive_season: 2002,
    })
}

// =============================================================================
// Archived Snapshots
// =============================================================================

#[tokio::test]
async fn when_requesting_ratings_for_an_event_archive_from_previous_day_is_used() {
    // Given: A client and an upstream that serves the 2024-03-14 archive
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
        archive_body("2024-03-14", false),
    ))));
    let client = KenPomClient::with_http(&settings(dir.path()), http.clone());

    // When: Ratings are requested for a game on 2024-03-15
    let result = client
        .ratings_as_of(date("2024-03-15"))
        .await
        .expect("historical ratings");

    // Then: The archive dated the day before was fetched and labeled as such
    assert_eq!(result.source_date, SourceDate::AsOf(date("2024-03-14")));
    assert_eq!(result.source_date.to_string(), "2024-03-14");
    assert!(result.source_date.precedes(date("2024-03-15")));
    assert_eq!(result.payload[0].team_name, "Houston");

    let requested = http.requests()[0].full_url();
    assert!(requested.contains("endpoint=archive"));
    assert!(requested.contains("d=2024-03-14"));
    assert!(!requested.contains("endpoint=ratings"));
}

#[tokio::test]
async fn when_historical_ratings_are_cached_label_survives_the_cache() {
    // Given: Historical ratings fetched once
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
        archive_body("2024-03-14", false),
    ))));
    let client = KenPomClient::with_http(&settings(dir.path()), http.clone());
    client.ratings_as_of(date("2024-03-15")).await.expect("fresh");

    // When: The same event date is requested again
    let cached = client.ratings_as_of(date("2024-03-15")).await.expect("cached");

    // Then: The cached result still carries the archive label
    assert_eq!(cached.provenance, Provenance::CacheHit);
    assert_eq!(cached.source_date, SourceDate::AsOf(date("2024-03-14")));
    assert_eq!(http.call_count(), 1);
}

// =============================================================================
// Preseason Fallback
// =============================================================================

#[tokio::test]
async fn when_event_is_five_days_into_the_season_preseason_snapshot_is_used() {
    // Given: A season starting 11-01 whose archive stabilizes after 14 days
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
        archive_body("2023-10-31", true),
    ))));
    let client = KenPomClient::with_http(&settings(dir.path()), http.clone());

    // When: Ratings are requested for a game on 2023-11-06
    let result = client
        .ratings_as_of(date("2023-11-06"))
        .await
        .expect("preseason ratings");

    // Then: The preseason snapshot of the 2024 season backs the result
    assert!(matches!(
        result.source_date,
        SourceDate::Preseason { season: 2024, .. }
    ));
    assert_eq!(result.source_date.to_string(), "preseason-2024");
    assert!(result.source_date.precedes(date("2023-11-06")));

    let requested = http.requests()[0].full_url();
    assert!(requested.contains("preseason=true"));
    assert!(requested.contains("y=2024"));
}

#[test]
fn when_stabilization_window_is_configured_boundary_moves_with_it() {
    // Given: Two resolvers with different stabilization windows
    let event = date("2023-11-26"); // 20 days after an 11-06 start
    let request = ApiRequest::ratings_for_event(event).expect("valid");
    let today = date("2024-06-01");

    // When: The same event is resolved by both
    let short = resolver(14).resolve_at(&request, today).expect("dated");
    let long = resolver(30).resolve_at(&request, today).expect("preseason");

    // Then: Only the longer window still falls back to preseason
    assert_eq!(short.source, SourceDate::AsOf(date("2023-11-25")));
    assert!(matches!(long.source, SourceDate::Preseason { season: 2024, .. }));
}

#[tokio::test]
async fn when_season_starts_in_october_early_events_belong_to_the_upcoming_season() {
    // Given: A client configured for a season starting 10-15
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
        archive_body("2024-10-14", true),
    ))));
    let mut settings = settings(dir.path());
    settings.season_start = SeasonStart::new(10, 15).expect("valid");
    let client = KenPomClient::with_http(&settings, http.clone());

    // When: Ratings are requested for a game on 2024-10-20
    let result = client
        .ratings_as_of(date("2024-10-20"))
        .await
        .expect("preseason ratings");

    // Then: The preseason snapshot of the 2025 season backs the result
    assert_eq!(
        result.source_date,
        SourceDate::Preseason {
            season: 2025,
            season_start: date("2024-10-15"),
        }
    );
    let requested = http.requests()[0].full_url();
    assert!(requested.contains("preseason=true"));
    assert!(requested.contains("y=2025"));
}

// =============================================================================
// Leakage Guarantees
// =============================================================================

#[test]
fn for_every_day_of_a_season_resolved_source_strictly_precedes_the_event() {
    // Given: A resolver and every date from October through April
    let resolver = resolver(14);
    let today = date("2024-04-10");
    let mut event = date("2023-10-01");

    while event <= date("2024-04-30") {
        // When: Ratings are resolved for that event date
        let request = ApiRequest::ratings_for_event(event).expect("valid");
        match resolver.resolve_at(&request, today) {
            // Then: Either the label is strictly earlier than the event...
            Ok(resolved) => {
                assert_eq!(resolved.request.endpoint(), Endpoint::Archive);
                assert!(
                    resolved.source.precedes(event),
                    "{} does not precede {event}",
                    resolved.source
                );
            }
            // ...or resolution fails closed
            Err(error) => {
                assert!(
                    matches!(error, AccessError::NoValidHistoricalSource { .. }),
                    "unexpected error for {event}: {error}"
                );
                assert!(event > today, "only unpublished dates may fail: {event}");
            }
        }
        event = event.plus_days(1).expect("calendar");
    }
}

#[tokio::test]
async fn when_upstream_returns_rows_dated_after_the_event_result_is_rejected() {
    // Given: An upstream archive that mislabels its rows with the event date
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
        archive_body("2024-03-15", false),
    ))));
    let client = KenPomClient::with_http(&settings(dir.path()), http);

    // When: Ratings are requested for the event
    let error = client
        .ratings_as_of(date("2024-03-15"))
        .await
        .expect_err("leaking rows");

    // Then: The call fails closed instead of returning them
    assert!(matches!(error, AccessError::NoValidHistoricalSource { .. }));
}

#[tokio::test]
async fn when_archive_is_unavailable_live_ratings_are_never_substituted() {
    // Given: An upstream whose archive endpoint is rejected
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::new(
        400,
        "archive not available",
    ))));
    let client = KenPomClient::with_http(&settings(dir.path()), http.clone());

    // When: Historical ratings are requested
    let error = client
        .ratings_as_of(date("2024-03-15"))
        .await
        .expect_err("archive rejected");

    // Then: The classified error surfaces and no live request was attempted
    assert_eq!(error.class(), Some(ErrorClass::ClientPermanent));
    assert_eq!(http.call_count(), 1);
    assert!(http
        .requests()
        .iter()
        .all(|request| !request.full_url().contains("endpoint=ratings")));
}

#[tokio::test]
async fn when_event_is_in_the_future_no_network_call_is_made() {
    // Given: A client and an event date whose archive cannot exist yet
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json("[]"))));
    let client = KenPomClient::with_http(&settings(dir.path()), http.clone());
    let far_future = GameDate::from_ymd(GameDate::today().year() + 2, 3, 1).expect("valid");

    // When: Ratings are requested for it
    let error = client
        .ratings_as_of(far_future)
        .await
        .expect_err("no archive for the future");

    // Then: The resolver fails closed before touching the network
    assert!(matches!(error, AccessError::NoValidHistoricalSource { .. }));
    assert_eq!(http.call_count(), 0);
}

#[tokio::test]
async fn when_season_predates_the_archive_caller_gets_a_specific_error() {
    // Given: A client
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json("[]"))));
    let client = KenPomClient::with_http(&settings(dir.path()), http.clone());

    // When: Ratings are requested for a 1998 game
    let error = client
        .ratings_as_of(date("1998-02-14"))
        .await
        .expect_err("too early");

    // Then: The error names the missing historical data
    assert!(matches!(error, AccessError::NoValidHistoricalSource { .. }));
    assert!(error.to_string().contains("predates the archive"));
    assert_eq!(http.call_count(), 0);
}

#[tokio::test]
async fn when_point_in_time_request_bypasses_the_resolver_access_layer_refuses_it() {
    // Given: A point-in-time ratings request that was never resolved
    let dir = tempdir().expect("tempdir");
    let http = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json("[]"))));
    let client = KenPomClient::with_http(&settings(dir.path()), http.clone());
    let request = ApiRequest::ratings_for_event(date("2024-03-15")).expect("valid");

    // When: It is handed straight to the access layer
    let error = client
        .access()
        .fetch::<Vec<ArchiveRating>>(&request)
        .await
        .expect_err("live data for a past event");

    // Then: It fails closed without a network call
    assert!(matches!(error, AccessError::NoValidHistoricalSource { .. }));
    assert_eq!(http.call_count(), 0);
}
