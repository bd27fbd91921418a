//! # KenPom Core
//!
//! Resilient, point-in-time-correct access to the KenPom ratings API.
//!
//! ## Overview
//!
//! This crate provides the data access layer used by backtests and models:
//!
//! - **Rate limiting** shared by every outbound request
//! - **Retry with classified errors** and exponential backoff
//! - **On-disk response cache** with TTL and atomic writes
//! - **Point-in-time resolution** so historical queries never see ratings
//!   published on or after the game they describe
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`access`] | Cache-then-network orchestration and provenance |
//! | [`cache`] | Filesystem response cache |
//! | [`calendar`] | Game dates and season arithmetic |
//! | [`client`] | Typed endpoint facade |
//! | [`config`] | Settings read from `KENPOM_*` environment variables |
//! | [`error`] | Validation, configuration and access errors |
//! | [`executor`] | Rate-limited, retrying request execution |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`models`] | Typed upstream rows |
//! | [`point_in_time`] | Live/archive/preseason source selection |
//! | [`request`] | Endpoint catalog and validated requests |
//! | [`retry`] | Backoff schedules and retry bookkeeping |
//! | [`throttling`] | Token-bucket rate limiter |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kenpom_core::{GameDate, KenPomClient, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let client = KenPomClient::from_settings(&settings);
//!
//!     // Ratings as they stood before tip-off on 2024-03-15.
//!     let ratings = client.ratings_as_of(GameDate::parse("2024-03-15")?).await?;
//!     println!("{} rows from {}", ratings.payload.len(), ratings.source_date);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────────┐
//! │  KenPomClient   │────▶│ PointInTimeResolver  │
//! └────────┬────────┘     └──────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  AccessLayer    │────▶│ ResponseCache    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ RequestExecutor │────▶│ RateLimiter      │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ HttpClient      │
//! │ (reqwest)       │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use kenpom_core::{AccessError, ErrorClass};
//!
//! fn handle_error(error: AccessError) {
//!     match error.class() {
//!         Some(ErrorClass::Auth) => {
//!             // Check KENPOM_API_KEY
//!         }
//!         Some(ErrorClass::RateLimit | ErrorClass::ServerTransient) => {
//!             // Retry budget exhausted; try again later
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is read from the environment and never logged
//! - Requests go over HTTPS to the configured base URL

pub mod access;
pub mod cache;
pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http_client;
pub mod models;
pub mod point_in_time;
pub mod request;
pub mod retry;
pub mod throttling;

// Orchestration
pub use access::{AccessLayer, AccessResult, Provenance};
pub use client::KenPomClient;

// Caching
pub use cache::{CacheEntry, CacheKey, CacheMode, CacheStats, ResponseCache};

// Dates
pub use calendar::{GameDate, SeasonStart};

// Configuration
pub use config::Settings;

// Error types
pub use error::{AccessError, ClassifiedError, ConfigError, ErrorClass, ValidationError};

// Execution
pub use executor::{RawResponse, RequestExecutor};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};

// Upstream rows
pub use models::{
    ArchiveRating, Conference, FanmatchGame, FourFactors, Height, MiscStats, PointDistribution,
    Rating, Team,
};

// Point-in-time
pub use point_in_time::{PointInTimeResolver, ResolvedRequest, ResolverConfig, SourceDate};

// Requests
pub use request::{ApiRequest, ApiRequestBuilder, Endpoint, Intent, ParamValue};

// Retry logic
pub use retry::{Backoff, RetryConfig, RetryState};

// Throttling
pub use throttling::RateLimiter;
