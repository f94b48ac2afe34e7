//! `mt-routing` — weighted shortest paths and the path-computation pool.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                    |
//! |------------|-------------------------------------------------------------|
//! | [`route`]  | `Route`, `RouteOutcome`, `RouteRequest`, `RouteResponse`    |
//! | [`router`] | `Router` trait, `DijkstraRouter`                            |
//! | [`pool`]   | `PathService` worker pool, `PoolHealth`                     |
//! | [`cache`]  | `RouteCache`, `RouteKey`                                    |
//! | [`error`]  | `RoutingError`, `RoutingResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `Route`.                |

pub mod cache;
pub mod error;
pub mod pool;
pub mod route;
pub mod router;


pub use cache::{RouteCache, RouteKey};
pub use error::{RoutingError, RoutingResult};
pub use pool::{PathService, PoolHealth, RouterFactory, MAX_RESTARTS_PER_WORKER};
pub use route::{Route, RouteOutcome, RouteRequest, RouteResponse};
pub use router::{DijkstraRouter, Router};
