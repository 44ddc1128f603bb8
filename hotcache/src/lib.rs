//! Hot-reloading artifact cache
//!
//! This crate resolves opaque keys to built artifacts and keeps them fresh:
//! an artifact is rebuilt when its source changes or when anything it was
//! built from is rebuilt. Dependencies are never declared; they are
//! discovered while builders request other artifacts.
//!
//! # Features
//!
//! - Provider chain with first-match priority
//! - Implicit dependency recording through [`BuildContext`]
//! - Transitive invalidation, producers rebuilt before consumers
//! - Authoritative resolvers that bypass the cache
//! - Cached not-found results that heal once the key becomes buildable
//! - File-system and in-memory reference providers
//!
//! # Example
//!
//! ```
//! use hotcache::{ArtifactCache, ManualClock, MemoryProvider, Provider, Timestamp};
//! use std::sync::Arc;
//!
//! // Each line is either literal text or `use <key>`
//! let files = Arc::new(MemoryProvider::<String>::new("txt", |unit, cx| {
//!     let mut text = String::new();
//!     for line in unit.text()?.lines() {
//!         match line.strip_prefix("use ") {
//!             Some(key) => text.push_str(&cx.get_artifact(key)?),
//!             None => text.push_str(line),
//!         }
//!     }
//!     Ok(vec![(unit.key.clone(), text)])
//! }));
//! files.write("app/Main.txt", "use app.Greeting", Timestamp::from_millis(1));
//! files.write("app/Greeting.txt", "hello", Timestamp::from_millis(1));
//!
//! let clock = Arc::new(ManualClock::new(Timestamp::from_millis(10)));
//! let cache = ArtifactCache::builder()
//!     .provider(files.clone() as Arc<dyn Provider<String>>)
//!     .clock(clock.clone())
//!     .build();
//!
//! assert_eq!(cache.get_artifact("app.Main")?, "hello");
//!
//! // Editing the dependency rebuilds the dependent on its next request
//! files.write("app/Greeting.txt", "bonjour", clock.advance(5));
//! assert_eq!(cache.get_artifact("app.Main")?, "bonjour");
//! # Ok::<(), hotcache::CacheError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

mod artifact;
mod cache;
mod clock;
mod config;
mod context;
mod error;
mod fs;
mod key;
mod layout;
mod memory;
mod provider;
mod resolver;
mod resource;
mod state;

pub use artifact::{ArtifactInfo, Payload};
pub use cache::{ArtifactCache, ArtifactCacheBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, ConfigError, DEFAULT_MAX_BUILD_DEPTH};
pub use context::BuildContext;
pub use error::{BoxError, CacheError, CacheResult};
pub use fs::FsProvider;
pub use key::{Key, Timestamp};
pub use layout::{BuildFn, KeyLayout, SourceUnit};
pub use memory::MemoryProvider;
pub use provider::{Located, Provider, ProviderChain};
pub use resolver::{AuthoritativeResolver, FnResolver, StaticResolver};
pub use resource::{NOT_FOUND_SCHEME, NotFoundResource, Resource, ResourceGuard};
