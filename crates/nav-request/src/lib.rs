//! `nav-request`: asynchronous, pooled path requests.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                       |
//! |--------------|----------------------------------------------------------------|
//! | [`request`]  | `PathRequest`, `RequestState`, `RequestHandle`, `ClaimOwner`   |
//! | [`pool`]     | `RequestPool`: generational arena with claim counting          |
//! | [`engine`]   | `SearchEngine` trait, `EngineRequest`/`EngineResult`, `ManualEngine` |
//! | [`modifier`] | `PathModifier`, `ModifierPipeline`, built-in modifiers         |
//! | [`observer`] | `PathListener`                                                 |
//! | [`broker`]   | `PathRequestBroker`, `Delivery`                                |
//! | [`error`]    | `RequestError`, `RequestResult`                                |
//!
//! # Guarantees
//!
//! - At most one request per agent is in flight; submitting again supersedes
//!   the previous one, which is never delivered.
//! - Deliveries for one agent arrive in submission order; a request is
//!   delivered at most once.
//! - A request's claim count never goes negative; misuse is an `Err`.
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                  |
//! |-----------|---------------------------------------------------------|
//! | `serde`   | Derives on `Exactness`, modifier settings, `RequestState` |
//! | `fx-hash` | FxHash instead of SipHash for the broker's tables       |

pub mod broker;
pub mod engine;
pub mod error;
pub mod modifier;
pub mod observer;
pub mod pool;
pub mod request;


pub use broker::{CANCELLED, Delivery, PathRequestBroker, SUPERSEDED};
pub use engine::{EngineRequest, EngineResult, ManualEngine, SearchEngine};
pub use error::{RequestError, RequestResult};
pub use modifier::{
    Exactness, ModifierId, ModifierPipeline, PathModifier, SimpleSmoothModifier, StartEndModifier,
};
pub use observer::{ListenerId, PathListener};
pub use pool::RequestPool;
pub use request::{ClaimOwner, PathRequest, RequestHandle, RequestState};
