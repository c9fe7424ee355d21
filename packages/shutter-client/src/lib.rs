//! Client-side search coordination: one controller owns the active search and publishes the
//! rendered state, and a backend performs the HTTP calls.

pub mod backend;
pub mod controller;
pub mod state;

mod error;

pub use backend::{ClientRequest, HttpSearchBackend, SearchBackend};
pub use controller::{SearchController, SearchEvent, Trigger};
pub use error::{Error, Result};
pub use state::{ClientSearchState, SearchStatus};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
