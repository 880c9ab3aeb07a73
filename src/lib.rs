//! Security-alert webhook relay—verify GitHub Dependabot alert deliveries, normalize them into
//! a deterministic dispatch contract, and raise `repository_dispatch` events for automation.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod alert;
pub mod config;
pub mod error;
pub mod github;
pub mod obs;
pub mod server;
pub mod signature;

mod _prelude {
	pub use std::{
		collections::BTreeSet,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		sync::Arc,
	};

	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
