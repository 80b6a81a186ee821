// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Configuration for the MongoDB exporter
//!
//! # Features
//!
//! - TOML or JSON configuration files
//! - `MONGODB_URI` / `MONGODB_USER` / `MONGODB_PASSWORD` environment overrides
//! - Validation with field-level error messages
//! - Collect-all shortcut evaluated without mutating shared settings
//!
//! # Example
//!
//! ```no_run
//! use mongodb_exporter_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .load_with_overrides("mongodb_exporter.toml")
//!         .await?;
//!
//!     println!("Scraping {}", config.mongodb.redacted_uri());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_overrides, ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validation::Validator;
