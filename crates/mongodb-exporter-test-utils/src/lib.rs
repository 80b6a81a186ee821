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

//! # MongoDB Exporter Test Utilities
//!
//! Shared test utilities for the exporter crates providing:
//! - A scripted in-memory MongoDB backend with interaction counters
//! - Connector and connection implementations on top of it
//! - Canned command replies

pub mod connection;
pub mod fixtures;
pub mod server;

// Re-export commonly used items at crate root
pub use connection::{FakeConnection, FakeConnector};
pub use server::{FakeServer, NO_REPLICATION_ENABLED};
