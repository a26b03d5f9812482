//! VCD API interaction module
//!
//! This module provides the pieces needed to talk to VMware Cloud Director:
//! session authentication, the HTTP client, the query service and the
//! entity objects the filter lookups return.
//!
//! # Module Structure
//!
//! - [`auth`] - Session login and token caching
//! - [`client`] - Main VCD client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//! - [`query`] - Inventory query service and query records
//! - [`entities`] - Org, VDC, catalog and the objects they contain
//!
//! # Example
//!
//! ```ignore
//! use crate::vcd::{auth::LoginInfo, client::VcdClient};
//!
//! async fn example(login: LoginInfo) -> anyhow::Result<()> {
//!     let client = VcdClient::new("https://vcd.example.com/api", login, "37.0", false).await?;
//!     let org = client.get_org_by_name("tenant1").await?;
//!     let vdc = org.get_vdc_by_name("vdc1").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod entities;
pub mod http;
pub mod query;
