//! Filter subsystem
//!
//! Resolves a loosely specified filter block (name regex, ip, date expression,
//! latest/earliest, metadata) to exactly one VCD entity.
//!
//! # Module Structure
//!
//! - [`criteria`] - Typed filter block and the criteria builder
//! - [`block`] - Parsing of the untyped list-of-one-map block shape
//! - [`date`] - Date expressions (`>= 02-jan-2020`)
//! - [`matcher`] - Client-side evaluation of criteria on query items
//! - [`resolver`] - Exactly-one-match resolution over a pluggable search
//! - [`lookup`] - Per-entity lookups (catalog, catalog item, media, network, edge gateway)
//!
//! # Example
//!
//! ```ignore
//! use crate::filter::{get_edge_gateway_by_filter, FilterConfig};
//!
//! async fn example(vdc: &Vdc) -> anyhow::Result<()> {
//!     let filter = FilterConfig {
//!         name_regex: Some("^edge-".into()),
//!         ..Default::default()
//!     };
//!     let gateway = get_edge_gateway_by_filter(vdc, &filter).await?;
//!     println!("{}", gateway.edge_gateway.href);
//!     Ok(())
//! }
//! ```

pub mod block;
pub mod criteria;
pub mod date;
pub mod error;
pub mod lookup;
pub mod matcher;
pub mod resolver;

pub use criteria::{
    build_criteria, build_metadata_criteria, FilterConfig, FilterDefinition, MetadataConfig,
    MetadataCriterion,
};
pub use date::compare_date;
pub use error::FilterError;
pub use lookup::{
    get_catalog_by_filter, get_catalog_item_by_filter, get_edge_gateway_by_filter,
    get_media_by_filter, get_network_by_filter, NetworkKind,
};
pub use resolver::{get_entity_by_filter, FilteredSearcher};
