//! Storefront adapters
//!
//! Every storefront is driven through the same [`SiteAdapter`] contract over an
//! explicit [`Page`] handle. Storefronts differ only in their [`SiteProfile`]
//! configuration table; [`ConfiguredAdapter`] turns a profile into a working
//! adapter.

pub mod adapter;
pub mod html;
pub mod memory;
pub mod ports;
pub mod profile;
pub mod registry;

pub use adapter::{applied_in, ConfiguredAdapter, FacetAttempt, SiteAdapter};
pub use html::HtmlSnapshotPage;
pub use memory::{DemoStoreFixture, FakeElement, InMemoryPage, PageFixture};
pub use ports::{ElementId, ElementSnapshot, Page};
pub use profile::{builtin_profiles, ChipSelectors, SectionSelectors, SiteProfile};
pub use registry::AdapterRegistry;
