//! External collaborator clients
//!
//! The runtime's tools lean on three outside capabilities: text/media
//! generation, marketplace search, and site publishing. Each sits behind
//! a trait so tools are testable without the network.

mod generation;
mod marketplace;
mod sites;

pub use generation::{
    GeneratedAsset, GenerationClient, MediaGenerator, MediaKind, MediaRequest, TextGenerator,
};
pub use marketplace::{ListingSearch, MarketplaceClient};
pub use sites::{SitePublisher, SitesClient};

#[cfg(test)]
pub use generation::{MockMediaGenerator, MockTextGenerator};
#[cfg(test)]
pub use marketplace::MockListingSearch;
#[cfg(test)]
pub use sites::MockSitePublisher;
