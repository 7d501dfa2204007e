//! Packaging and deployment of invitation sites
//!
//! Builds the zip archive of a rendered site, publishes it to its own
//! destination on the hosting provider and appends a proxy rule for the
//! slug to the main site's redirect table.

pub mod archive;
pub mod deploy;
pub mod error;
pub mod hosting;
pub mod redirects;

pub use archive::{ArchiveOptions, SiteArchive};
pub use deploy::{DeployConfig, DeployOutcome, DeployStage, Deployer, destination_name};
pub use error::{ArchiveError, DeployError, HostingError, Result};
pub use hosting::{DeployRecord, HostingProvider, MemoryHosting, NetlifyClient, SiteRecord};
pub use redirects::{
    CATCH_ALL_RULE, HostedRedirects, LedgerOutcome, RedirectLedger, RedirectRule, RedirectStore,
    RedirectTable,
};
