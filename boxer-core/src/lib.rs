//! Boxer core library exports

pub mod checksum;
pub mod config;
pub mod error;
pub mod ledger;
pub mod packager;
pub mod release;
pub mod template;
pub mod version;

pub use config::{CliOverrides, EffectiveConfig};
pub use error::BoxerError;
pub use ledger::{Ledger, ProviderRecord, VersionEntry};
pub use packager::{CommandPackager, Packager};
pub use release::{ReleaseReport, RunOptions};
