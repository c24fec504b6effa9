//! # witness-core: Foundational Types for the Witness Registry
//!
//! Every other crate in the workspace depends on `witness-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ContentId`, `RegistryId` and
//!    `SubmissionToken` are distinct types with validated constructors.
//!    A registry id can never be passed where a content id is expected.
//!
//! 2. **Content ids are computed, never asserted.** The only way to obtain a
//!    `ContentId` from bytes is [`ContentId::digest`]; parsing is reserved for
//!    ids that arrive over the wire.
//!
//! 3. **Validation is a discrete step.** [`SubmissionFields::validate`] turns
//!    loosely-typed caller input into a [`ReportMetadata`] or a
//!    [`ValidationError`] listing every offending field. There is no
//!    partially-populated metadata value.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `witness-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod content;
pub mod error;
pub mod identity;
pub mod record;

pub use content::ContentId;
pub use error::ValidationError;
pub use identity::{RegistryId, SubmissionToken};
pub use record::{CommittedRecord, Record, ReportMetadata, SubmissionFields};
