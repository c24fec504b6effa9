//! # witness-cli: Operator CLI for the Witness Registry
//!
//! Provides the `witness` command-line interface.
//!
//! ## Subcommands
//!
//! - `witness store`: inspect the content store (put, get, verify, list).
//! - `witness report`: read reports from the registry and submit new ones
//!   through the same intake pipeline the HTTP gateway uses.
//!
//! ```bash
//! witness --cas-dir ./data/cas store list
//! witness --registry-url http://localhost:8090 report get 12
//! witness report submit --category theft --subcategory bicycle \
//!     --date 2024-01-05 --time 14:30 --name "A. Citizen" \
//!     --nearest-police-station Central --address "12 Main St" \
//!     --document photo.jpg --identity id.png
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Error, or content failed verification |
//! | 2 | Requested content or report not found |
//! | 3 | Report commit outcome unknown |

pub mod report;
pub mod store;

/// Exit code for content or reports that do not exist.
pub const EXIT_NOT_FOUND: u8 = 2;
/// Exit code for a submission whose commit outcome is unknown.
pub const EXIT_AMBIGUOUS: u8 = 3;
