//! medsheets Library
//!
//! Storage access layer for the sheets client: sheet records and their
//! images, the admin password, custom subjects and local topic flags.
//!
//! ```rust,no_run
//! use medsheets::storage::{self, settings, Storage};
//! use medsheets::Sheet;
//!
//! # async fn example() -> Result<(), medsheets::StorageError> {
//! medsheets::logging::init_logging();
//! let storage = storage::init(Storage::connect(settings::load_config())?)?;
//!
//! let mut sheet = Sheet::new(storage::generate_id(), 1_700_000_000_000)
//!     .with_image_url("data:image/png;base64,iVBORw0KGgo=");
//! storage.add_sheet(&mut sheet).await?;
//!
//! for sheet in storage.get_sheets().await {
//!     println!("{} {:?}", sheet.id, sheet.image_url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod storage;
pub mod types;

pub use storage::{Storage, StorageError};
pub use types::{Sheet, StoreConfig};
