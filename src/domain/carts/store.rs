//! File-backed cart store.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::domain::{
    carts::{
        errors::CartStoreError,
        models::{AddOutcome, CartLine},
    },
    catalog::models::ItemUuid,
};

/// A buyer's staged selection, persisted to a local file.
///
/// The cart is purely a staging area: it holds no server-side lock and
/// touches no catalog stock. Every mutation is flushed to the backing
/// file so the selection survives process restarts within a session.
#[derive(Debug)]
pub struct FileCartStore {
    path: PathBuf,
    lines: Vec<CartLine>,
}

impl FileCartStore {
    /// Open a cart at the given path, loading any previously staged lines.
    ///
    /// A missing file is an empty cart. Unreadable state is discarded
    /// rather than blocking the buyer.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CartStoreError> {
        let path = path.as_ref().to_path_buf();

        let lines = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(lines) => lines,
                Err(error) => {
                    warn!(%error, path = %path.display(), "discarding unreadable cart state");
                    Vec::new()
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };

        Ok(Self { path, lines })
    }

    /// Stage an item. Staging an id that is already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when the cart file cannot be written.
    pub fn add(&mut self, line: CartLine) -> Result<AddOutcome, CartStoreError> {
        if self.lines.iter().any(|l| l.item_uuid == line.item_uuid) {
            return Ok(AddOutcome::AlreadyInCart);
        }

        self.lines.push(line);
        self.flush()?;

        Ok(AddOutcome::Added)
    }

    /// Drop an item from the cart. An absent id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when the cart file cannot be written.
    pub fn remove(&mut self, item: ItemUuid) -> Result<(), CartStoreError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.item_uuid != item);

        if self.lines.len() != before {
            self.flush()?;
        }

        Ok(())
    }

    /// Empty the cart and remove the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing file cannot be removed.
    pub fn clear(&mut self) -> Result<(), CartStoreError> {
        self.lines.clear();

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Sum of the staged price snapshots.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.lines.iter().map(|l| l.price).sum()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn flush(&self) -> Result<(), CartStoreError> {
        let bytes = serde_json::to_vec(&self.lines).map_err(CartStoreError::Encode)?;
        fs::write(&self.path, bytes)?;

        Ok(())
    }
}
