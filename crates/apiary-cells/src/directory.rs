use apiary_store::{BlobKey, BlobStore, StoreResult, TierSet};
use apiary_types::{Cell, CellAddress, CellAddressMapping, GridCoordinate, GridKind};

/// Read-only address and cell lookups over a blob store.
///
/// Resolution goes address to coordinate, many to one; the reverse
/// direction reads the alias set recorded on the cell itself. Lookups go
/// through the store's read path and see exactly what the last committed
/// transaction wrote.
pub struct AddressDirectory<'a, S: BlobStore> {
    store: &'a S,
}

impl<'a, S: BlobStore> AddressDirectory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve an address to its coordinate within a grid. `None` is not
    /// an error; it means the address is free.
    pub fn resolve(
        &self,
        grid: GridKind,
        address: &CellAddress,
    ) -> StoreResult<Option<GridCoordinate>> {
        let key = BlobKey::address(grid, address.clone());
        match self.store.read(&key, &TierSet::read_path())? {
            Some(record) => Ok(Some(record.to_mapping()?.coordinate)),
            None => Ok(None),
        }
    }

    /// The alias set recorded for a coordinate, primary first. Empty when
    /// no cell exists there.
    pub fn addresses_of(
        &self,
        grid: GridKind,
        coordinate: GridCoordinate,
    ) -> StoreResult<Vec<CellAddress>> {
        let mapping = CellAddressMapping::new(grid, coordinate);
        Ok(self
            .cell_at(mapping)?
            .map(|cell| cell.addresses)
            .unwrap_or_default())
    }

    /// Fetch the cell at a mapping through the read path.
    pub fn cell_at(&self, mapping: CellAddressMapping) -> StoreResult<Option<Cell>> {
        match self
            .store
            .read(&BlobKey::cell(mapping), &TierSet::read_path())?
        {
            Some(record) => Ok(Some(record.to_cell()?)),
            None => Ok(None),
        }
    }
}
