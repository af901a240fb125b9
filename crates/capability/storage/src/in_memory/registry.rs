use super::InMemoryFleetStore;
use crate::error::StorageError;
use crate::traits::{StorageHealth, VehicleRegistry};
use domain::VehicleRef;

#[async_trait::async_trait]
impl VehicleRegistry for InMemoryFleetStore {
    async fn find_by_imei(&self, imei: &str) -> Result<Option<VehicleRef>, StorageError> {
        let state = self.read()?;
        Ok(state
            .imei_index
            .get(imei)
            .map(|vehicle_id| VehicleRef::new(*vehicle_id, imei)))
    }
}

#[async_trait::async_trait]
impl StorageHealth for InMemoryFleetStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.read().map(|_| ())
    }
}
