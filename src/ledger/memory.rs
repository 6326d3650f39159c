use crate::error::Error;
use crate::ledger::{IpLedger, IpObservation};

#[derive(Default, Debug, Clone)]
pub struct InMemoryIpLedger {
    observations: Vec<IpObservation>,
}

impl InMemoryIpLedger {
    /// Every observation appended so far, oldest first.
    pub fn observations(&self) -> &[IpObservation] {
        &self.observations
    }
}

#[async_trait::async_trait]
impl IpLedger for InMemoryIpLedger {
    async fn read_last(&self) -> Result<Option<IpObservation>, Error> {
        Ok(self.observations.last().cloned())
    }

    async fn append(&mut self, observation: IpObservation) -> Result<(), Error> {
        self.observations.push(observation);
        Ok(())
    }
}
