// src/device/context.rs

use super::state::{CollectionTimestamps, ErrorTally};
use crate::common::{
    config::DeviceConfig,
    error::ConfigError,
    hal_traits::LoraModem,
};
use crate::uplink::session::{JoinCredentials, Session};

/// Everything a control unit keeps between loop cycles.
///
/// Owns the radio session, the collection timestamps and the error tally.
/// Functions that need device state borrow the context instead of reaching
/// for globals.
#[derive(Debug)]
pub struct DeviceContext<M: LoraModem> {
    config: DeviceConfig,
    credentials: JoinCredentials,
    session: Session<M>,
    timestamps: CollectionTimestamps,
    errors: ErrorTally,
}

impl<M: LoraModem> DeviceContext<M> {
    /// Validates `config` and takes ownership of the modem.
    pub fn new(config: DeviceConfig, credentials: JoinCredentials, modem: M) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(DeviceContext {
            config,
            credentials,
            session: Session::new(modem),
            timestamps: CollectionTimestamps::new(),
            errors: ErrorTally::new(),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn credentials(&self) -> &JoinCredentials {
        &self.credentials
    }

    pub fn session(&self) -> &Session<M> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<M> {
        &mut self.session
    }

    pub fn modem(&self) -> &M {
        self.session.modem()
    }

    pub fn modem_mut(&mut self) -> &mut M {
        self.session.modem_mut()
    }

    pub fn timestamps(&self) -> &CollectionTimestamps {
        &self.timestamps
    }

    pub fn timestamps_mut(&mut self) -> &mut CollectionTimestamps {
        &mut self.timestamps
    }

    pub fn errors(&self) -> &ErrorTally {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorTally {
        &mut self.errors
    }

    /// Splits the borrow so the controller can use the session while
    /// updating the tally and timestamps.
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&DeviceConfig, &JoinCredentials, &mut Session<M>, &mut CollectionTimestamps, &mut ErrorTally) {
        (
            &self.config,
            &self.credentials,
            &mut self.session,
            &mut self.timestamps,
            &mut self.errors,
        )
    }
}
