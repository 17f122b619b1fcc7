// src/uplink/session.rs

use crate::common::{
    error::UplinkError,
    hal_traits::{BusClock, LoraModem},
    timing::JOIN_RETRY_DELAY,
};

/// Regional channel plan.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    Eu868,
    Us915,
    As923,
    Au915,
    Kr920,
    In865,
}

/// OTAA join keys.
#[derive(Clone, Eq, PartialEq)]
pub struct JoinCredentials {
    pub app_eui: [u8; 8],
    pub app_key: [u8; 16],
}

impl JoinCredentials {
    pub const fn new(app_eui: [u8; 8], app_key: [u8; 16]) -> Self {
        JoinCredentials { app_eui, app_key }
    }
}

// The app key is a secret; keep it out of logs.
impl core::fmt::Debug for JoinCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JoinCredentials")
            .field("app_eui", &self.app_eui)
            .finish_non_exhaustive()
    }
}

/// Radio session: the modem handle plus the bookkeeping around it.
#[derive(Debug)]
pub struct Session<M> {
    modem: M,
    started: bool,
    uplinks_sent: u32,
}

impl<M: LoraModem> Session<M> {
    pub fn new(modem: M) -> Self {
        Session { modem, started: false, uplinks_sent: 0 }
    }

    pub fn modem(&self) -> &M {
        &self.modem
    }

    pub fn modem_mut(&mut self) -> &mut M {
        &mut self.modem
    }

    pub fn is_joined(&self) -> bool {
        self.modem.is_joined()
    }

    pub fn uplinks_sent(&self) -> u32 {
        self.uplinks_sent
    }

    /// Starts the modem on `region`. Calling it again is a no-op.
    pub fn begin(&mut self, region: Region) -> Result<(), UplinkError<M::Error>> {
        if self.started {
            return Ok(());
        }
        self.modem.begin(region).map_err(UplinkError::Radio)?;
        self.started = true;
        info!("lora: modem started");
        Ok(())
    }

    /// Joins the network unless already joined.
    ///
    /// Makes up to `attempts` OTAA joins, waiting `JOIN_RETRY_DELAY` between
    /// two of them. A modem error aborts immediately.
    pub fn ensure_joined<C: BusClock>(
        &mut self,
        credentials: &JoinCredentials,
        attempts: u8,
        clock: &mut C,
    ) -> Result<(), UplinkError<M::Error>> {
        if self.modem.is_joined() {
            return Ok(());
        }

        for attempt in 1..=attempts {
            if self.modem.join_otaa(credentials).map_err(UplinkError::Radio)? {
                info!("lora: joined after {=u8} attempt(s)", attempt);
                return Ok(());
            }
            warn!("lora: join attempt {=u8} rejected", attempt);
            if attempt < attempts {
                clock.delay_ms(JOIN_RETRY_DELAY.as_millis() as u32);
            }
        }

        Err(UplinkError::JoinFailed { attempts })
    }

    /// Sends an encoded frame on `port`.
    pub fn send(&mut self, port: u8, payload: &[u8], confirmed: bool) -> Result<(), UplinkError<M::Error>> {
        if !matches!(port, 1..=223) {
            return Err(UplinkError::InvalidPort(port));
        }
        if !self.modem.is_joined() {
            return Err(UplinkError::NotJoined);
        }
        let max = self.modem.max_payload_len();
        if payload.len() > max {
            return Err(UplinkError::PayloadTooLarge { needed: payload.len(), max });
        }

        self.modem.send(port, payload, confirmed).map_err(UplinkError::Radio)?;
        self.uplinks_sent = self.uplinks_sent.wrapping_add(1);
        debug!("lora: sent {=usize} bytes on port {=u8}", payload.len(), port);
        Ok(())
    }
}
