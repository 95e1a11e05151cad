//! `Radio` on top of the esp-wifi ESP-NOW driver
//!
//! Creating the `EspNow` driver starts Wi-Fi in station mode, which is all
//! the interface preparation an ESP32-C3 needs. Region configuration goes
//! straight to the Wi-Fi driver, since esp-wifi has no safe wrapper for it.

use esp_wifi::esp_now::{EspNow, EspNowError, PeerInfo as EspPeerInfo};
use esp_wifi_sys::include::{
    esp_err_t, esp_wifi_set_country, wifi_country_policy_t_WIFI_COUNTRY_POLICY_AUTO,
    wifi_country_policy_t_WIFI_COUNTRY_POLICY_MANUAL, wifi_country_t, ESP_OK,
};
use nowcast::{
    Channel, Country, CountryPolicy, FrameSink, MacAddress, PeerInfo, Radio, Role,
};

/// Transmit power ceiling handed to the regulatory configuration, in dBm
const MAX_TX_POWER_DBM: i8 = 20;

#[derive(Debug, defmt::Format)]
pub enum EspNowRadioError {
    Driver(EspNowError),

    /// `esp_wifi_set_country` returned this status
    Country(esp_err_t),

    /// ESP32-class ESP-NOW has no roles; every station is a combo
    UnsupportedRole(Role),
}

impl From<EspNowError> for EspNowRadioError {
    fn from(e: EspNowError) -> Self {
        EspNowRadioError::Driver(e)
    }
}

pub struct EspNowRadio<'d> {
    esp_now: EspNow<'d>,
    sink: Option<FrameSink>,
}

impl<'d> EspNowRadio<'d> {
    pub fn new(esp_now: EspNow<'d>) -> Self {
        Self {
            esp_now,
            sink: None,
        }
    }
}

impl Radio for EspNowRadio<'_> {
    type Error = EspNowRadioError;

    fn set_country(&mut self, country: &Country) -> Result<(), Self::Error> {
        let wc = wifi_country_t {
            cc: [country.code[0] as _, country.code[1] as _, 0],
            schan: country.first_channel,
            nchan: country.channel_count,
            max_tx_power: MAX_TX_POWER_DBM,
            policy: match country.policy {
                CountryPolicy::Auto => wifi_country_policy_t_WIFI_COUNTRY_POLICY_AUTO,
                CountryPolicy::Manual => wifi_country_policy_t_WIFI_COUNTRY_POLICY_MANUAL,
            },
        };

        let status = unsafe { esp_wifi_set_country(&wc) };
        if status == ESP_OK as esp_err_t {
            Ok(())
        } else {
            Err(EspNowRadioError::Country(status))
        }
    }

    fn set_channel(&mut self, channel: Channel) -> Result<(), Self::Error> {
        self.esp_now.set_channel(channel.number())?;
        Ok(())
    }

    fn init_protocol(&mut self) -> Result<(), Self::Error> {
        // The driver was initialized on construction; make sure it answers
        let version = self.esp_now.version()?;
        defmt::info!("ESP-NOW version {}", version);
        Ok(())
    }

    fn set_role(&mut self, role: Role) -> Result<(), Self::Error> {
        match role {
            Role::Combo => Ok(()),
            other => Err(EspNowRadioError::UnsupportedRole(other)),
        }
    }

    fn add_peer(&mut self, peer: &PeerInfo) -> Result<(), Self::Error> {
        self.esp_now.add_peer(EspPeerInfo {
            peer_address: peer.address.octets(),
            lmk: peer.key,
            channel: Some(peer.channel.number()),
            encrypt: peer.key.is_some(),
        })?;
        Ok(())
    }

    fn register_receiver(&mut self, sink: FrameSink) -> Result<(), Self::Error> {
        self.sink = Some(sink);
        Ok(())
    }

    fn send(&mut self, dest: &MacAddress, payload: &[u8]) -> Result<(), Self::Error> {
        self.esp_now.send(&dest.octets(), payload)?.wait()?;
        Ok(())
    }

    fn service(&mut self) {
        while let Some(received) = self.esp_now.receive() {
            match self.sink.as_mut() {
                Some(sink) => {
                    sink.push(MacAddress::new(received.info.src_address), received.data());
                }
                None => defmt::trace!("No receiver registered, frame dropped"),
            }
        }
    }
}
