//! Advertisement payload packing.
//!
//! BlueZ hands out advertisement contents already parsed into properties.
//! Peripheral records carry the raw payload, so the parsed fields are packed
//! back into Bluetooth Core AD structures (`len`, `type`, `data...`).

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

/// AD type: complete local name.
pub const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;
/// AD type: TX power level.
pub const AD_TX_POWER_LEVEL: u8 = 0x0A;
/// AD type: service data, 128-bit UUID.
pub const AD_SERVICE_DATA_128: u8 = 0x21;
/// AD type: manufacturer specific data.
pub const AD_MANUFACTURER_DATA: u8 = 0xFF;

/// Parsed advertisement fields to pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisementFields {
    /// Local name.
    pub local_name: Option<String>,
    /// TX power in dBm.
    pub tx_power: Option<i16>,
    /// Manufacturer data keyed by company identifier.
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    /// Service data keyed by service UUID.
    pub service_data: HashMap<Uuid, Vec<u8>>,
}

impl AdvertisementFields {
    /// Pack into AD structures.
    ///
    /// Map entries are written in key order so equal fields always produce
    /// equal bytes. Fields too long for a single AD structure are skipped.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        if let Some(name) = &self.local_name {
            push_structure(&mut out, AD_COMPLETE_LOCAL_NAME, &[name.as_bytes()]);
        }
        if let Some(tx_power) = self.tx_power {
            // AD TX power is a signed byte; clamp what BlueZ reports as i16.
            let clamped = tx_power.clamp(i16::from(i8::MIN), i16::from(i8::MAX));
            let byte = i8::try_from(clamped).unwrap_or_default().to_le_bytes();
            push_structure(&mut out, AD_TX_POWER_LEVEL, &[&byte]);
        }

        let services: BTreeMap<_, _> = self.service_data.iter().collect();
        for (uuid, data) in services {
            let mut uuid_le = *uuid.as_bytes();
            uuid_le.reverse();
            push_structure(&mut out, AD_SERVICE_DATA_128, &[&uuid_le, data]);
        }

        let manufacturers: BTreeMap<_, _> = self.manufacturer_data.iter().collect();
        for (company, data) in manufacturers {
            push_structure(&mut out, AD_MANUFACTURER_DATA, &[&company.to_le_bytes(), data]);
        }

        out
    }
}

fn push_structure(out: &mut Vec<u8>, ad_type: u8, parts: &[&[u8]]) {
    let body_len: usize = parts.iter().map(|p| p.len()).sum();
    // The length byte counts the type byte plus the body.
    let Ok(len) = u8::try_from(body_len + 1) else {
        return;
    };
    out.push(len);
    out.push(ad_type);
    for part in parts {
        out.extend_from_slice(part);
    }
}
