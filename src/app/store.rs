//! Flash-backed engine configuration.
//!
//! A fixed-size record in the last flash sector. The web-configuration
//! layer that edits these values lives outside this firmware; here we only
//! load a record at boot and can write one back. An erased or corrupt
//! record means defaults.

use embedded_storage::{ReadStorage, Storage};
use esp_storage::FlashStorage;
use quickshifter::engine::{CutTimeMap, EngineConfig};

use super::config::{CONFIG_STORE_MAGIC, CONFIG_STORE_RECORD_LEN, CONFIG_STORE_VERSION};

pub(crate) struct ConfigStore<'d> {
    flash: FlashStorage<'d>,
    offset: u32,
}

impl<'d> ConfigStore<'d> {
    pub(crate) fn new(flash_peripheral: esp_hal::peripherals::FLASH<'d>) -> Self {
        let flash = FlashStorage::new(flash_peripheral).multicore_auto_park();
        let capacity = flash.capacity() as u32;
        let offset = capacity.saturating_sub(FlashStorage::SECTOR_SIZE);
        Self { flash, offset }
    }

    pub(crate) fn load(&mut self) -> Option<EngineConfig> {
        let mut record = [0u8; CONFIG_STORE_RECORD_LEN];
        self.flash.read(self.offset, &mut record).ok()?;
        decode_record(&record)
    }

    pub(crate) fn save(&mut self, config: &EngineConfig) {
        if self.load().as_ref() == Some(config) {
            return;
        }
        let record = encode_record(config);
        let _ = self.flash.write(self.offset, &record);
    }
}

fn encode_record(config: &EngineConfig) -> [u8; CONFIG_STORE_RECORD_LEN] {
    let mut record = [0u8; CONFIG_STORE_RECORD_LEN];
    record[0..4].copy_from_slice(&CONFIG_STORE_MAGIC.to_le_bytes());
    record[4] = CONFIG_STORE_VERSION;
    record[6..8].copy_from_slice(&config.min_rpm_threshold.to_le_bytes());
    record[8..10].copy_from_slice(&config.debounce_time_ms.to_le_bytes());
    for (i, entry) in config.cut_time_map.entries().iter().enumerate() {
        let at = 10 + i * 2;
        record[at..at + 2].copy_from_slice(&entry.to_le_bytes());
    }
    record[CONFIG_STORE_RECORD_LEN - 1] = checksum8(&record[..CONFIG_STORE_RECORD_LEN - 1]);
    record
}

fn decode_record(record: &[u8; CONFIG_STORE_RECORD_LEN]) -> Option<EngineConfig> {
    if record.iter().all(|&byte| byte == 0xFF) {
        return None;
    }
    if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != CONFIG_STORE_MAGIC {
        return None;
    }
    if record[4] != CONFIG_STORE_VERSION {
        return None;
    }
    let expected = checksum8(&record[..CONFIG_STORE_RECORD_LEN - 1]);
    if record[CONFIG_STORE_RECORD_LEN - 1] != expected {
        return None;
    }

    let mut map = [0u16; 11];
    for (i, entry) in map.iter_mut().enumerate() {
        let at = 10 + i * 2;
        *entry = u16::from_le_bytes([record[at], record[at + 1]]);
    }
    Some(EngineConfig {
        min_rpm_threshold: u16::from_le_bytes([record[6], record[7]]),
        debounce_time_ms: u16::from_le_bytes([record[8], record[9]]),
        cut_time_map: CutTimeMap::new(map),
    })
}

fn checksum8(bytes: &[u8]) -> u8 {
    let mut acc = 0x5Au8;
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}
