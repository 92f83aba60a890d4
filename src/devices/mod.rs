//! Static directory of known Meshtastic devices.
//!
//! Maps the human-chosen short identifier of each node to its numeric mesh
//! address. The table is fixed at startup and shared read-only, so lookups
//! need no locking.

/// One known mesh device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Short identifier as printed on the node (hex-looking, but treated
    /// as an opaque string)
    pub short_id: String,
    /// Numeric address on the mesh network
    pub numeric_address: u64,
}

/// Read-only lookup table over all known devices
#[derive(Debug, Clone)]
pub struct DeviceDirectory {
    devices: Vec<DeviceRecord>,
}

impl DeviceDirectory {
    /// Builds a directory from `(short_id, numeric_address)` pairs.
    pub fn new(entries: &[(&str, u64)]) -> Self {
        let devices = entries
            .iter()
            .map(|(short_id, numeric_address)| DeviceRecord {
                short_id: short_id.to_string(),
                numeric_address: *numeric_address,
            })
            .collect();
        Self { devices }
    }

    /// The nodes this deployment knows about.
    pub fn known_devices() -> Self {
        Self::new(&[("fa6f1418", 4201583640), ("435722f4", 1129784052)])
    }

    /// Resolves an identifier to a device record.
    ///
    /// Tries the identifier as a short id first, then as the decimal string
    /// form of each numeric address. Matching is case-sensitive and exact;
    /// the first hit wins.
    pub fn resolve(&self, identifier: &str) -> Option<&DeviceRecord> {
        self.devices
            .iter()
            .find(|d| d.short_id == identifier)
            .or_else(|| {
                self.devices
                    .iter()
                    .find(|d| d.numeric_address.to_string() == identifier)
            })
    }

    /// All records, in insertion order.
    pub fn records(&self) -> &[DeviceRecord] {
        &self.devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_short_id() {
        let directory = DeviceDirectory::known_devices();
        let record = directory.resolve("fa6f1418").unwrap();
        assert_eq!(record.numeric_address, 4201583640);
    }

    #[test]
    fn resolves_by_decimal_address() {
        let directory = DeviceDirectory::known_devices();
        let by_short = directory.resolve("fa6f1418").unwrap();
        let by_number = directory.resolve("4201583640").unwrap();
        assert_eq!(by_short, by_number);
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        let directory = DeviceDirectory::known_devices();
        assert!(directory.resolve("nope").is_none());
    }

    #[test]
    fn matching_is_case_sensitive() {
        let directory = DeviceDirectory::known_devices();
        assert!(directory.resolve("FA6F1418").is_none());
    }

    #[test]
    fn no_partial_matches() {
        let directory = DeviceDirectory::known_devices();
        assert!(directory.resolve("fa6f").is_none());
        assert!(directory.resolve("42015836").is_none());
    }

    #[test]
    fn second_device_resolves_too() {
        let directory = DeviceDirectory::known_devices();
        let record = directory.resolve("435722f4").unwrap();
        assert_eq!(record.numeric_address, 1129784052);
    }
}
