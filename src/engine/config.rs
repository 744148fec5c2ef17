/// Number of RPM buckets in a cut-time map.
pub const CUT_MAP_BUCKETS: usize = 11;
/// First bucket starts here; everything below uses bucket 0.
pub const CUT_MAP_FIRST_RPM: u16 = 5_000;
/// Width of one bucket in RPM.
pub const CUT_MAP_BUCKET_SPAN_RPM: u16 = 1_000;

/// Ignition-cut duration table indexed by RPM bucket.
///
/// Bucket `i` covers `[5000 + i*1000, 5000 + (i+1)*1000)` RPM. RPM below
/// 5000 uses the first entry, RPM at or above 15000 the last. Entries are
/// independently tunable millisecond durations; bounds are the configuration
/// source's business, not ours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CutTimeMap([u16; CUT_MAP_BUCKETS]);

impl CutTimeMap {
    pub const fn new(entries: [u16; CUT_MAP_BUCKETS]) -> Self {
        Self(entries)
    }

    pub const fn uniform(duration_ms: u16) -> Self {
        Self([duration_ms; CUT_MAP_BUCKETS])
    }

    /// Cut duration for the given RPM.
    pub fn duration_ms(&self, rpm: u16) -> u16 {
        if rpm < CUT_MAP_FIRST_RPM {
            return self.0[0];
        }
        let bucket = ((rpm - CUT_MAP_FIRST_RPM) / CUT_MAP_BUCKET_SPAN_RPM) as usize;
        self.0[bucket.min(CUT_MAP_BUCKETS - 1)]
    }

    pub const fn entries(&self) -> &[u16; CUT_MAP_BUCKETS] {
        &self.0
    }
}

/// Engine configuration, replaceable as a whole at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Shift triggers below this RPM are ignored unless manually overridden.
    pub min_rpm_threshold: u16,
    /// Minimum spacing between accepted shift-sensor triggers.
    pub debounce_time_ms: u16,
    pub cut_time_map: CutTimeMap,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_rpm_threshold: 3_000,
            debounce_time_ms: 50,
            cut_time_map: CutTimeMap::uniform(80),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_first_bucket_uses_entry_zero() {
        let map = CutTimeMap::new([10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20]);
        assert_eq!(map.duration_ms(0), 10);
        assert_eq!(map.duration_ms(2_500), 10);
        assert_eq!(map.duration_ms(4_999), 10);
    }

    #[test]
    fn bucket_boundaries_map_by_thousand() {
        let map = CutTimeMap::new([10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20]);
        assert_eq!(map.duration_ms(5_000), 10);
        assert_eq!(map.duration_ms(5_999), 10);
        assert_eq!(map.duration_ms(6_000), 11);
        assert_eq!(map.duration_ms(9_500), 14);
        assert_eq!(map.duration_ms(14_999), 19);
    }

    #[test]
    fn at_or_above_top_uses_last_entry() {
        let map = CutTimeMap::new([10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20]);
        assert_eq!(map.duration_ms(15_000), 20);
        assert_eq!(map.duration_ms(u16::MAX), 20);
    }

    #[test]
    fn whole_u16_range_stays_in_bounds() {
        let map = CutTimeMap::uniform(80);
        for rpm in (0..=u16::MAX).step_by(97) {
            assert_eq!(map.duration_ms(rpm), 80);
        }
        assert_eq!(map.duration_ms(u16::MAX), 80);
    }

    #[test]
    fn default_config_matches_shipping_values() {
        let config = EngineConfig::default();
        assert_eq!(config.min_rpm_threshold, 3_000);
        assert_eq!(config.debounce_time_ms, 50);
        assert_eq!(config.cut_time_map, CutTimeMap::uniform(80));
    }
}
