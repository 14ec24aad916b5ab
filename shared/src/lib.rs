use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Latest field values for one sensor group, keyed by field name.
/// Values stay as raw JSON so new firmware fields pass through untouched.
pub type FieldMap = serde_json::Map<String, Value>;

/// The closed set of sensor groups the rig reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorGroup {
    /// Accelerometer / gyro / accident lines from the STM32 board.
    Stm32,
    /// Barometric pressure module (temp, pressure, altitude).
    Bmp180,
    /// Motor channel readings (TEMP, VIB, RPM).
    Ch,
}

impl SensorGroup {
    pub const ALL: [SensorGroup; 3] = [SensorGroup::Stm32, SensorGroup::Bmp180, SensorGroup::Ch];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorGroup::Stm32 => "STM32",
            SensorGroup::Bmp180 => "BMP180",
            SensorGroup::Ch => "CH",
        }
    }

    /// Group for a wire name. `None` for anything outside the closed set,
    /// which callers treat as "ignore this key".
    pub fn from_name(name: &str) -> Option<SensorGroup> {
        match name {
            "STM32" => Some(SensorGroup::Stm32),
            "BMP180" => Some(SensorGroup::Bmp180),
            "CH" => Some(SensorGroup::Ch),
            _ => None,
        }
    }
}

/// Latest-value state for every sensor group, shared between tasks.
///
/// All three groups exist from construction, so a snapshot always carries
/// every group key even before the first update arrives.
pub struct TelemetryStore {
    groups: Mutex<BTreeMap<SensorGroup, FieldMap>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        let mut groups = BTreeMap::new();
        for group in SensorGroup::ALL {
            groups.insert(group, FieldMap::new());
        }
        TelemetryStore {
            groups: Mutex::new(groups),
        }
    }

    /// Merge an update into one group. Only the named fields are
    /// overwritten; fields absent from `fields` keep their current value.
    pub fn merge(&self, group: SensorGroup, fields: FieldMap) {
        let mut groups = self.groups.lock().expect("failed to get lock");
        groups.entry(group).or_default().extend(fields);
    }

    /// Deep copy of the current state. Later merges never show through.
    pub fn snapshot(&self) -> BTreeMap<SensorGroup, FieldMap> {
        self.groups.lock().expect("failed to get lock").clone()
    }

    /// Current state serialized once, for fanout to every viewer.
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        TelemetryStore::new()
    }
}
