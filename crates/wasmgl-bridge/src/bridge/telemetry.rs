use std::collections::BTreeMap;

/// One named value pushed by the guest or the frame driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub value: StatValue,
    /// Display unit, possibly empty.
    pub unit: String,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StatValue {
    F32(f32),
    I32(i32),
}

impl StatValue {
    pub fn as_f64(self) -> f64 {
        match self {
            StatValue::F32(v) => v as f64,
            StatValue::I32(v) => v as f64,
        }
    }
}

/// Latest value of every stat, keyed by a `Group/name` path. Read by an
/// external HUD; the bridge never interprets the values.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    stats: BTreeMap<String, Stat>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_f32(&mut self, name: &str, value: f32, unit: &str) {
        self.set(name, StatValue::F32(value), unit);
    }

    pub fn set_i32(&mut self, name: &str, value: i32, unit: &str) {
        self.set(name, StatValue::I32(value), unit);
    }

    fn set(&mut self, name: &str, value: StatValue, unit: &str) {
        match self.stats.get_mut(name) {
            Some(stat) => {
                stat.value = value;
                if stat.unit != unit {
                    stat.unit = unit.to_string();
                }
            }
            None => {
                self.stats.insert(
                    name.to_string(),
                    Stat {
                        value,
                        unit: unit.to_string(),
                    },
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Stat> {
        self.stats.get(name)
    }

    /// Stats in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stat)> {
        self.stats.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn clear(&mut self) {
        self.stats.clear();
    }
}
