use serde::Deserialize;

/// Step function from the number of vehicles seen around the origin to an
/// ETA multiplier. Upper bounds are inclusive: a count equal to a threshold
/// stays in the lower band.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrafficWeightPolicy {
    pub light_max: u32,
    pub moderate_max: u32,
    pub light_factor: f64,
    pub moderate_factor: f64,
    pub heavy_factor: f64,
}

impl Default for TrafficWeightPolicy {
    fn default() -> Self {
        Self {
            light_max: 25,
            moderate_max: 50,
            light_factor: 1.0,
            moderate_factor: 1.4,
            heavy_factor: 1.8,
        }
    }
}

impl TrafficWeightPolicy {
    pub fn multiplier(&self, vehicle_count: u32) -> f64 {
        if vehicle_count > self.moderate_max {
            self.heavy_factor
        } else if vehicle_count > self.light_max {
            self.moderate_factor
        } else {
            self.light_factor
        }
    }

    pub fn adjust_secs(&self, base_secs: f64, vehicle_count: u32) -> f64 {
        base_secs * self.multiplier(vehicle_count)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.light_max > self.moderate_max {
            return Err(format!(
                "light_max ({}) must not exceed moderate_max ({})",
                self.light_max, self.moderate_max
            ));
        }
        if !(self.light_factor <= self.moderate_factor && self.moderate_factor <= self.heavy_factor)
        {
            return Err("traffic factors must be non-decreasing".to_string());
        }
        Ok(())
    }
}
