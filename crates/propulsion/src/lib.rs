//! Vessel Δv budget and propellant accounting for committed transfers.

use window_core::constants::G0;

/// Mass properties of a chemical stage, used for rocket-equation accounting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageMass {
    pub dry_mass_kg: f64,
    pub propellant_mass_kg: f64,
    pub isp_seconds: f64,
}

impl StageMass {
    /// Convenience accessor for total initial mass.
    pub fn initial_mass_kg(&self) -> f64 {
        self.dry_mass_kg + self.propellant_mass_kg
    }

    /// Effective exhaust velocity in km/s.
    pub fn exhaust_velocity_km_s(&self) -> f64 {
        self.isp_seconds * G0 / 1_000.0
    }

    /// Ideal Δv (km/s) when burning the full propellant load.
    pub fn ideal_delta_v_km_s(&self) -> f64 {
        if self.dry_mass_kg <= 0.0 {
            return f64::INFINITY;
        }
        self.exhaust_velocity_km_s() * (self.initial_mass_kg() / self.dry_mass_kg).ln()
    }

    /// Propellant mass burned for `delta_v_km_s`, starting from a full load.
    pub fn propellant_for(&self, delta_v_km_s: f64) -> f64 {
        let ve = self.exhaust_velocity_km_s();
        if ve <= 0.0 || delta_v_km_s <= 0.0 {
            return 0.0;
        }
        let m0 = self.initial_mass_kg();
        m0 - m0 * (-delta_v_km_s / ve).exp()
    }
}

/// Vessel flying the transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Vessel {
    pub name: String,
    /// Explicit Δv budget (km/s); overrides the rocket-equation value when set.
    pub max_delta_v_km_s: Option<f64>,
    pub stage: Option<StageMass>,
}

impl Vessel {
    /// Vessel described only by its usable Δv.
    pub fn with_budget(name: impl Into<String>, max_delta_v_km_s: f64) -> Self {
        Self {
            name: name.into(),
            max_delta_v_km_s: Some(max_delta_v_km_s),
            stage: None,
        }
    }

    /// Maximum usable Δv in km/s; zero when the vessel carries no budget at all.
    pub fn max_delta_v_km_s(&self) -> f64 {
        match (self.max_delta_v_km_s, self.stage) {
            (Some(budget), _) => budget,
            (None, Some(stage)) => stage.ideal_delta_v_km_s(),
            (None, None) => 0.0,
        }
    }

    /// Share of the propellant load (percent) consumed by `delta_v_km_s`.
    ///
    /// Stages with mass data use the rocket equation; otherwise the share is linear
    /// in the Δv budget. Values above 100 flag a transfer the vessel cannot fly.
    pub fn used_propellant_percent(&self, delta_v_km_s: f64) -> f64 {
        if !delta_v_km_s.is_finite() {
            return f64::INFINITY;
        }
        match self.stage {
            Some(stage) if self.max_delta_v_km_s.is_none() && stage.propellant_mass_kg > 0.0 => {
                100.0 * stage.propellant_for(delta_v_km_s) / stage.propellant_mass_kg
            }
            _ => {
                let budget = self.max_delta_v_km_s();
                if budget > 0.0 {
                    100.0 * delta_v_km_s / budget
                } else {
                    f64::INFINITY
                }
            }
        }
    }
}
