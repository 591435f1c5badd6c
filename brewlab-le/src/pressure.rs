//! Espresso pressure profile compatibility
//!
//! Checks whether a machine's capabilities satisfy a pressure profile's
//! requirements. Requirements are checked in a fixed order (profiling, flow
//! control, pre-infusion) and the first unmet one is reported.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

/// Pressure profiling capability of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profiling {
    None,
    /// Operator modulates pressure by hand
    Manual,
    Programmable,
}

/// Pre-infusion capability of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreInfusion {
    None,
    Mechanical,
    Full,
}

impl PreInfusion {
    pub fn is_supported(&self) -> bool {
        !matches!(self, PreInfusion::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlType {
    Fixed,
    FlowLed,
    PressureLed,
    Programmable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineCapabilities {
    pub pressure_profiling: Profiling,
    pub flow_control: bool,
    pub pre_infusion: PreInfusion,
    pub control_type: ControlType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequirements {
    pub pressure_profiling: bool,
    pub flow_control: bool,
    pub pre_infusion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PressureProfile {
    pub label: &'static str,
    pub requires: ProfileRequirements,
}

/// Outcome of a compatibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    pub compatible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Compatibility {
    fn ok() -> Self {
        Self {
            compatible: true,
            reason: None,
            warning: None,
        }
    }

    fn rejected(reason: &str) -> Self {
        Self {
            compatible: false,
            reason: Some(reason.to_string()),
            warning: None,
        }
    }
}

static MACHINES: Lazy<BTreeMap<&'static str, MachineCapabilities>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "la-marzocco-linea-mini",
            MachineCapabilities {
                pressure_profiling: Profiling::None,
                flow_control: false,
                pre_infusion: PreInfusion::Mechanical,
                control_type: ControlType::Fixed,
            },
        ),
        (
            "slayer-steam",
            MachineCapabilities {
                pressure_profiling: Profiling::Manual,
                flow_control: true,
                pre_infusion: PreInfusion::Full,
                control_type: ControlType::FlowLed,
            },
        ),
        (
            "synesso-mvp-hydra",
            MachineCapabilities {
                pressure_profiling: Profiling::Programmable,
                flow_control: false,
                pre_infusion: PreInfusion::Full,
                control_type: ControlType::PressureLed,
            },
        ),
        (
            "decent-de1",
            MachineCapabilities {
                pressure_profiling: Profiling::Programmable,
                flow_control: true,
                pre_infusion: PreInfusion::Full,
                control_type: ControlType::Programmable,
            },
        ),
    ])
});

static PROFILES: Lazy<BTreeMap<&'static str, PressureProfile>> = Lazy::new(|| {
    let requires = |pressure_profiling, flow_control, pre_infusion| ProfileRequirements {
        pressure_profiling,
        flow_control,
        pre_infusion,
    };
    BTreeMap::from([
        (
            "classic_9bar",
            PressureProfile {
                label: "Classic 9 Bar",
                requires: requires(false, false, false),
            },
        ),
        (
            "gentle_preinfusion",
            PressureProfile {
                label: "Gentle Pre-Infusion → 9 Bar",
                requires: requires(false, false, true),
            },
        ),
        (
            "declining_pressure",
            PressureProfile {
                label: "Declining Pressure (9 → 6 bar)",
                requires: requires(true, false, false),
            },
        ),
        (
            "slayer_style_flow",
            PressureProfile {
                label: "Slayer-Style Flow Control",
                requires: requires(false, true, false),
            },
        ),
        (
            "blooming_espresso",
            PressureProfile {
                label: "Blooming Espresso (Low pressure soak)",
                requires: requires(true, false, true),
            },
        ),
        (
            "lever_style_profile",
            PressureProfile {
                label: "Lever-Style Decline",
                requires: requires(true, false, false),
            },
        ),
    ])
});

pub fn machine(id: &str) -> Option<&'static MachineCapabilities> {
    MACHINES.get(id)
}

pub fn profile(id: &str) -> Option<&'static PressureProfile> {
    PROFILES.get(id)
}

/// Machines with known capabilities, sorted
pub fn machine_ids() -> Vec<&'static str> {
    MACHINES.keys().copied().collect()
}

/// Profile ids with labels, sorted by id
pub fn profiles() -> Vec<(&'static str, &'static str)> {
    PROFILES.iter().map(|(id, p)| (*id, p.label)).collect()
}

/// Check a machine against a profile
pub fn evaluate(machine_id: &str, profile_id: &str) -> Compatibility {
    let (Some(machine), Some(profile)) = (machine(machine_id), profile(profile_id)) else {
        return Compatibility::rejected("Unknown machine or profile");
    };
    let requires = profile.requires;

    if requires.pressure_profiling && machine.pressure_profiling == Profiling::None {
        return Compatibility::rejected("Machine does not support programmable pressure profiling");
    }
    if requires.flow_control && !machine.flow_control {
        return Compatibility::rejected("Machine lacks flow control capability");
    }
    if requires.pre_infusion && !machine.pre_infusion.is_supported() {
        return Compatibility::rejected("Machine does not support pre-infusion");
    }
    if requires.pressure_profiling && machine.pressure_profiling == Profiling::Manual {
        return Compatibility {
            warning: Some("Profile requires manual control during extraction".to_string()),
            ..Compatibility::ok()
        };
    }

    Compatibility::ok()
}
