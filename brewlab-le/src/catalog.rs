//! Static brew catalog
//!
//! Read-only configuration data: recommended parameters per brew method,
//! base grind settings per grinder and method, and the grinder / espresso
//! machine lists offered to home and cafe users.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static brew parameters for one method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrewRecommendation {
    pub dose: &'static str,
    #[serde(rename = "yield")]
    pub yield_: &'static str,
    pub time: &'static str,
    pub grind: &'static str,
}

impl BrewRecommendation {
    /// Base brew time in seconds, if the time descriptor has a numeric form
    pub fn base_time_seconds(&self) -> Option<u32> {
        parse_time_seconds(self.time)
    }
}

/// Kind of user, selecting which equipment lists are offered
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Home,
    Cafe,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Home => "home",
            UserType::Cafe => "cafe",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn rec(
    dose: &'static str,
    yield_: &'static str,
    time: &'static str,
    grind: &'static str,
) -> BrewRecommendation {
    BrewRecommendation {
        dose,
        yield_,
        time,
        grind,
    }
}

static RECOMMENDATIONS: Lazy<BTreeMap<&'static str, BrewRecommendation>> = Lazy::new(|| {
    BTreeMap::from([
        ("espresso", rec("18-20g", "36-40g", "25-30s", "fine")),
        ("v60", rec("15-18g", "250-300ml", "2:30-3:30 min", "medium-fine")),
        ("chemex", rec("20-25g", "400-500ml", "3:30-4:30 min", "medium-coarse")),
        ("french-press", rec("30g", "500ml", "4-5 min", "coarse")),
        ("aeropress", rec("16g", "250ml", "1:30-2:00 min", "medium")),
        ("moka-pot", rec("15-20g", "150-250ml", "3-5 min", "fine")),
        ("turkish", rec("10g", "100ml", "2-3 min", "extra-fine")),
        ("balance-siphon", rec("20g", "300ml", "3-4 min", "medium")),
        ("syphon", rec("20g", "300ml", "3-4 min", "medium")),
        ("cold-brew", rec("100g", "1L", "12-18 hr", "coarse")),
    ])
});

/// Method order used by the grinder settings rows
const SETTING_METHODS: [&str; 10] = [
    "espresso",
    "v60",
    "chemex",
    "french-press",
    "aeropress",
    "moka-pot",
    "turkish",
    "balance-siphon",
    "syphon",
    "cold-brew",
];

static GRINDER_SETTINGS: Lazy<BTreeMap<&'static str, BTreeMap<&'static str, i32>>> =
    Lazy::new(|| {
        let rows: [(&str, [i32; 10]); 5] = [
            ("baratza-encore", [0, 18, 20, 25, 19, 15, 0, 20, 20, 30]),
            ("baratza-sette-270", [4, 8, 12, 16, 10, 6, 0, 12, 12, 18]),
            ("mazzer-mini", [4, 12, 16, 20, 14, 6, 0, 16, 16, 25]),
            ("mazzer-super-jolly", [5, 13, 17, 21, 15, 7, 0, 17, 17, 26]),
            ("fellow-ode", [0, 5, 7, 11, 6, 4, 0, 8, 8, 11]),
        ];
        rows.into_iter()
            .map(|(grinder, values)| {
                let row: BTreeMap<_, _> = SETTING_METHODS.into_iter().zip(values).collect();
                (grinder, row)
            })
            .collect()
    });

static METHOD_EXPLANATIONS: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("espresso", "High pressure extraction → requires fine grind for 25-30 second shot"),
        ("v60", "Cone shape → requires medium-fine grind for proper 2:30-3:30 flow rate"),
        ("chemex", "Thick paper filter → needs medium-coarse grind to prevent clogging"),
        ("french-press", "Full immersion → coarse grind prevents sediment in cup"),
        ("aeropress", "Pressure-assisted → medium grind balances speed and extraction"),
        ("moka-pot", "Steam pressure → fine grind similar to espresso but slightly coarser"),
        ("turkish", "Unfiltered → extra-fine grind creates traditional thick texture"),
        ("balance-siphon", "Vacuum brewing → medium grind for clean, tea-like cup"),
        ("syphon", "Vapor pressure → medium grind highlights delicate flavors"),
        ("cold-brew", "12-18 hour immersion → coarse grind prevents over-extraction"),
    ])
});

/// Fallback when a method has no dedicated explanation
pub const DEFAULT_METHOD_EXPLANATION: &str = "Standard brewing parameters for this method.";

pub const HOME_GRINDERS: &[&str] = &[
    "niche-zero",
    "fellow-opus",
    "baratza-sette-270",
    "df64-gen-2",
    "timemore-sculptor-064s",
    "df54",
    "eureka-mignon-specialita",
    "mahlkonig-x64-sd",
    "breville-smart-grinder-pro",
    "baratza-encore-esp",
    "baratza-virtuoso-plus",
    "baratza-vario",
    "oxo-brew-conical-burr",
    "wilfa-svart",
    "sage-breville-dose-control-pro",
    "baratza-encore",
    "cuisinart-dbm-8-supreme-grind",
    "krups-precision-burr",
    "shardor-conical-burr",
    "capresso-infinity",
    "1zpresso-k-ultra",
    "comandante-c40",
    "1zpresso-q-air",
    "timemore-c2",
    "javapresse-manual-burr",
    "hario-skerton-pro",
    "porlex-mini",
    "eureka-single-dose-pro",
    "varia-vs3",
    "hamilton-beach-fresh-grind",
    "aromaster-burr-grinder",
];

pub const CAFE_GRINDERS: &[&str] = &[
    "mazzer-mini",
    "mazzer-super-jolly",
    "mazzer-major",
    "mazzer-robur",
    "mazzer-kony",
    "eureka-atom-65",
    "eureka-atom-75",
    "eureka-atom-pro",
    "mythos-one",
    "mythos-two",
    "ditting-804",
    "ditting-807",
    "ditting-1203",
    "mahlkonig-ek43",
    "mahlkonig-ek43s",
    "mahlkonig-k30",
    "mahlkonig-e65s",
    "mahlkonig-e80s",
    "compak-e10",
    "compak-f8",
    "compak-r120",
    "anfim-scody",
    "anfim-sp-ii",
    "anfim-luna",
    "anfim-pratica",
    "ceado-e37s",
    "ceado-e37z",
    "ceado-e92",
    "ceado-e37sd",
    "victoria-arduino-mythos",
];

pub const CAFE_ESPRESSO_MACHINES: &[&str] = &[
    "la-marzocco-linea-pb",
    "la-marzocco-strada",
    "la-marzocco-gs3",
    "la-marzocco-linea-classic",
    "synesso-mvp-hydra",
    "synesso-es1",
    "slayer-steam",
    "slayer-single-group",
    "victoria-arduino-black-eagle",
    "victoria-arduino-white-eagle",
    "nuova-simonelli-aurelia",
    "nuova-simonelli-appia",
    "sanremo-cafe-racer",
    "sanremo-opera",
    "sanremo-f18",
    "rocket-r9",
    "rocket-r58",
    "kvdw-speedster",
    "kvdw-spirit",
    "wega-polaris",
    "wega-atlas",
    "rancilio-classe-11",
    "rancilio-classe-9",
    "ascaia-baby-t",
    "ascaia-steel-uno",
    "ascaia-steel-duo",
    "la-cimbali-m100",
    "la-cimbali-m39",
    "faema-e71",
    "faema-emblema",
];

/// Static recommendation for a brew method
pub fn recommendation(method: &str) -> Option<&'static BrewRecommendation> {
    RECOMMENDATIONS.get(method)
}

/// Base grind setting for a grinder + method, if catalogued
pub fn base_grind(grinder: &str, method: &str) -> Option<i32> {
    GRINDER_SETTINGS.get(grinder)?.get(method).copied()
}

/// All brew methods with a recommendation, sorted
pub fn methods() -> Vec<&'static str> {
    RECOMMENDATIONS.keys().copied().collect()
}

/// Grinders with catalogued base settings, sorted
pub fn calibrated_grinders() -> Vec<&'static str> {
    GRINDER_SETTINGS.keys().copied().collect()
}

pub fn method_explanation(method: &str) -> &'static str {
    METHOD_EXPLANATIONS
        .get(method)
        .copied()
        .unwrap_or(DEFAULT_METHOD_EXPLANATION)
}

pub fn grinders_for(user_type: UserType) -> &'static [&'static str] {
    match user_type {
        UserType::Home => HOME_GRINDERS,
        UserType::Cafe => CAFE_GRINDERS,
    }
}

/// Espresso machines offered to a user type; home users pick none
pub fn espresso_machines_for(user_type: UserType) -> &'static [&'static str] {
    match user_type {
        UserType::Home => &[],
        UserType::Cafe => CAFE_ESPRESSO_MACHINES,
    }
}

/// Parse a time descriptor into a base time in seconds
///
/// - contains `s` (`"25-30s"`): leading integer seconds
/// - contains `:` (`"2:30-3:30 min"`): first `m:ss` pair
/// - anything else (`"4-5 min"`, `"12-18 hr"`): no numeric base time
pub fn parse_time_seconds(descriptor: &str) -> Option<u32> {
    if descriptor.contains('s') {
        return leading_int(descriptor);
    }
    if let Some((minutes, rest)) = descriptor.split_once(':') {
        let minutes = leading_int(minutes)?;
        let seconds = leading_int(rest)?;
        return Some(minutes * 60 + seconds);
    }
    None
}

fn leading_int(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}
