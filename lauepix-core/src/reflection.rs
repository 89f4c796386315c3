//! Reflection table and the shared selection.
//!
//! The registry is rebuilt wholesale from every result-bearing stage message.
//! Identifiers are assigned sequentially on each refresh, so they are only
//! meaningful against the table they came from.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder rendered for any field the backend did not provide.
pub const UNKNOWN: &str = "-";

/// Identifier tying a table row to its plot overlays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReflectionId(String);

impl ReflectionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<usize> for ReflectionId {
    fn from(value: usize) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for ReflectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ReflectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// The backend sends overlay ids either as strings or as bare integers.
impl<'de> Deserialize<'de> for ReflectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Int(u64),
            Signed(i64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Self(s),
            Repr::Int(n) => Self(n.to_string()),
            Repr::Signed(n) => Self(n.to_string()),
        })
    }
}

/// One observation record as sent by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReflection {
    #[serde(default)]
    pub panel_name: Option<String>,
    #[serde(default)]
    pub xyz_obs: Option<Vec<f64>>,
    #[serde(default)]
    pub xyz_cal: Option<Vec<f64>>,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub miller_idx: Option<Vec<i64>>,
    #[serde(default)]
    pub wavelength: Option<f64>,
    /// Time of flight in seconds.
    #[serde(default)]
    pub tof: Option<f64>,
}

/// Panel name to observations, in the order the backend listed the panels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReflectionTable {
    panels: Vec<(String, Vec<RawReflection>)>,
}

impl RawReflectionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a panel; order of calls is the refresh order.
    pub fn push_panel(&mut self, panel: impl Into<String>, records: Vec<RawReflection>) {
        self.panels.push((panel.into(), records));
    }

    /// Total number of records across all panels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.iter().map(|(_, records)| records.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn panels(&self) -> impl Iterator<Item = (&str, &[RawReflection])> {
        self.panels
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }
}

impl<'de> Deserialize<'de> for RawReflectionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = RawReflectionTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of panel name to reflection records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut table = RawReflectionTable::new();
                while let Some((panel, records)) = map.next_entry::<String, Vec<RawReflection>>()? {
                    table.push_panel(panel, records);
                }
                Ok(table)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(RawReflectionTable::new())
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// One row of the reflection table, formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub id: ReflectionId,
    pub panel: String,
    pub panel_name: String,
    pub miller_idx: String,
    pub xyz_obs: String,
    pub xyz_cal: String,
    pub wavelength: String,
    pub tof: String,
    /// Observed detector position as `(x, y)`, kept for plotting.
    pub observed: Option<(f64, f64)>,
    pub indexed: bool,
}

impl Reflection {
    fn from_raw(id: usize, panel: &str, raw: &RawReflection) -> Self {
        let indexed_only = |value: Option<String>| value.filter(|_| raw.indexed);

        Self {
            id: ReflectionId::from(id),
            panel: panel.to_string(),
            panel_name: raw.panel_name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            miller_idx: or_unknown(indexed_only(raw.miller_idx.as_deref().and_then(format_miller))),
            xyz_obs: or_unknown(raw.xyz_obs.as_deref().and_then(format_position)),
            xyz_cal: or_unknown(indexed_only(raw.xyz_cal.as_deref().and_then(format_position))),
            wavelength: or_unknown(raw.wavelength.map(|w| format_fixed(w, 3))),
            tof: or_unknown(raw.tof.map(|t| format_fixed(t * 1e6, 3))),
            observed: raw
                .xyz_obs
                .as_deref()
                .and_then(|p| Some((*p.get(1)?, *p.first()?))),
            indexed: raw.indexed,
        }
    }
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}

/// Format with `decimals` places, rounding exact ties away from zero.
fn format_fixed(value: f64, decimals: u8) -> String {
    let prec = usize::from(decimals);
    let text = format_tie(value, decimals).unwrap_or_else(|| format!("{value:.prec$}"));
    // "-0" and "-0.000" read as a real negative value
    if text.bytes().all(|b| matches!(b, b'-' | b'0' | b'.')) {
        text.trim_start_matches('-').to_string()
    } else {
        text
    }
}

/// `Some` only when `value` lies exactly halfway between two values with
/// `decimals` places.
///
/// Such a value is `m / 2^(decimals + 1)` for an odd integer `m`, so the check
/// and the rounding are both exact.
fn format_tie(value: f64, decimals: u8) -> Option<String> {
    let doubled = value * 2f64.powi(i32::from(decimals) + 1);
    if !doubled.is_finite() || doubled.fract() != 0.0 || doubled.abs() >= 2f64.powi(53) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let m = doubled as i64;
    if m % 2 == 0 {
        return None;
    }

    // value * 10^decimals = scaled / 2, with scaled odd
    let scaled = i128::from(m) * 5i128.checked_pow(u32::from(decimals))?;
    let units = (scaled + scaled.signum()) / 2;
    let prec = usize::from(decimals);
    let digits = format!("{:0>width$}", units.unsigned_abs(), width = prec + 1);
    let (whole, frac) = digits.split_at(digits.len() - prec);
    let sign = if units < 0 { "-" } else { "" };
    Some(if frac.is_empty() {
        format!("{sign}{whole}")
    } else {
        format!("{sign}{whole}.{frac}")
    })
}

/// Detector positions arrive as `[y, x, ...]` and display as `(x, y)`.
fn format_position(position: &[f64]) -> Option<String> {
    let y = position.first()?;
    let x = position.get(1)?;
    Some(format!("({}, {})", format_fixed(*x, 0), format_fixed(*y, 0)))
}

fn format_miller(idx: &[i64]) -> Option<String> {
    match idx {
        [h, k, l] => Some(format!("({h}, {k}, {l})")),
        _ => None,
    }
}

/// Owner of the current reflection rows and the shared selection.
#[derive(Debug, Default)]
pub struct ReflectionRegistry {
    reflections: Vec<Reflection>,
    selected: Option<ReflectionId>,
    revision: u64,
}

impl ReflectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every row from a raw table, panel first then record order.
    ///
    /// The selection is left untouched: a selected id that no longer exists
    /// simply highlights nothing.
    pub fn refresh(&mut self, table: &RawReflectionTable) {
        self.reflections = table
            .panels()
            .flat_map(|(panel, records)| records.iter().map(move |raw| (panel, raw)))
            .enumerate()
            .map(|(id, (panel, raw))| Reflection::from_raw(id, panel, raw))
            .collect();
        self.revision += 1;
        log::debug!("reflection table refreshed with {} rows", self.reflections.len());
    }

    #[must_use]
    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    #[must_use]
    pub fn get(&self, id: &ReflectionId) -> Option<&Reflection> {
        self.reflections.iter().find(|r| &r.id == id)
    }

    /// Table row of a reflection, used to scroll the table to the selection.
    #[must_use]
    pub fn row_of(&self, id: &ReflectionId) -> Option<usize> {
        self.reflections.iter().position(|r| &r.id == id)
    }

    pub fn select(&mut self, id: ReflectionId) {
        self.selected = Some(id);
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ReflectionId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn is_selected(&self, id: &ReflectionId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    /// Number of refreshes applied; bumps on every rebuild.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_obs(y: f64, x: f64) -> RawReflection {
        RawReflection {
            panel_name: Some("panel".into()),
            xyz_obs: Some(vec![y, x, 0.0]),
            ..RawReflection::default()
        }
    }

    #[test]
    fn test_ids_contiguous_in_panel_order() {
        let mut table = RawReflectionTable::new();
        table.push_panel("b", vec![raw_obs(1.0, 2.0), raw_obs(3.0, 4.0)]);
        table.push_panel("a", vec![raw_obs(5.0, 6.0)]);

        let mut registry = ReflectionRegistry::new();
        registry.refresh(&table);

        let rows = registry.reflections();
        assert_eq!(rows.len(), table.len());
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["0", "1", "2"]);
        let panels: Vec<&str> = rows.iter().map(|r| r.panel.as_str()).collect();
        assert_eq!(panels, ["b", "b", "a"]);
    }

    #[test]
    fn test_unindexed_fields_unknown() {
        let raw = RawReflection {
            xyz_cal: Some(vec![1.0, 2.0]),
            miller_idx: Some(vec![1, 2, 3]),
            indexed: false,
            ..RawReflection::default()
        };
        let row = Reflection::from_raw(0, "p", &raw);
        assert_eq!(row.miller_idx, UNKNOWN);
        assert_eq!(row.xyz_cal, UNKNOWN);
        assert_eq!(row.xyz_obs, UNKNOWN);
        assert_eq!(row.panel_name, UNKNOWN);
        assert_eq!(row.wavelength, UNKNOWN);
        assert_eq!(row.tof, UNKNOWN);
    }

    #[test]
    fn test_indexed_formatting() {
        let raw = RawReflection {
            panel_name: Some("panel0".into()),
            xyz_obs: Some(vec![10.5, 20.49]),
            xyz_cal: Some(vec![11.2, 19.7]),
            indexed: true,
            miller_idx: Some(vec![1, -2, 0]),
            wavelength: Some(1.234_56),
            tof: Some(0.012_345_678_9),
        };
        let row = Reflection::from_raw(7, "p", &raw);
        assert_eq!(row.id.as_str(), "7");
        assert_eq!(row.xyz_obs, "(20, 11)");
        assert_eq!(row.xyz_cal, "(20, 11)");
        assert_eq!(row.miller_idx, "(1, -2, 0)");
        assert_eq!(row.wavelength, "1.235");
        assert_eq!(row.tof, "12345.679");
        assert_eq!(row.observed, Some((20.49, 10.5)));
    }

    #[test]
    fn test_fixed_rounds_exact_ties_only() {
        assert_eq!(format_fixed(0.5, 0), "1");
        assert_eq!(format_fixed(-2.5, 0), "-3");
        assert_eq!(format_fixed(1.125, 2), "1.13");
        assert_eq!(format_fixed(-1.125, 2), "-1.13");
        // 1.0005 is stored just below the tie
        assert_eq!(format_fixed(1.0005, 3), "1.000");
        assert_eq!(format_fixed(2.0625, 3), "2.063");
        assert_eq!(format_fixed(-0.0001, 3), "0.000");
        assert_eq!(format_fixed(-0.4, 0), "0");
    }

    #[test]
    fn test_zero_is_not_unknown() {
        let raw = RawReflection {
            wavelength: Some(0.0),
            tof: Some(0.0),
            ..RawReflection::default()
        };
        let row = Reflection::from_raw(0, "p", &raw);
        assert_eq!(row.wavelength, "0.000");
        assert_eq!(row.tof, "0.000");
    }

    #[test]
    fn test_table_keeps_wire_order() {
        let table: RawReflectionTable = serde_json::from_str(
            r#"{"zeta": [{"panelName": "zeta"}], "alpha": [{}, {}]}"#,
        )
        .unwrap();
        let names: Vec<&str> = table.panels().map(|(name, _)| name).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_selection_survives_refresh() {
        let mut registry = ReflectionRegistry::new();
        registry.select(ReflectionId::from(5));
        registry.refresh(&RawReflectionTable::new());
        assert_eq!(registry.selected(), Some(&ReflectionId::from(5)));
        assert!(registry.get(&ReflectionId::from(5)).is_none());

        registry.clear();
        assert!(registry.selected().is_none());
    }

    #[test]
    fn test_numeric_ids_deserialize() {
        let id: ReflectionId = serde_json::from_str("12").unwrap();
        assert_eq!(id, ReflectionId::from("12"));
    }
}
