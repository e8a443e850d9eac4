//! Cellular telemetry model.
//!
//! Technology-specific metrics are carried by [`RadioAccess`]: one variant per
//! radio technology, each holding only its own metric set. A cell can't hold
//! LTE and NR metrics at the same time, and its [`Technology`] is read off the
//! variant rather than stored next to it.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Milliseconds since the Unix epoch. Clock values before the epoch map to 0.
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn now_millis() -> u64 {
    epoch_millis(SystemTime::now())
}

/// Radio access technology of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technology {
    Lte,
    Nr,
    Unknown,
}

impl Technology {
    /// Wire name of the technology.
    pub fn as_str(self) -> &'static str {
        match self {
            Technology::Lte => "LTE",
            Technology::Nr => "NR",
            Technology::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal bars shown to a user, 0 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SignalBars(u8);

impl SignalBars {
    pub const MAX: u8 = 4;

    /// Clamp any level reported by a modem into 0..=4.
    pub fn saturating(level: u8) -> Self {
        Self(level.min(Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SignalBars {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            return Err(CodecError::BarsOutOfRange(value));
        }
        Ok(Self(value))
    }
}

impl From<SignalBars> for u8 {
    fn from(bars: SignalBars) -> Self {
        bars.0
    }
}

/// Technology-independent signal strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalLevel {
    /// Signal strength in dBm.
    pub dbm: i32,
    /// Arbitrary strength unit.
    pub asu: i32,
    pub bars: SignalBars,
}

/// LTE metrics and channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LteRadio {
    /// Reference Signal Received Power, dBm.
    pub rsrp: Option<i32>,
    /// Reference Signal Received Quality, dB.
    pub rsrq: Option<i32>,
    /// Reference signal signal-to-noise ratio, dB.
    pub rssnr: Option<i32>,
    pub earfcn: Option<u32>,
}

/// 5G NR metrics and channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NrRadio {
    pub ss_rsrp: Option<i32>,
    pub ss_rsrq: Option<i32>,
    pub ss_sinr: Option<i32>,
    pub csi_rsrp: Option<i32>,
    pub csi_rsrq: Option<i32>,
    pub nrarfcn: Option<u32>,
}

/// Technology-specific part of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "technology", rename_all = "UPPERCASE")]
pub enum RadioAccess {
    Lte(LteRadio),
    Nr(NrRadio),
    Unknown,
}

impl RadioAccess {
    pub fn technology(&self) -> Technology {
        match self {
            RadioAccess::Lte(_) => Technology::Lte,
            RadioAccess::Nr(_) => Technology::Nr,
            RadioAccess::Unknown => Technology::Unknown,
        }
    }
}

/// Identity of a cell. Every part may be unknown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellIdentity {
    /// Mobile country code.
    pub mcc: Option<String>,
    /// Mobile network code.
    pub mnc: Option<String>,
    pub cell_id: Option<u64>,
    /// Physical cell id.
    pub pci: Option<u16>,
    /// Tracking area code.
    pub tac: Option<u32>,
}

impl CellIdentity {
    /// Split an operator PLMN code such as `"25001"` into MCC `"250"` and
    /// MNC `"01"`. Parts missing from a short code stay `None`.
    pub fn from_plmn(code: &str) -> Self {
        let code = code.trim();
        let (mcc, mnc) = match (code.get(..3), code.get(3..)) {
            (Some(mcc), Some(mnc)) => (Some(mcc), Some(mnc)),
            _ => (None, None),
        };
        Self {
            mcc: mcc.map(str::to_string),
            mnc: mnc.filter(|m| !m.is_empty()).map(str::to_string),
            ..Self::default()
        }
    }
}

/// Radio-access summary, independent of individual cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    pub operator_name: String,
    pub network_type: String,
    pub roaming: bool,
    pub signal_level: String,
}

impl NetworkState {
    /// What a source reports when it is not allowed to read the radio.
    pub fn unavailable() -> Self {
        Self {
            operator_name: "Permission required".to_string(),
            network_type: "Unknown".to_string(),
            roaming: false,
            signal_level: "No access".to_string(),
        }
    }

    /// `"<operator> - <network type>"`, as shown next to the cell count.
    pub fn label(&self) -> String {
        format!("{} - {}", self.operator_name, self.network_type)
    }
}

/// One cell as seen at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellMeasurement {
    registered: bool,
    level: SignalLevel,
    radio: RadioAccess,
    identity: CellIdentity,
    captured_at: u64,
}

impl CellMeasurement {
    /// Build a measurement stamped with the current time.
    pub fn new(
        registered: bool,
        level: SignalLevel,
        radio: RadioAccess,
        identity: CellIdentity,
    ) -> Self {
        Self::captured_at(now_millis(), registered, level, radio, identity)
    }

    /// Build a measurement with an explicit capture time (epoch ms).
    pub fn captured_at(
        captured_at: u64,
        registered: bool,
        level: SignalLevel,
        radio: RadioAccess,
        identity: CellIdentity,
    ) -> Self {
        Self {
            registered,
            level,
            radio,
            identity,
            captured_at,
        }
    }

    pub fn technology(&self) -> Technology {
        self.radio.technology()
    }

    /// Whether the device is registered on (serving from) this cell.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn level(&self) -> &SignalLevel {
        &self.level
    }

    pub fn radio(&self) -> &RadioAccess {
        &self.radio
    }

    pub fn identity(&self) -> &CellIdentity {
        &self.identity
    }

    pub fn capture_time(&self) -> u64 {
        self.captured_at
    }
}

/// Everything sent in one exchange cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    timestamp: u64,
    network: NetworkState,
    cells: Vec<CellMeasurement>,
}

impl TelemetrySnapshot {
    /// Assemble a snapshot stamped with the current time.
    pub fn new(network: NetworkState, cells: Vec<CellMeasurement>) -> Self {
        Self::at(now_millis(), network, cells)
    }

    /// Assemble a snapshot with an explicit timestamp (epoch ms).
    pub fn at(timestamp: u64, network: NetworkState, cells: Vec<CellMeasurement>) -> Self {
        Self {
            timestamp,
            network,
            cells,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn network(&self) -> &NetworkState {
        &self.network
    }

    pub fn cells(&self) -> &[CellMeasurement] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn technology_follows_radio_variant() {
        let level = SignalLevel {
            dbm: -95,
            asu: 45,
            bars: SignalBars::saturating(3),
        };
        let lte = CellMeasurement::new(
            true,
            level,
            RadioAccess::Lte(LteRadio::default()),
            CellIdentity::default(),
        );
        let nr = CellMeasurement::new(
            false,
            level,
            RadioAccess::Nr(NrRadio::default()),
            CellIdentity::default(),
        );

        assert_eq!(lte.technology(), Technology::Lte);
        assert_eq!(nr.technology(), Technology::Nr);
        assert_eq!(RadioAccess::Unknown.technology(), Technology::Unknown);
        assert!(lte.capture_time() > 0);
    }

    #[test]
    fn signal_bars_bounds() {
        assert_eq!(SignalBars::saturating(9).get(), 4);
        assert!(SignalBars::try_from(4).is_ok());
        assert!(matches!(
            SignalBars::try_from(5),
            Err(CodecError::BarsOutOfRange(5))
        ));

        let err = serde_json::from_str::<SignalLevel>(r#"{"dbm":-90,"asu":20,"bars":7}"#);
        assert!(err.is_err());
    }

    #[test]
    fn plmn_split() {
        let id = CellIdentity::from_plmn("25001");
        assert_eq!(id.mcc.as_deref(), Some("250"));
        assert_eq!(id.mnc.as_deref(), Some("01"));

        let three_digit_mnc = CellIdentity::from_plmn("310410");
        assert_eq!(three_digit_mnc.mnc.as_deref(), Some("410"));

        let mcc_only = CellIdentity::from_plmn("250");
        assert_eq!(mcc_only.mcc.as_deref(), Some("250"));
        assert_eq!(mcc_only.mnc, None);

        assert_eq!(CellIdentity::from_plmn("25"), CellIdentity::default());
        assert_eq!(CellIdentity::from_plmn(""), CellIdentity::default());
    }

    #[test]
    fn radio_access_is_tagged_by_technology() {
        let radio: RadioAccess =
            serde_json::from_str(r#"{"technology":"NR","ssRsrp":-101,"nrarfcn":632628}"#).unwrap();
        assert_eq!(
            radio,
            RadioAccess::Nr(NrRadio {
                ss_rsrp: Some(-101),
                nrarfcn: Some(632_628),
                ..NrRadio::default()
            })
        );

        let unknown: RadioAccess = serde_json::from_str(r#"{"technology":"UNKNOWN"}"#).unwrap();
        assert_eq!(unknown, RadioAccess::Unknown);
    }

    #[test]
    fn network_label_and_degraded_state() {
        let state = NetworkState {
            operator_name: "MTS".to_string(),
            network_type: "4G".to_string(),
            roaming: false,
            signal_level: "LTE Signal".to_string(),
        };
        assert_eq!(state.label(), "MTS - 4G");
        assert_eq!(
            NetworkState::unavailable().label(),
            "Permission required - Unknown"
        );
    }

    #[test]
    fn epoch_millis_before_epoch_is_zero() {
        let before = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(epoch_millis(before), 0);
        assert_eq!(epoch_millis(UNIX_EPOCH + Duration::from_millis(1500)), 1500);
    }
}
