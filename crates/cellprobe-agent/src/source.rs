use std::path::{Path, PathBuf};

use cellprobe_codec::{CellIdentity, CellMeasurement, NetworkState, RadioAccess, SignalLevel};
use serde::Deserialize;

use crate::error::DataSourceError;

/// Where the agent gets its radio data from.
///
/// Implementations talk to whatever the platform offers. A source that is
/// not allowed to read the radio should still answer: with
/// [`NetworkState::unavailable`] and no cells, rather than an error.
pub trait TelemetrySource: Send + Sync {
    fn network_state(&self) -> Result<NetworkState, DataSourceError>;

    fn cell_measurements(&self) -> Result<Vec<CellMeasurement>, DataSourceError>;
}

/// Serves the same network state and cells on every call.
#[derive(Debug, Clone)]
pub struct StaticSource {
    network: NetworkState,
    cells: Vec<CellMeasurement>,
}

impl StaticSource {
    pub fn new(network: NetworkState, cells: Vec<CellMeasurement>) -> Self {
        Self { network, cells }
    }

    /// A source without access to the radio.
    pub fn unavailable() -> Self {
        Self::new(NetworkState::unavailable(), Vec::new())
    }
}

impl TelemetrySource for StaticSource {
    fn network_state(&self) -> Result<NetworkState, DataSourceError> {
        Ok(self.network.clone())
    }

    fn cell_measurements(&self) -> Result<Vec<CellMeasurement>, DataSourceError> {
        Ok(self.cells.clone())
    }
}

#[derive(Debug, thiserror::Error)]
enum FixtureError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid fixture {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default = "NetworkState::unavailable")]
    network: NetworkState,
    #[serde(default)]
    cells: Vec<FixtureCell>,
}

#[derive(Debug, Deserialize)]
struct FixtureCell {
    #[serde(default)]
    registered: bool,
    level: SignalLevel,
    radio: RadioAccess,
    #[serde(default)]
    identity: CellIdentity,
}

/// Reads network state and cells from a JSON file on every call.
///
/// ```json
/// {
///   "network": {"operatorName": "MTS", "networkType": "4G", "roaming": false, "signalLevel": "LTE Signal"},
///   "cells": [
///     {
///       "registered": true,
///       "level": {"dbm": -95, "asu": 45, "bars": 3},
///       "radio": {"technology": "LTE", "rsrp": -95, "rsrq": -10, "earfcn": 1300},
///       "identity": {"mcc": "250", "mnc": "01", "pci": 120, "tac": 7701}
///     }
///   ]
/// }
/// ```
///
/// Cells are stamped with the time of the read. Editing the file while the
/// agent runs changes what the next cycle sends.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Fixture, DataSourceError> {
        let raw = std::fs::read(&self.path).map_err(|source| {
            DataSourceError::new(FixtureError::Read {
                path: self.path.clone(),
                source,
            })
        })?;
        serde_json::from_slice(&raw).map_err(|source| {
            DataSourceError::new(FixtureError::Parse {
                path: self.path.clone(),
                source,
            })
        })
    }
}

impl TelemetrySource for FileSource {
    fn network_state(&self) -> Result<NetworkState, DataSourceError> {
        Ok(self.load()?.network)
    }

    fn cell_measurements(&self) -> Result<Vec<CellMeasurement>, DataSourceError> {
        Ok(self
            .load()?
            .cells
            .into_iter()
            .map(|cell| {
                CellMeasurement::new(cell.registered, cell.level, cell.radio, cell.identity)
            })
            .collect())
    }
}
