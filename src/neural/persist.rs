//! JSON save/load for [`FeedForward`] networks.
//!
//! The record keeps every field of the network, momentum buffers and context
//! window included, under the field names the Go libcmyk tool
//! writes, so networks trained there load here unchanged.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer, Serialize};

use super::{optimizer::NetworkConfig, FeedForward, BIAS_UNITS};
use crate::{matrix::Matrix2, prelude::*};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkRecord {
    n_inputs: usize,
    n_hiddens: usize,
    n_outputs: usize,
    regression: bool,
    input_activations: Vec<f64>,
    hidden_activations: Vec<f64>,
    output_activations: Vec<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    contexts: Vec<Vec<f64>>,
    input_weights: Vec<Vec<f64>>,
    output_weights: Vec<Vec<f64>>,
    input_changes: Vec<Vec<f64>>,
    output_changes: Vec<Vec<f64>>,
}

/// Older dumps store an unset context window as `null`.
fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<Vec<f64>>, D::Error> {
    Ok(Option::deserialize(d)?.unwrap_or_default())
}

fn check_len(name: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::CorruptState(format!(
            "{name} has {got} values, expected {expected}"
        )));
    }
    Ok(())
}

fn to_matrix(name: &str, rows: Vec<Vec<f64>>, dim: (usize, usize)) -> Result<Matrix2<f64>> {
    let m = Matrix2::from_vec(rows)
        .map_err(|_| Error::CorruptState(format!("{name} has rows of unequal length")))?;
    if m.dim() != dim {
        return Err(Error::CorruptState(format!(
            "{name} is {}x{}, expected {}x{}",
            m.rows(),
            m.cols(),
            dim.0,
            dim.1
        )));
    }
    Ok(m)
}

/// JSON has no NaN or infinity; serde_json would write them as `null`.
fn check_finite<'a, I: IntoIterator<Item = &'a f64>>(name: &str, values: I) -> Result<()> {
    match values.into_iter().find(|v| !v.is_finite()) {
        Some(v) => Err(Error::CorruptState(format!("non-finite value {v} in {name}"))),
        None => Ok(()),
    }
}

fn check_rows_finite(name: &str, rows: &[Vec<f64>]) -> Result<()> {
    check_finite(name, rows.iter().flatten())
}

impl TryFrom<&FeedForward> for NetworkRecord {
    type Error = Error;

    fn try_from(net: &FeedForward) -> Result<Self> {
        let record = Self {
            n_inputs: net.n_inputs,
            n_hiddens: net.n_hiddens,
            n_outputs: net.n_outputs,
            regression: net.regression,
            input_activations: net.input_activations.clone(),
            hidden_activations: net.hidden_activations.clone(),
            output_activations: net.output_activations.clone(),
            contexts: net.contexts.iter().cloned().collect(),
            input_weights: net.input_weights.to_vec(),
            output_weights: net.output_weights.to_vec(),
            input_changes: net.input_changes.to_vec(),
            output_changes: net.output_changes.to_vec(),
        };

        check_finite("InputActivations", &record.input_activations)?;
        check_finite("HiddenActivations", &record.hidden_activations)?;
        check_finite("OutputActivations", &record.output_activations)?;
        check_rows_finite("Contexts", &record.contexts)?;
        check_rows_finite("InputWeights", &record.input_weights)?;
        check_rows_finite("OutputWeights", &record.output_weights)?;
        check_rows_finite("InputChanges", &record.input_changes)?;
        check_rows_finite("OutputChanges", &record.output_changes)?;
        Ok(record)
    }
}

impl TryFrom<NetworkRecord> for FeedForward {
    type Error = Error;

    fn try_from(r: NetworkRecord) -> Result<Self> {
        if r.n_inputs < BIAS_UNITS || r.n_hiddens < BIAS_UNITS {
            return Err(Error::CorruptState(format!(
                "layer sizes {}/{} leave no room for the bias unit",
                r.n_inputs, r.n_hiddens
            )));
        }

        check_len("InputActivations", r.input_activations.len(), r.n_inputs)?;
        check_len("HiddenActivations", r.hidden_activations.len(), r.n_hiddens)?;
        check_len("OutputActivations", r.output_activations.len(), r.n_outputs)?;
        for context in &r.contexts {
            check_len("Contexts", context.len(), r.n_hiddens)?;
        }

        let input_dim = (r.n_inputs, r.n_hiddens);
        let output_dim = (r.n_hiddens, r.n_outputs);

        Ok(Self {
            input_weights: to_matrix("InputWeights", r.input_weights, input_dim)?,
            output_weights: to_matrix("OutputWeights", r.output_weights, output_dim)?,
            input_changes: to_matrix("InputChanges", r.input_changes, input_dim)?,
            output_changes: to_matrix("OutputChanges", r.output_changes, output_dim)?,
            n_inputs: r.n_inputs,
            n_hiddens: r.n_hiddens,
            n_outputs: r.n_outputs,
            regression: r.regression,
            input_activations: r.input_activations,
            hidden_activations: r.hidden_activations,
            output_activations: r.output_activations,
            contexts: r.contexts.into(),
        })
    }
}

impl FeedForward {
    /// Serializes the network. Fails with [`Error::CorruptState`] if any
    /// value is NaN or infinite, since it could not be read back.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &NetworkRecord::try_from(self)?)
            .map_err(|e| Error::Io(e.into()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let record: NetworkRecord = serde_json::from_reader(reader).map_err(|e| {
            if e.is_io() {
                Error::Io(e.into())
            } else {
                Error::CorruptState(e.to_string())
            }
        })?;
        record.try_into()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&NetworkRecord::try_from(self)?)
            .map_err(|e| Error::CorruptState(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    /// Writes the network to `path`, creating parent directories as needed.
    ///
    /// The record goes to a sibling `.tmp` file first and is renamed into
    /// place, so a failed dump leaves any previous network at `path` intact.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let written = File::create(&tmp).map_err(Error::from).and_then(|file| {
            let mut writer = BufWriter::new(file);
            self.to_writer(&mut writer)?;
            writer.flush()?;
            Ok(())
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Restores a network written by [`FeedForward::dump`].
    ///
    /// A missing file is reported as [`Error::NotFound`] so callers can fall
    /// back to a fresh network.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Loads the network at `path`, or builds a fresh one from `config` when
    /// nothing has been saved there yet. The flag is `true` when restored.
    pub fn load_or_init<P: AsRef<Path>>(path: P, config: &NetworkConfig) -> Result<(Self, bool)> {
        match Self::load(path) {
            Ok(net) => Ok((net, true)),
            Err(Error::NotFound(_)) => Ok((config.build()?, false)),
            Err(e) => Err(e),
        }
    }
}
