//! Benchmark results and their human-readable rendering.

use std::fmt;
use std::time::Duration;

use alloy_primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::chain::{Confirmation, InitGas};
use crate::config::VerdictAxis;
use crate::target::TargetSummary;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Cold,
    Warm,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cold => "cold",
            Self::Warm => "warm",
        })
    }
}

/// One init-gas sample taken in a known cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheMeasurement {
    pub phase: Phase,
    pub init_gas: u64,
    pub init_if_cached_gas: u64,
    #[serde(rename = "latency_ms", serialize_with = "duration_ms")]
    pub latency: Duration,
}

impl CacheMeasurement {
    pub fn new(phase: Phase, gas: InitGas, latency: Duration) -> Self {
        Self {
            phase,
            init_gas: gas.gas,
            init_if_cached_gas: gas.gas_when_cached,
            latency,
        }
    }
}

/// What happened to a cache-mutating step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Confirmed {
        tx_hash: TxHash,
        block_number: Option<u64>,
        gas_used: u64,
    },
    /// The transaction failed but the cache was already in the wanted state.
    Skipped { reason: String },
}

impl From<Confirmation> for StepOutcome {
    fn from(receipt: Confirmation) -> Self {
        Self::Confirmed {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed {
                tx_hash,
                block_number: Some(block),
                gas_used,
            } => write!(f, "confirmed {tx_hash} in block {block} ({gas_used} gas)"),
            Self::Confirmed {
                tx_hash, gas_used, ..
            } => write!(f, "confirmed {tx_hash} ({gas_used} gas)"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Saves,
    NoDifference,
    Anomalous,
}

impl Classification {
    pub fn from_delta(delta: i128) -> Self {
        match delta {
            d if d > 0 => Self::Saves,
            0 => Self::NoDifference,
            _ => Self::Anomalous,
        }
    }

    pub fn gas_label(self) -> &'static str {
        match self {
            Self::Saves => "cache saves gas",
            Self::NoDifference => "no difference",
            Self::Anomalous => "anomalous — warm costs more",
        }
    }

    pub fn latency_label(self) -> &'static str {
        match self {
            Self::Saves => "cache saves latency",
            Self::NoDifference => "no difference",
            Self::Anomalous => "anomalous — warm is slower",
        }
    }
}

/// Per-axis classification plus the headline picked by the configured axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub axis: VerdictAxis,
    pub gas: Classification,
    pub latency: Classification,
    pub overall: Classification,
}

impl Verdict {
    pub fn new(axis: VerdictAxis, gas: Classification, latency: Classification) -> Self {
        let overall = match axis {
            VerdictAxis::Gas => gas,
            VerdictAxis::Latency => latency,
            VerdictAxis::Both => {
                if gas == Classification::Anomalous || latency == Classification::Anomalous {
                    Classification::Anomalous
                } else if gas == Classification::Saves || latency == Classification::Saves {
                    Classification::Saves
                } else {
                    Classification::NoDifference
                }
            }
        };
        Self {
            axis,
            gas,
            latency,
            overall,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.axis {
            VerdictAxis::Gas => self.overall.gas_label(),
            VerdictAxis::Latency => self.overall.latency_label(),
            VerdictAxis::Both => match self.overall {
                Classification::Saves => "cache is beneficial",
                Classification::NoDifference => "no difference",
                Classification::Anomalous => "anomalous",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub tool_version: String,
    pub timestamp_utc: DateTime<Utc>,
    pub chain_id: Option<u64>,
    pub rpc_endpoint: String,
}

impl RunMeta {
    pub fn new(rpc_endpoint: &str, chain_id: Option<u64>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp_utc: Utc::now(),
            chain_id,
            rpc_endpoint: rpc_endpoint.to_string(),
        }
    }
}

/// Outcome of a completed cold/warm run.
///
/// Always holds exactly one cold and one warm measurement, in that order.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub run: RunMeta,
    pub target: TargetSummary,
    pub eviction: StepOutcome,
    pub caching: StepOutcome,
    measurements: [CacheMeasurement; 2],
    /// Warm init gas minus warm if-cached gas.
    pub gas_delta: i128,
    #[serde(rename = "latency_delta_ms", serialize_with = "nanos_ms")]
    pub latency_delta_ns: i128,
    pub latency_improvement: Option<f64>,
    pub verdict: Verdict,
}

impl BenchmarkReport {
    pub fn new(
        run: RunMeta,
        target: TargetSummary,
        eviction: StepOutcome,
        caching: StepOutcome,
        cold: (InitGas, Duration),
        warm: (InitGas, Duration),
        axis: VerdictAxis,
    ) -> Self {
        let cold = CacheMeasurement::new(Phase::Cold, cold.0, cold.1);
        let warm = CacheMeasurement::new(Phase::Warm, warm.0, warm.1);

        let gas_delta = i128::from(warm.init_gas) - i128::from(warm.init_if_cached_gas);
        let cold_ns = duration_nanos(cold.latency);
        let latency_delta_ns = cold_ns - duration_nanos(warm.latency);
        let latency_improvement = if cold_ns == 0 {
            None
        } else {
            Some(latency_delta_ns as f64 / cold_ns as f64)
        };

        let verdict = Verdict::new(
            axis,
            Classification::from_delta(gas_delta),
            Classification::from_delta(latency_delta_ns),
        );

        Self {
            run,
            target,
            eviction,
            caching,
            measurements: [cold, warm],
            gas_delta,
            latency_delta_ns,
            latency_improvement,
            verdict,
        }
    }

    pub fn measurements(&self) -> &[CacheMeasurement; 2] {
        &self.measurements
    }

    pub fn cold(&self) -> &CacheMeasurement {
        &self.measurements[0]
    }

    pub fn warm(&self) -> &CacheMeasurement {
        &self.measurements[1]
    }

    pub fn latency_delta_ms(&self) -> f64 {
        self.latency_delta_ns as f64 / 1e6
    }

    /// Latency improvement as a percentage, `None` when the cold latency was zero.
    pub fn latency_improvement_percent(&self) -> Option<f64> {
        self.latency_improvement.map(|ratio| ratio * 100.0)
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);

        writeln!(f, "Program Init Gas Analysis")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Contract: {}", self.target.address)?;
        writeln!(f, "Codehash: {}", self.target.codehash)?;
        writeln!(f, "Code size: {} bytes", self.target.code_size)?;
        if let Some(chain_id) = self.run.chain_id {
            writeln!(f, "Chain id: {chain_id}")?;
        }
        writeln!(f)?;
        writeln!(f, "Eviction: {}", self.eviction)?;
        writeln!(f, "Caching:  {}", self.caching)?;

        for m in &self.measurements {
            writeln!(f)?;
            writeln!(f, "{} call", m.phase.to_string().to_uppercase())?;
            writeln!(f, "  Program init gas:          {}", m.init_gas)?;
            writeln!(f, "  Program init gas (cached): {}", m.init_if_cached_gas)?;
            writeln!(f, "  Latency:                   {:.2} ms", millis(m.latency))?;
        }

        writeln!(f)?;
        writeln!(f, "ANALYSIS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Gas savings:         {}", self.gas_delta)?;
        writeln!(f, "Latency difference:  {:.2} ms", self.latency_delta_ms())?;
        match self.latency_improvement_percent() {
            Some(pct) => writeln!(f, "Latency improvement: {pct:.2}%")?,
            None => writeln!(f, "Latency improvement: N/A")?,
        }
        writeln!(f, "{rule}")?;
        writeln!(f, "Gas:     {}", self.verdict.gas.gas_label())?;
        writeln!(f, "Latency: {}", self.verdict.latency.latency_label())?;
        write!(f, "Verdict ({}): {}", self.verdict.axis, self.verdict.label())
    }
}

fn duration_nanos(d: Duration) -> i128 {
    i128::try_from(d.as_nanos()).unwrap_or(i128::MAX)
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1e6
}

fn duration_ms<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(millis(*d))
}

fn nanos_ms<S: Serializer>(ns: &i128, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(*ns as f64 / 1e6)
}
