//! Stage timing of the pipeline, compiled in by the `profiling` feature.
//!
//! Each stage records its wall time and, when known, the number of records
//! and bytes it processed. The report shows the throughput of every stage.
//! Reports can be limited to some timings by listing their names in
//! `IMAGE_PREP_PROFILING_WHITELIST`, separated by commas.

use crate::common::*;
use std::time::Duration;
#[cfg(feature = "profiling")]
use std::time::Instant;

#[cfg(feature = "profiling")]
lazy_static! {
    static ref PROFILING_CONFIG: ProfilingConfig = ProfilingConfig::from_env();
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilingConfig {
    pub profiling_whitelist: Option<HashSet<String>>,
}

impl ProfilingConfig {
    #[cfg(feature = "profiling")]
    fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Load the config from `IMAGE_PREP_*` variables.
    #[cfg(feature = "profiling")]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("IMAGE_PREP_")
            .from_iter(vars)
            .unwrap_or_else(|err| {
                warn!("invalid profiling variables, report all timings: {}", err);
                Default::default()
            })
    }

    /// Whether reports of the timing `name` are shown.
    pub fn is_reported(&self, name: &str) -> bool {
        self.profiling_whitelist
            .as_ref()
            .map_or(true, |whitelist| whitelist.contains(name))
    }
}

/// The measurement of one pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageStats {
    pub stage: &'static str,
    pub elapsed: Duration,
    pub num_records: Option<usize>,
    pub num_bytes: Option<usize>,
}

impl StageStats {
    pub fn records_per_sec(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0)
            .then(|| self.num_records)
            .flatten()
            .map(|num| num as f64 / secs)
    }

    pub fn mib_per_sec(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0)
            .then(|| self.num_bytes)
            .flatten()
            .map(|num| num as f64 / (1024.0 * 1024.0) / secs)
    }

    /// A tab-separated report line.
    pub fn summary(&self) -> String {
        let mut line = format!("{}\t{:.3?}", self.stage, self.elapsed);
        if let Some(num) = self.num_records {
            line.push_str(&format!("\t{} records", num));
        }
        if let Some(rate) = self.records_per_sec() {
            line.push_str(&format!(" ({:.1} rec/s)", rate));
        }
        if let Some(num) = self.num_bytes {
            line.push_str(&format!("\t{} bytes", num));
        }
        if let Some(rate) = self.mib_per_sec() {
            line.push_str(&format!(" ({:.1} MiB/s)", rate));
        }
        line
    }
}

#[cfg(feature = "profiling")]
#[derive(Debug)]
pub struct Timing {
    name: &'static str,
    instant: Instant,
    stages: Vec<StageStats>,
}

#[cfg(not(feature = "profiling"))]
#[derive(Debug)]
pub struct Timing;

impl Timing {
    pub fn new(name: &'static str) -> Self {
        #[cfg(feature = "profiling")]
        {
            Self {
                name,
                instant: Instant::now(),
                stages: vec![],
            }
        }

        #[cfg(not(feature = "profiling"))]
        {
            let _ = name;
            Self
        }
    }

    /// Close a stage that started at the previous record.
    pub fn set_record(&mut self, stage: &'static str) {
        self.push(stage, None, None);
    }

    /// Close a stage and attach the volume it processed.
    pub fn set_volume_record(
        &mut self,
        stage: &'static str,
        num_records: usize,
        num_bytes: usize,
    ) {
        self.push(stage, Some(num_records), Some(num_bytes));
    }

    pub fn stages(&self) -> &[StageStats] {
        #[cfg(feature = "profiling")]
        {
            &self.stages
        }

        #[cfg(not(feature = "profiling"))]
        {
            &[]
        }
    }

    pub fn report(&self) {
        #[cfg(feature = "profiling")]
        self.report_with(&PROFILING_CONFIG);
    }

    /// Log the stages if the config allows this timing. Returns whether
    /// the report was shown.
    pub fn report_with(&self, config: &ProfilingConfig) -> bool {
        #[cfg(feature = "profiling")]
        {
            if !config.is_reported(self.name) {
                return false;
            }

            let total: Duration = self.stages.iter().map(|stats| stats.elapsed).sum();
            info!("profiling report for '{}', total {:.3?}", self.name, total);
            self.stages.iter().for_each(|stats| {
                info!("- {}", stats.summary());
            });
            true
        }

        #[cfg(not(feature = "profiling"))]
        {
            let _ = config;
            false
        }
    }

    fn push(
        &mut self,
        stage: &'static str,
        num_records: Option<usize>,
        num_bytes: Option<usize>,
    ) {
        #[cfg(feature = "profiling")]
        {
            self.stages.push(StageStats {
                stage,
                elapsed: self.instant.elapsed(),
                num_records,
                num_bytes,
            });
            self.instant = Instant::now();
        }

        #[cfg(not(feature = "profiling"))]
        {
            let _ = (stage, num_records, num_bytes);
        }
    }
}
