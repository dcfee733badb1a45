//! Run Reports

use measurement::Measurement;
use membership::Verdict;
use ring_buffer::BufferStats;
use sequencer::SequencerStats;
use serde::Serialize;
use tracing::info;

/// One verified measurement, delivered to the step callback during a
/// verification run.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// 1-based position in the verified stream
    pub step: u64,
    pub verdict: Verdict,
    pub measurement: Measurement,
    /// Surviving specification states after this step, sorted
    pub states: Vec<String>,
}

/// Verdict counters of a verification run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VerificationSummary {
    pub total_steps: u64,
    pub ok: u64,
    pub fail: u64,
    pub strict: bool,
}

impl VerificationSummary {
    /// The trace conforms iff no step failed.
    pub fn conforms(&self) -> bool {
        self.fail == 0
    }
}

/// Final report of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub readings_produced: u64,
    pub buffer: BufferStats,
    pub sequencer: SequencerStats,
    /// Present for verification runs only
    pub verification: Option<VerificationSummary>,
}

impl RunReport {
    /// Conformance of a verification run; `None` for plain trace runs.
    pub fn conforms(&self) -> Option<bool> {
        self.verification.map(|summary| summary.conforms())
    }

    /// Emit the report through the log sink.
    pub fn log(&self) {
        info!("report: {} readings produced", self.readings_produced);
        info!(
            "report: buffer capacity={} peak={} written={} read={} dropped={}",
            self.buffer.capacity,
            self.buffer.peak_size,
            self.buffer.total_written,
            self.buffer.total_read,
            self.buffer.total_dropped
        );
        info!(
            "report: sequencer {} inputs / {} outputs in {:?}",
            self.sequencer.inputs_processed, self.sequencer.outputs_produced, self.sequencer.elapsed
        );
        if let Some(summary) = &self.verification {
            info!(
                "report: verification steps={} ok={} fail={} mode={}",
                summary.total_steps,
                summary.ok,
                summary.fail,
                if summary.strict { "strict" } else { "relaxed" }
            );
            if summary.conforms() {
                info!("report: verdict CONFORMS");
            } else {
                info!("report: verdict VIOLATIONS ({} failures)", summary.fail);
            }
        }
    }
}
