// src/device/plan.rs

use super::state::{Cadence, Due};
use crate::common::pdu::ReadRequest;
use heapless::{String, Vec};

/// Longest sensor label kept.
pub const LABEL_LEN: usize = 16;

/// One register block to collect and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRead {
    pub label: String<LABEL_LEN>,
    pub request: ReadRequest,
    pub cadence: Cadence,
}

impl SensorRead {
    /// Builds a read; labels longer than `LABEL_LEN` bytes are cut at a char boundary.
    pub fn new(label: &str, request: ReadRequest, cadence: Cadence) -> Self {
        let mut stored = String::new();
        for c in label.chars() {
            if stored.push(c).is_err() {
                break;
            }
        }
        SensorRead { label: stored, request, cadence }
    }
}

/// The fixed list of reads a device performs, up to `N` entries.
#[derive(Debug, Clone, Default)]
pub struct PollPlan<const N: usize> {
    reads: Vec<SensorRead, N>,
}

impl<const N: usize> PollPlan<N> {
    pub const fn new() -> Self {
        PollPlan { reads: Vec::new() }
    }

    /// Adds a read; hands it back if the plan is full.
    pub fn push(&mut self, read: SensorRead) -> Result<(), SensorRead> {
        self.reads.push(read)
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    pub fn reads(&self) -> &[SensorRead] {
        &self.reads
    }

    /// Reads whose cadence is part of `due`, in plan order.
    pub fn selected(&self, due: Due) -> impl Iterator<Item = &SensorRead> + '_ {
        self.reads.iter().filter(move |read| due.includes(read.cadence))
    }
}
