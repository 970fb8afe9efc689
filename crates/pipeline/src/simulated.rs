//! Stand-in provider for formats without a real parser.
//!
//! Emits a random number of placeholder units, pausing between each one to
//! approximate the cost of real extraction.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use smartrag_core::chunk::{ChunkConfig, ChunkUnit};
use smartrag_core::error::CoreError;
use smartrag_core::task::Task;

use crate::chunker::{ChunkProvider, UnitStream};

/// Bounds of the random unit count.
pub const SIMULATED_UNITS: RangeInclusive<usize> = 15..=30;

/// Units per simulated page.
const UNITS_PER_PAGE: usize = 5;

#[derive(Debug, Clone)]
pub struct SimulatedChunker {
    unit_delay: Duration,
    units: RangeInclusive<usize>,
}

impl SimulatedChunker {
    pub fn new(unit_delay: Duration) -> Self {
        Self {
            unit_delay,
            units: SIMULATED_UNITS,
        }
    }

    /// Fix the unit count range. Mostly useful in tests.
    pub fn with_units(mut self, units: RangeInclusive<usize>) -> Self {
        self.units = units;
        self
    }
}

#[async_trait]
impl ChunkProvider for SimulatedChunker {
    async fn open(&self, task: &Task) -> Result<Box<dyn UnitStream>, CoreError> {
        let config = ChunkConfig::from_value(&task.config)?;
        let total = rand::rng().random_range(self.units.clone());
        tracing::debug!(task_id = %task.id, total, "Simulating chunk extraction");
        Ok(Box::new(SimulatedUnits {
            config,
            total,
            next: 0,
            delay: self.unit_delay,
        }))
    }
}

struct SimulatedUnits {
    config: ChunkConfig,
    total: usize,
    next: usize,
    delay: Duration,
}

#[async_trait]
impl UnitStream for SimulatedUnits {
    fn total_units(&self) -> Option<usize> {
        Some(self.total)
    }

    async fn next_unit(&mut self) -> Result<Option<ChunkUnit>, CoreError> {
        if self.next >= self.total {
            return Ok(None);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let i = self.next;
        self.next += 1;
        let content = format!(
            "This is chunk {} of the document. It carries key information, split with the {} method under a {} character limit.",
            i + 1,
            self.config.chunk_method,
            self.config.chunk_size,
        );
        let metadata = json!({
            "page": i / UNITS_PER_PAGE + 1,
            "type": "paragraph",
            "tokens": rand::rng().random_range(30..=80),
            "method": self.config.chunk_method,
        });
        Ok(Some(ChunkUnit::from_text(i, content, metadata)))
    }
}
