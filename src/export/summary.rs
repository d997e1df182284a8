use std::collections::BTreeMap;

use crate::classify::{Rejection, StructureType};
use crate::reconcile::ReconcileMethod;

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedObject {
    pub name: String,
    pub reason: Rejection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidObject {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedObject {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    pub name: String,
    pub distance: f32,
}

/// Everything a run decided, aggregated for the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    /// Objects that passed the inclusion filter.
    pub candidates: usize,
    pub exported: usize,
    /// Counts per placement method, including `invalid`.
    pub methods: BTreeMap<ReconcileMethod, usize>,
    /// Counts per type, over exported structures.
    pub types: BTreeMap<StructureType, usize>,
    pub rejected: Vec<RejectedObject>,
    pub invalid: Vec<InvalidObject>,
    pub failures: Vec<FailedObject>,
    pub discrepancies: Vec<Discrepancy>,
    pub needs_review: Vec<String>,
}

impl ExportSummary {
    pub fn record_rejection(&mut self, name: &str, reason: Rejection) {
        self.rejected.push(RejectedObject {
            name: name.to_string(),
            reason,
        });
    }

    pub fn record_method(&mut self, method: ReconcileMethod) {
        *self.methods.entry(method).or_default() += 1;
    }

    pub fn record_invalid(&mut self, name: &str, reason: impl Into<String>) {
        self.invalid.push(InvalidObject {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    pub fn record_failure(&mut self, name: &str, error: impl ToString) {
        self.failures.push(FailedObject {
            name: name.to_string(),
            error: error.to_string(),
        });
    }

    pub fn record_discrepancy(&mut self, name: &str, distance: f32) {
        self.discrepancies.push(Discrepancy {
            name: name.to_string(),
            distance,
        });
    }

    pub fn record_export(&mut self, structure_type: StructureType) {
        self.exported += 1;
        *self.types.entry(structure_type).or_default() += 1;
    }

    /// Rejection counts per reason.
    pub fn rejections_by_reason(&self) -> BTreeMap<Rejection, usize> {
        let mut counts = BTreeMap::new();
        for rejected in &self.rejected {
            *counts.entry(rejected.reason).or_default() += 1;
        }
        counts
    }

    pub fn log(&self) {
        log::info!(
            "Exported {} of {} candidate structures",
            self.exported,
            self.candidates
        );

        for (method, count) in &self.methods {
            log::info!("  {}: {}", method, count);
        }
        for (structure_type, count) in &self.types {
            log::info!("  {}: {}", structure_type, count);
        }
        for (reason, count) in self.rejections_by_reason() {
            log::debug!("Rejected {} objects: {}", count, reason);
        }

        for invalid in &self.invalid {
            log::warn!("Invalid placement for {}: {}", invalid.name, invalid.reason);
        }
        for failure in &self.failures {
            log::warn!("Failed to export {}: {}", failure.name, failure.error);
        }
        for discrepancy in &self.discrepancies {
            log::warn!(
                "Placement methods disagree for {} by {:.3}",
                discrepancy.name,
                discrepancy.distance
            );
        }
        if !self.needs_review.is_empty() {
            log::warn!(
                "{} structures need review: {}",
                self.needs_review.len(),
                self.needs_review.join(", ")
            );
        }
    }
}
