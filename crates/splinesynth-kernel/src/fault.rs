//! Error reporting sink.
//!
//! Each instance owns exactly one [`ErrorRecord`]. Workers reach it only
//! through an [`ErrorSlot`], a mutable borrow of that single record, so a worker
//! cannot touch a sibling instance's slot. The first fault reported wins.

use splinesynth_spec::{ErrorRecord, FaultCode, FaultDetail, Location};

use crate::spline::SplineFault;

/// Write access to one instance's error record.
#[derive(Debug)]
pub struct ErrorSlot<'a> {
    record: &'a mut ErrorRecord,
}

impl<'a> ErrorSlot<'a> {
    /// Wraps an instance's record.
    pub fn new(record: &'a mut ErrorRecord) -> Self {
        Self { record }
    }

    /// Records a fault unless one is already present.
    ///
    /// Returns `true` if this report was stored.
    pub fn report(&mut self, code: FaultCode, location: Location, detail: FaultDetail) -> bool {
        if self.record.is_fault() {
            return false;
        }
        *self.record = ErrorRecord::new(code, location, detail);
        true
    }

    /// Records an evaluator fault seen at sample `j` of `partial`.
    ///
    /// The sample index replaces the evaluator's own index; the offending
    /// value is kept.
    pub fn report_spline(
        &mut self,
        fault: SplineFault,
        location: Location,
        partial: usize,
        j: usize,
    ) -> bool {
        let detail = FaultDetail::at(j as i64, fault.detail.value).for_partial(partial);
        self.report(fault.code, location, detail)
    }

    /// Folds in a record produced by another worker of the same instance.
    pub fn merge_from(&mut self, other: &ErrorRecord) -> bool {
        if !other.is_fault() || self.record.is_fault() {
            return false;
        }
        *self.record = *other;
        true
    }

    /// Returns true once a fault has been stored.
    pub fn is_set(&self) -> bool {
        self.record.is_fault()
    }

    /// The current record.
    pub fn record(&self) -> &ErrorRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_fault_wins() {
        let mut record = ErrorRecord::CLEAR;
        let mut slot = ErrorSlot::new(&mut record);
        assert!(!slot.is_set());
        assert!(slot.report(FaultCode::TooManyPartials, Location::Dispatch, FaultDetail::index(17)));
        assert!(!slot.report(FaultCode::Nan, Location::Oscillator, FaultDetail::index(3)));
        assert!(slot.is_set());

        assert_eq!(
            record,
            ErrorRecord::new(FaultCode::TooManyPartials, Location::Dispatch, FaultDetail::index(17))
        );
    }

    #[test]
    fn test_spline_fault_carries_sample_and_partial() {
        let mut record = ErrorRecord::CLEAR;
        let fault = SplineFault {
            code: FaultCode::IndexOutOfRange,
            detail: FaultDetail::at(4, 9.5),
        };
        ErrorSlot::new(&mut record).report_spline(fault, Location::AmplitudeSpline, 2, 120);

        assert_eq!(record.fault(), Some(FaultCode::IndexOutOfRange));
        assert_eq!(record.location, Location::AmplitudeSpline.tag());
        assert_eq!(record.detail.partial, Some(2));
        assert_eq!(record.detail.index, 120);
        assert_eq!(record.detail.value, 9.5);
    }

    #[test]
    fn test_merge_keeps_existing_fault() {
        let earlier = ErrorRecord::new(FaultCode::Nan, Location::PhaseSpline, FaultDetail::index(5));
        let later = ErrorRecord::new(FaultCode::IllegalValue, Location::Oscillator, FaultDetail::index(90));

        let mut record = ErrorRecord::CLEAR;
        let mut slot = ErrorSlot::new(&mut record);
        assert!(!slot.merge_from(&ErrorRecord::CLEAR));
        assert!(slot.merge_from(&earlier));
        assert!(!slot.merge_from(&later));
        assert_eq!(*slot.record(), earlier);
    }
}
