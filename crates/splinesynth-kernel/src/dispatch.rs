//! Batch dispatcher.
//!
//! [`launch`] maps every instance of a [`FlatBatch`] to one unit of parallel
//! work. Instances share nothing writable: each gets its own disjoint slice of
//! the output buffer (cut with `split_at_mut`) and its own [`ErrorRecord`], and
//! each rayon worker thread keeps one [`Scratch`] it reuses across the
//! instances it picks up.
//!
//! The call always returns, whatever the instances contain.

use std::ops::Range;

use rayon::prelude::*;
use splinesynth_spec::{
    ErrorRecord, ExecutionModel, FaultCode, FaultDetail, KernelConfig, Location, FN_OSCILLATOR,
    MAX_INSTANCES, MAX_PARTIALS,
};
use tracing::{debug, info, warn};

use crate::abi::{BatchOutput, FlatBatch, InstanceHeader};
use crate::fault::ErrorSlot;
use crate::oscillator::{synthesize, InstanceParams};
use crate::real::Real;
use crate::staging::{Scratch, StagingArea};

/// One instance's share of the launch.
struct Job<'a, R> {
    index: usize,
    record: &'a mut ErrorRecord,
    out: Option<&'a mut [R]>,
}

/// Runs every instance of `batch` and returns samples and per-instance faults.
pub fn launch<R: Real>(batch: &FlatBatch<R>, config: &KernelConfig) -> BatchOutput<R> {
    let n = batch.instances.len();
    let mut samples = vec![R::zero(); batch.output_len];
    let mut errors = vec![ErrorRecord::CLEAR; n];

    info!(
        instances = n,
        samples = batch.output_len,
        precision = R::PRECISION.as_str(),
        phase_mode = ?config.phase_mode,
        workers = config.execution.workers(),
        "launching batch"
    );

    if batch.function != FN_OSCILLATOR {
        warn!(function = batch.function, "undefined synthesis function");
        for record in &mut errors {
            *record = ErrorRecord::new(
                FaultCode::UndefinedFn,
                Location::Dispatch,
                FaultDetail::index(i64::from(batch.function)),
            );
        }
        return BatchOutput {
            samples,
            errors,
            regions: vec![None; n],
        };
    }

    let regions = assign_regions(batch, &mut errors);
    let outs = split_regions(&mut samples, &regions);
    let jobs: Vec<Job<'_, R>> = errors
        .iter_mut()
        .zip(outs)
        .enumerate()
        .map(|(index, (record, out))| Job { index, record, out })
        .collect();

    if config.parallel {
        jobs.into_par_iter()
            .for_each_init(Scratch::with_max_capacity, |scratch, job| {
                run_job(batch, config, scratch, job)
            });
    } else {
        let mut scratch = Scratch::new();
        for job in jobs {
            run_job(batch, config, &mut scratch, job);
        }
    }

    let failed = errors.iter().filter(|e| e.is_fault()).count();
    if failed > 0 {
        warn!(failed, instances = n, "instances reported faults");
        for (i, e) in errors.iter().enumerate().filter(|(_, e)| e.is_fault()) {
            debug!(
                instance = i,
                code = e.code,
                location = e.location,
                index = e.detail.index,
                "instance fault"
            );
        }
    } else {
        info!(instances = n, "batch complete");
    }

    BatchOutput {
        samples,
        errors,
        regions,
    }
}

/// Gives each instance its output region, refusing regions that fall outside
/// the buffer or overlap another instance's. Refused instances are faulted.
fn assign_regions<R: Real>(
    batch: &FlatBatch<R>,
    errors: &mut [ErrorRecord],
) -> Vec<Option<Range<usize>>> {
    let mut regions: Vec<Option<Range<usize>>> = Vec::with_capacity(errors.len());
    for (i, (header, record)) in batch.instances.iter().zip(errors.iter_mut()).enumerate() {
        let mut slot = ErrorSlot::new(record);
        if i >= MAX_INSTANCES {
            slot.report(FaultCode::IndexOutOfRange, Location::Dispatch, FaultDetail::index(i as i64));
            regions.push(None);
            continue;
        }
        match header.output_range() {
            Some(range) if range.end <= batch.output_len => regions.push(Some(range)),
            _ => {
                slot.report(
                    FaultCode::IndexOutOfRange,
                    Location::Dispatch,
                    FaultDetail::index(header.output_offset as i64),
                );
                regions.push(None);
            }
        }
    }

    // Sweep non-empty regions by start; any region starting before the furthest
    // end seen so far collides with the region that reached it.
    let mut order: Vec<usize> = (0..regions.len())
        .filter(|&i| regions[i].as_ref().is_some_and(|r| !r.is_empty()))
        .collect();
    order.sort_by_key(|&i| regions[i].as_ref().map_or(0, |r| r.start));

    let mut overlapping = Vec::new();
    let mut reach: Option<(usize, usize)> = None;
    for &i in &order {
        let Some(range) = regions[i].clone() else {
            continue;
        };
        match reach {
            Some((end, owner)) if range.start < end => {
                overlapping.push(owner);
                overlapping.push(i);
                if range.end > end {
                    reach = Some((range.end, i));
                }
            }
            _ => reach = Some((range.end, i)),
        }
    }

    for i in overlapping {
        if let Some(range) = regions[i].take() {
            ErrorSlot::new(&mut errors[i]).report(
                FaultCode::IndexOutOfRange,
                Location::Dispatch,
                FaultDetail::index(range.start as i64),
            );
        }
    }
    regions
}

/// Cuts `samples` into one mutable slice per assigned region.
///
/// Regions must be in bounds and pairwise disjoint, which
/// [`assign_regions`] guarantees.
fn split_regions<'a, R>(
    samples: &'a mut [R],
    regions: &[Option<Range<usize>>],
) -> Vec<Option<&'a mut [R]>> {
    let mut order: Vec<usize> = (0..regions.len()).filter(|&i| regions[i].is_some()).collect();
    order.sort_by_key(|&i| regions[i].as_ref().map_or(0, |r| r.start));

    let mut outs: Vec<Option<&'a mut [R]>> = (0..regions.len()).map(|_| None).collect();
    let mut rest = samples;
    let mut consumed = 0;
    for i in order {
        let Some(range) = regions[i].as_ref() else {
            continue;
        };
        if range.is_empty() {
            outs[i] = Some(Default::default());
            continue;
        }
        let tail = std::mem::take(&mut rest);
        let Some(skip) = range.start.checked_sub(consumed).filter(|&s| s <= tail.len()) else {
            rest = tail;
            continue;
        };
        let (_, tail) = tail.split_at_mut(skip);
        let len = range.len().min(tail.len());
        let (region, tail) = tail.split_at_mut(len);
        outs[i] = Some(region);
        rest = tail;
        consumed = range.start + len;
    }
    outs
}

/// Runs one instance: header checks, staging, then synthesis.
fn run_job<R: Real>(
    batch: &FlatBatch<R>,
    config: &KernelConfig,
    scratch: &mut Scratch<R>,
    job: Job<'_, R>,
) {
    let Job { index, record, out } = job;
    let Some(out) = out else {
        return;
    };
    let Some(header) = batch.instances.get(index) else {
        return;
    };
    let mut slot = ErrorSlot::new(record);
    if !check_header(header, &mut slot) {
        return;
    }

    let count = if header.n_partials > MAX_PARTIALS {
        slot.report(
            FaultCode::TooManyPartials,
            Location::Dispatch,
            FaultDetail::index(header.n_partials as i64),
        );
        MAX_PARTIALS
    } else {
        header.n_partials
    };
    let Some(partials) = header
        .first_partial
        .checked_add(count)
        .and_then(|end| batch.partials.get(header.first_partial..end))
    else {
        slot.report(
            FaultCode::IndexOutOfRange,
            Location::Dispatch,
            FaultDetail::index(header.first_partial as i64),
        );
        return;
    };

    let workers = config.execution.workers();
    let mut area = StagingArea::new(scratch, batch, partials, config.phase_mode, &mut slot);
    area.copy_cooperative(workers);
    let staged = area.seal(&mut slot);

    let params = InstanceParams {
        t0: header.t0,
        dt: header.dt,
    };
    let policy = config.extrapolation;

    match config.execution {
        ExecutionModel::Group { .. } if workers > 1 && out.len() > 1 => {
            let chunk = out.len().div_ceil(workers);
            let records: Vec<ErrorRecord> = out
                .par_chunks_mut(chunk)
                .enumerate()
                .map(|(w, part)| {
                    let mut local = ErrorRecord::CLEAR;
                    let mut worker_slot = ErrorSlot::new(&mut local);
                    synthesize(&staged, &params, header.j1 + w * chunk, part, &mut worker_slot, policy);
                    local
                })
                .collect();
            // Worker order is sample order, so the earliest fault wins as it
            // would with a single worker.
            for local in &records {
                slot.merge_from(local);
            }
        }
        _ => synthesize(&staged, &params, header.j1, out, &mut slot, policy),
    }
}

/// Rejects instances whose time base or sample range is unusable.
fn check_header<R: Real>(header: &InstanceHeader<R>, slot: &mut ErrorSlot<'_>) -> bool {
    if header.t0.is_nan() {
        slot.report(FaultCode::Nan, Location::Dispatch, FaultDetail::index(0));
        return false;
    }
    if !header.t0.is_finite() {
        slot.report(
            FaultCode::IllegalValue,
            Location::Dispatch,
            FaultDetail::at(0, header.t0.widen()),
        );
        return false;
    }
    if !(header.dt.is_finite() && header.dt > R::zero()) {
        slot.report(
            FaultCode::IllegalValue,
            Location::Dispatch,
            FaultDetail::at(0, header.dt.widen()),
        );
        return false;
    }
    if header.j2 < header.j1 {
        slot.report(
            FaultCode::IllegalValue,
            Location::Dispatch,
            FaultDetail::at(header.j2 as i64, header.j1 as f64),
        );
        return false;
    }
    true
}
