use std::time::Instant;

use crate::{foundation::error::AtrousResult, kernel::PyramidKernels, plan::scales::ScalePlan};

/// Two working buffers addressed by a parity bit.
///
/// The slot selected by `parity` holds the newest complete level; the other one is the next
/// write target.
pub(crate) struct PingPong<B> {
    slots: [B; 2],
    parity: usize,
}

impl<B> PingPong<B> {
    pub(crate) fn new(a: B, b: B) -> Self {
        Self {
            slots: [a, b],
            parity: 0,
        }
    }

    /// `(current, next)`: read the newest level while writing the other slot.
    pub(crate) fn split(&mut self) -> (&B, &mut B) {
        let [a, b] = &mut self.slots;
        if self.parity == 0 { (&*a, b) } else { (&*b, a) }
    }

    /// Make the slot just written the current one.
    pub(crate) fn flip(&mut self) {
        self.parity ^= 1;
    }

    /// Move the current slot out, dropping the other one.
    pub(crate) fn into_current(self) -> B {
        let [a, b] = self.slots;
        if self.parity == 0 { a } else { b }
    }
}

/// Decompose `input` into `plan.num_scales()` levels, then rebuild from the coarsest level down.
///
/// `input` is only read. The plan must have at least one scale.
pub(crate) fn run_pyramid<K: PyramidKernels>(
    kernels: &mut K,
    input: &K::Buffer,
    width: u32,
    height: u32,
    plan: &ScalePlan,
) -> AtrousResult<K::Buffer> {
    let n = plan.num_scales();
    let backend = kernels.backend();
    let mut arena = PingPong::new(kernels.alloc(width, height)?, kernels.alloc(width, height)?);
    let mut details: Vec<K::Buffer> = Vec::with_capacity(n);

    for (s, params) in plan.scales.iter().enumerate() {
        let started = Instant::now();
        let mut detail = kernels.alloc(width, height)?;
        if s == 0 {
            let (_, next) = arena.split();
            kernels.decompose(next, input, &mut detail, 0, params.sharpen)?;
        } else {
            let (fine, next) = arena.split();
            kernels.decompose(next, fine, &mut detail, s as u32, params.sharpen)?;
        }
        arena.flip();
        details.push(detail);
        tracing::debug!(
            scale = s,
            mult = 1u32 << s,
            backend = ?backend,
            elapsed_us = started.elapsed().as_micros() as u64,
            "decomposed"
        );
    }

    for (s, params) in plan.scales.iter().enumerate().rev() {
        let started = Instant::now();
        let Some(detail) = details.pop() else {
            break;
        };
        let (coarse, next) = arena.split();
        kernels.synthesize(next, coarse, &detail, params)?;
        arena.flip();
        drop(detail);
        tracing::debug!(
            scale = s,
            backend = ?backend,
            elapsed_us = started.elapsed().as_micros() as u64,
            "synthesized"
        );
    }

    Ok(arena.into_current())
}

#[cfg(test)]
#[path = "../../tests/unit/engine/pyramid.rs"]
mod tests;
