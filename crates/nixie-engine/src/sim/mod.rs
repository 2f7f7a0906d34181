//! CPU mirror of the height-field kernels.
//!
//! Runs the exact disturb/diffuse update on plain memory so the wave
//! behavior can be tested without a GPU device. The engine never uses this
//! at runtime.

use crate::field::BufferIndex;

use std::f32::consts::PI;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Cell {
    pub height: f32,
    pub velocity: f32,
}

/// Double-buffered height field on the CPU.
pub struct CpuField {
    resolution: usize,
    buffers: [Vec<Cell>; 2],
    index: BufferIndex,
}

impl CpuField {
    pub fn new(resolution: usize) -> Self {
        let buffer = vec![Cell::default(); resolution * resolution];
        Self {
            resolution,
            buffers: [buffer.clone(), buffer],
            index: BufferIndex::new(),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// The buffer holding the latest frame.
    pub fn cells(&self) -> &[Cell] {
        &self.buffers[self.index.read()]
    }

    /// Raises a disturbance. `center` is in y-up device coordinates over
    /// the surface, `radius` in texture-coordinate units.
    pub fn disturb(&mut self, center: (f32, f32), radius: f32, strength: f32) {
        let center_uv = (center.0 * 0.5 + 0.5, -center.1 * 0.5 + 0.5);
        let res = self.resolution;
        for y in 0..res {
            for x in 0..res {
                let coord = (
                    (x as f32 + 0.5) / res as f32,
                    (y as f32 + 0.5) / res as f32,
                );
                let distance =
                    ((coord.0 - center_uv.0).powi(2) + (coord.1 - center_uv.1).powi(2)).sqrt();
                let mut drop = (1.0 - distance / radius).max(0.0);
                drop = 0.5 - (drop * PI).cos() * 0.5;

                let mut cell = self.buffers[self.index.read()][y * res + x];
                cell.height += drop * strength;
                self.buffers[self.index.write()][y * res + x] = cell;
            }
        }
        self.index.swap();
    }

    /// One damped wave step: neighbor average pulls the velocity, the
    /// velocity decays, then integrates into the height.
    pub fn update(&mut self) {
        let res = self.resolution;
        for y in 0..res {
            for x in 0..res {
                let average = (self.height_at(x.saturating_sub(1), y)
                    + self.height_at(x + 1, y)
                    + self.height_at(x, y.saturating_sub(1))
                    + self.height_at(x, y + 1))
                    * 0.25;

                let mut cell = self.buffers[self.index.read()][y * res + x];
                cell.velocity += (average - cell.height) * 2.0;
                cell.velocity *= 0.995;
                cell.height += cell.velocity;
                self.buffers[self.index.write()][y * res + x] = cell;
            }
        }
        self.index.swap();
    }

    /// Clamp-to-edge height lookup, matching the sampler address mode.
    fn height_at(&self, x: usize, y: usize) -> f32 {
        let x = x.min(self.resolution - 1);
        let y = y.min(self.resolution - 1);
        self.buffers[self.index.read()][y * self.resolution + x].height
    }

    pub fn mean_height(&self) -> f64 {
        let sum: f64 = self.cells().iter().map(|c| c.height as f64).sum();
        sum / self.cells().len() as f64
    }

    /// Squared deviation from the mean plus kinetic term.
    ///
    /// The field settles toward its conserved mean rather than zero (the
    /// clamped edges reflect instead of absorb), so decay is measured
    /// against the mean.
    pub fn deviation_energy(&self) -> f64 {
        let mean = self.mean_height();
        self.cells()
            .iter()
            .map(|c| (c.height as f64 - mean).powi(2) + (c.velocity as f64).powi(2))
            .sum()
    }

    pub fn peak_deviation(&self) -> f64 {
        let mean = self.mean_height();
        self.cells()
            .iter()
            .map(|c| (c.height as f64 - mean).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineFlags, FramePlan};

    fn disturbed_field() -> CpuField {
        let mut field = CpuField::new(64);
        field.disturb((0.0, 0.0), 0.3, 1.0);
        field
    }

    #[test]
    fn disturbance_peaks_at_center_and_stays_bounded() {
        let field = disturbed_field();
        let res = field.resolution();
        let center = field.cells()[(res / 2) * res + res / 2].height;
        assert!(center > 0.9, "center height {center}");

        for cell in field.cells() {
            assert!(cell.height >= 0.0 && cell.height <= 1.0 + 1e-6);
            assert_eq!(cell.velocity, 0.0);
        }

        // A corner well outside the radius stays untouched.
        assert_eq!(field.cells()[0].height, 0.0);
    }

    #[test]
    fn disturbances_accumulate() {
        let mut field = CpuField::new(64);
        field.disturb((0.0, 0.0), 0.3, 0.4);
        field.disturb((0.0, 0.0), 0.3, 0.4);
        let res = field.resolution();
        let center = field.cells()[(res / 2) * res + res / 2].height;
        assert!(center > 0.7, "center height {center}");
    }

    #[test]
    fn update_conserves_the_mean() {
        // Each cell is counted as a neighbor exactly four times (clamped
        // edges count themselves), so the mean survives every step.
        let mut field = disturbed_field();
        let before = field.mean_height();
        for _ in 0..100 {
            field.update();
        }
        let after = field.mean_height();
        assert!(
            (after - before).abs() < 1e-4,
            "mean drifted: {before} -> {after}"
        );
    }

    #[test]
    fn waves_decay_toward_the_mean() {
        // Reflections slosh energy between height and velocity, so decay
        // only shows over a long horizon, not step to step.
        let mut field = disturbed_field();
        let initial_energy = field.deviation_energy();
        let initial_peak = field.peak_deviation();
        assert!(initial_energy > 0.0);

        for _ in 0..500 {
            field.update();
        }

        assert!(
            field.deviation_energy() < initial_energy * 0.25,
            "deviation energy did not decay: {} vs {initial_energy}",
            field.deviation_energy()
        );
        assert!(
            field.peak_deviation() < initial_peak * 0.5,
            "peak deviation did not decay: {} vs {initial_peak}",
            field.peak_deviation()
        );
    }

    #[test]
    fn paused_frames_leave_the_field_bit_identical() {
        let mut flags = EngineFlags::new();
        flags.running = false;

        let mut field = disturbed_field();
        let before = field.cells().to_vec();
        for _ in 0..10 {
            let plan = FramePlan::for_state(&flags, false);
            assert!(plan.composite && !plan.diffuse);
            if plan.diffuse {
                field.update();
            }
        }
        assert_eq!(field.cells(), before.as_slice());
    }

    #[test]
    fn idle_flat_field_stays_flat() {
        // A paused-then-resumed engine must not self-excite.
        let mut field = CpuField::new(32);
        for _ in 0..10 {
            field.update();
        }
        assert_eq!(field.deviation_energy(), 0.0);
    }
}
