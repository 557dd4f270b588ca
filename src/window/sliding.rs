//! The sliding feature window and its update arithmetic.

use std::ops::Range;
use tracing::{debug, trace};

use super::settings::WindowSettings;
use super::sources::{AudioSource, ErrorReporter, SliceExtractor, TracingReporter};
use super::FeatureError;

/// Whether the window has been populated yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// No update attempted yet; the next update recomputes every slice
    Uninitialized,
    /// At least one update has run; stale slices are refreshed incrementally
    Warm,
}

/// How one update moves and refreshes slices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Stride-grid step of the current time
    pub current_step: i64,
    /// Slices to compute from fresh audio
    pub slices_needed: usize,
    /// Slices carried over from the previous update
    pub slices_to_keep: usize,
    /// Offset each kept slice moves toward the front
    pub slices_to_drop: usize,
}

impl UpdatePlan {
    /// Work out how many slices are stale between two update times.
    ///
    /// A cold window always recomputes everything. Time running backwards is
    /// treated as no time passing. Step and time arithmetic saturates, so
    /// timestamps at the ends of the `i64` range pin to the range limits.
    pub fn compute(
        settings: &WindowSettings,
        first_run: bool,
        previous_time_ms: i64,
        current_time_ms: i64,
    ) -> Self {
        let slice_count = settings.slice_count as i64;
        let last_step = settings.step_for(previous_time_ms);
        let current_step = settings.step_for(current_time_ms);

        let slices_needed = if first_run {
            slice_count
        } else {
            current_step.saturating_sub(last_step)
        };
        let slices_needed = slices_needed.clamp(0, slice_count) as usize;

        let slices_to_keep = settings.slice_count - slices_needed;
        let slices_to_drop = settings.slice_count - slices_to_keep;

        Self {
            current_step,
            slices_needed,
            slices_to_keep,
            slices_to_drop,
        }
    }

    /// Slots that receive freshly extracted slices
    pub fn refreshed_slots(&self) -> Range<usize> {
        self.slices_to_keep..self.slices_to_keep + self.slices_needed
    }

    /// Step on the stride grid that `slot` represents after this update
    pub fn step_for_slot(&self, settings: &WindowSettings, slot: usize) -> i64 {
        self.current_step
            .saturating_sub(settings.slice_count as i64 - 1)
            .saturating_add(slot as i64)
    }

    /// Audio start time for `slot`.
    ///
    /// Steps before the start of the stream are pulled up to 0ms, so the
    /// oldest slices of a young stream all read the first slice of audio.
    pub fn slice_start_ms(&self, settings: &WindowSettings, slot: usize) -> i64 {
        self.step_for_slot(settings, slot)
            .saturating_mul(settings.stride_ms)
            .max(0)
    }
}

/// Rolling spectrogram over a caller-owned buffer.
///
/// Slot 0 holds the oldest slice and slot `slice_count - 1` the newest.
pub struct SlidingFeatureWindow<'a, R: ErrorReporter = TracingReporter> {
    settings: WindowSettings,
    /// Element count the caller declared for `data`
    feature_size: usize,
    data: &'a mut [i8],
    phase: WindowPhase,
    reporter: R,
}

impl<'a> SlidingFeatureWindow<'a, TracingReporter> {
    /// Create a cold window over `data`, zeroing it.
    ///
    /// `feature_size` must match `settings.element_count()`; this is checked
    /// on the first update.
    pub fn new(settings: WindowSettings, feature_size: usize, data: &'a mut [i8]) -> Self {
        Self::with_reporter(settings, feature_size, data, TracingReporter)
    }
}

impl<'a, R: ErrorReporter> SlidingFeatureWindow<'a, R> {
    pub fn with_reporter(
        settings: WindowSettings,
        feature_size: usize,
        data: &'a mut [i8],
        reporter: R,
    ) -> Self {
        data.fill(0);
        Self {
            settings,
            feature_size,
            data,
            phase: WindowPhase::Uninitialized,
            reporter,
        }
    }

    /// Bring the window up to date for `current_time_ms`.
    ///
    /// Returns how many slices were freshly computed. On error the buffer may
    /// be partially shifted or refreshed and should be rebuilt by the caller.
    pub fn update<S, X>(
        &mut self,
        source: &mut S,
        extractor: &mut X,
        previous_time_ms: i64,
        current_time_ms: i64,
    ) -> Result<usize, FeatureError>
    where
        S: AudioSource + ?Sized,
        X: SliceExtractor + ?Sized,
    {
        self.check_config()?;

        let first_run = self.phase == WindowPhase::Uninitialized;
        if first_run {
            if let Err(e) = extractor.reset() {
                return Err(self.fail(e));
            }
            self.phase = WindowPhase::Warm;
            debug!(
                "Populating cold window: {} slices of {} values",
                self.settings.slice_count, self.settings.slice_size
            );
        }

        let plan = UpdatePlan::compute(&self.settings, first_run, previous_time_ms, current_time_ms);
        trace!(
            "Window update {}ms -> {}ms: keep {}, refresh {}",
            previous_time_ms,
            current_time_ms,
            plan.slices_to_keep,
            plan.slices_needed
        );

        self.shift(&plan);
        self.refresh(&plan, source, extractor)?;

        Ok(plan.slices_needed)
    }

    fn check_config(&self) -> Result<(), FeatureError> {
        if let Err(e) = self.settings.validate() {
            return Err(self.fail(e));
        }

        let expected = self.settings.element_count();
        let requested = if self.feature_size != expected {
            self.feature_size
        } else {
            self.data.len()
        };
        if requested != expected {
            return Err(self.fail(FeatureError::ConfigMismatch {
                requested,
                expected,
            }));
        }
        Ok(())
    }

    /// Move kept slices toward the front.
    ///
    /// Ascending order only ever reads slots above the one being written, so
    /// no source slice is overwritten before it is copied.
    fn shift(&mut self, plan: &UpdatePlan) {
        let size = self.settings.slice_size;
        for dest in 0..plan.slices_to_keep {
            let src = dest + plan.slices_to_drop;
            self.data
                .copy_within(src * size..(src + 1) * size, dest * size);
        }
    }

    fn refresh<S, X>(
        &mut self,
        plan: &UpdatePlan,
        source: &mut S,
        extractor: &mut X,
    ) -> Result<(), FeatureError>
    where
        S: AudioSource + ?Sized,
        X: SliceExtractor + ?Sized,
    {
        let size = self.settings.slice_size;
        for slot in plan.refreshed_slots() {
            let start_ms = plan.slice_start_ms(&self.settings, slot);
            trace!(
                "Refreshing slot {} (step {}) from {}ms",
                slot,
                plan.step_for_slot(&self.settings, slot),
                start_ms
            );

            let samples = match source.fetch_samples(start_ms, self.settings.slice_duration_ms) {
                Ok(samples) => samples,
                Err(e) => return Err(self.fail(e)),
            };
            if samples.len() < self.settings.min_audio_samples {
                return Err(self.fail(FeatureError::InsufficientSamples {
                    got: samples.len(),
                    want: self.settings.min_audio_samples,
                }));
            }

            let slice = &mut self.data[slot * size..(slot + 1) * size];
            if let Err(e) = extractor.extract_slice(samples, slice) {
                return Err(self.fail(e));
            }
        }
        Ok(())
    }

    fn fail(&self, err: FeatureError) -> FeatureError {
        self.reporter.report(&err.to_string());
        err
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    pub fn is_warm(&self) -> bool {
        self.phase == WindowPhase::Warm
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    /// The whole window, oldest slice first
    pub fn data(&self) -> &[i8] {
        &self.data[..]
    }

    /// One slice by slot index
    pub fn slice(&self, slot: usize) -> Option<&[i8]> {
        let size = self.settings.slice_size;
        if slot >= self.settings.slice_count {
            return None;
        }
        self.data.get(slot * size..(slot + 1) * size)
    }
}
