//! Hint planning.
//!
//! A turn of `draw_time` seconds with `h` hints is cut into `h + 1`
//! equal intervals. Hint `k` (0-based) becomes due once the remaining
//! time drops to `interval * (h - k)`. The room arms one check per hint
//! at the matching elapsed offset and re-checks after every time
//! reduction.

/// The hint plan for one turn. Pure data, no clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintSchedule {
    draw_time: u32,
    /// Remaining-time marks, one per hint, descending.
    marks: Vec<u32>,
}

impl HintSchedule {
    pub fn plan(draw_time: u32, hints: u32) -> Self {
        let interval = draw_time / (hints + 1);
        let marks = (1..=hints).rev().map(|i| interval * i).collect();
        Self { draw_time, marks }
    }

    /// Seconds elapsed since turn start at which each hint check fires,
    /// ascending.
    pub fn offsets(&self) -> Vec<u32> {
        self.marks
            .iter()
            .map(|mark| self.draw_time.saturating_sub(*mark))
            .collect()
    }

    /// Remaining-time marks, descending.
    pub fn marks(&self) -> &[u32] {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Whether the next hint (after `hints_used` reveals) is due with
    /// `secs_left` seconds remaining.
    pub fn is_due(&self, hints_used: u32, secs_left: u32) -> bool {
        usize::try_from(hints_used)
            .ok()
            .and_then(|i| self.marks.get(i))
            .is_some_and(|mark| secs_left <= *mark)
    }
}

/// Shorthand for `HintSchedule::plan(draw_time, hints).offsets()`.
pub fn hint_offsets(draw_time: u32, hints: u32) -> Vec<u32> {
    HintSchedule::plan(draw_time, hints).offsets()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_settings_plan() {
        // 80 s, 2 hints: interval 26, checks at 28 s and 54 s elapsed.
        let plan = HintSchedule::plan(80, 2);
        assert_eq!(plan.marks(), &[52, 26]);
        assert_eq!(plan.offsets(), vec![28, 54]);
    }

    #[test]
    fn test_zero_hints_is_empty() {
        let plan = HintSchedule::plan(80, 0);
        assert!(plan.is_empty());
        assert!(!plan.is_due(0, 0));
    }

    #[test]
    fn test_is_due_walks_marks_in_order() {
        let plan = HintSchedule::plan(80, 2);
        assert!(!plan.is_due(0, 53));
        assert!(plan.is_due(0, 52));
        assert!(!plan.is_due(1, 30));
        assert!(plan.is_due(1, 26));
        assert!(!plan.is_due(2, 0));
    }

    #[test]
    fn test_hint_offsets_shorthand() {
        assert_eq!(hint_offsets(60, 3), vec![15, 30, 45]);
    }

    proptest! {
        #[test]
        fn offsets_are_ascending_and_within_turn(draw_time in 15u32..=240, hints in 0u32..=5) {
            let offsets = hint_offsets(draw_time, hints);
            prop_assert_eq!(offsets.len(), hints as usize);
            prop_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(offsets.iter().all(|o| *o > 0 && *o < draw_time));
        }
    }
}
