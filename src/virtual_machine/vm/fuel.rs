/// Number of categories tracked by [`StepProfile`].
const STEP_CATEGORY_COUNT: usize = 5;

/// Categories of executed instructions for profiling and budgeting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum StepCategory {
    /// HALT and the conditional jumps.
    Control = 0,
    /// CMP, ADD, SUB, XOR.
    Arithmetic = 1,
    /// The 8-bit and 32-bit move families.
    Move = 2,
    /// APTR pointer adjustment.
    Memory = 3,
    /// OUT.
    Output = 4,
}

impl StepCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StepCategory::Control => "Control",
            StepCategory::Arithmetic => "Arithmetic",
            StepCategory::Move => "Move",
            StepCategory::Memory => "Memory",
            StepCategory::Output => "Output",
        }
    }

    /// All categories in discriminant order.
    const ALL: [StepCategory; STEP_CATEGORY_COUNT] = [
        StepCategory::Control,
        StepCategory::Arithmetic,
        StepCategory::Move,
        StepCategory::Memory,
        StepCategory::Output,
    ];
}

/// Executed-step profile for a single run.
///
/// Tracks how many instructions of each category the program executed,
/// letting callers see where a long-running image spends its cycles. Backed
/// by a flat array indexed by [`StepCategory`] discriminant for branch-free
/// accumulation on the hot path.
#[derive(Clone, Debug, Default)]
pub struct StepProfile {
    counts: [u64; STEP_CATEGORY_COUNT],
}

impl StepProfile {
    /// Creates a new empty step profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `amount` executed steps in the given category.
    #[inline(always)]
    pub fn add(&mut self, category: StepCategory, amount: u64) {
        let slot = &mut self.counts[category as usize];
        *slot = slot.saturating_add(amount);
    }

    /// Returns the step count for one category.
    pub fn get(&self, category: StepCategory) -> u64 {
        self.counts[category as usize]
    }

    /// Returns the total executed steps across all categories.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, &v| acc.saturating_add(v))
    }

    /// Returns an iterator over all categories and their step counts.
    pub fn iter(&self) -> impl Iterator<Item = (StepCategory, u64)> {
        StepCategory::ALL.into_iter().zip(self.counts)
    }
}

/// Step allowance suggested for images from untrusted sources.
pub const DEFAULT_STEP_BUDGET: u64 = 10_000_000;
