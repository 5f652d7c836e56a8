pub const POMODORO_WORK_MINUTES: i64 = 25; // Default Pomodoro work time
pub const SHORT_BREAK_MINUTES: i64 = 5; // Default short break time
pub const LONG_BREAK_MINUTES: i64 = 10; // Default long break time

/// Pomodoros completed before the break that follows becomes a long one.
pub const MAX_POMODORO_COUNTER: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl Stage {
    /// Name persisted in the store. Also the key of the duration bound to the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pomodoro => "pomodoro",
            Stage::ShortBreak => "shortBreak",
            Stage::LongBreak => "longBreak",
        }
    }

    pub fn parse(raw: &str) -> Option<Stage> {
        match raw {
            "pomodoro" => Some(Stage::Pomodoro),
            "shortBreak" => Some(Stage::ShortBreak),
            "longBreak" => Some(Stage::LongBreak),
            _ => None,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Stage::Pomodoro => "Pomodoro",
            Stage::ShortBreak => "Short break",
            Stage::LongBreak => "Long break",
        }
    }

    pub(crate) fn emoji(&self) -> &'static str {
        match self {
            Stage::Pomodoro => "🍅",
            Stage::ShortBreak => "☕",
            Stage::LongBreak => "🌴",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseState {
    pub stage: Stage,
    /// Pomodoro -> short break transitions since the last long break, in `0..=3`.
    pub pomodoro_counter: u8,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self {
            stage: Stage::Pomodoro,
            pomodoro_counter: 0,
        }
    }
}

/// Computes the phase that follows `current`.
///
/// The counter only moves on break -> pomodoro, and the fourth pomodoro is
/// followed by a long break that zeroes it. A fresh timer runs
/// `P0 S0 P1 S1 P2 S2 P3 L0`, after which `P1 S1 P2 S2 P3 L0` repeats.
///
/// Break -> pomodoro saturates at [`MAX_POMODORO_COUNTER`], so a counter that
/// is already out of range never grows past it.
pub fn next_phase(current: PhaseState) -> PhaseState {
    debug_assert!(current.pomodoro_counter <= MAX_POMODORO_COUNTER);
    match current.stage {
        Stage::Pomodoro if current.pomodoro_counter >= MAX_POMODORO_COUNTER => PhaseState {
            stage: Stage::LongBreak,
            pomodoro_counter: 0,
        },
        Stage::Pomodoro => PhaseState {
            stage: Stage::ShortBreak,
            pomodoro_counter: current.pomodoro_counter,
        },
        Stage::ShortBreak | Stage::LongBreak => PhaseState {
            stage: Stage::Pomodoro,
            pomodoro_counter: (current.pomodoro_counter + 1).min(MAX_POMODORO_COUNTER),
        },
    }
}

/// Phase lengths in seconds. Every field is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub pomodoro: i64,
    pub short_break: i64,
    pub long_break: i64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            pomodoro: POMODORO_WORK_MINUTES * 60,
            short_break: SHORT_BREAK_MINUTES * 60,
            long_break: LONG_BREAK_MINUTES * 60,
        }
    }
}

impl Durations {
    pub fn for_stage(&self, stage: Stage) -> i64 {
        match stage {
            Stage::Pomodoro => self.pomodoro,
            Stage::ShortBreak => self.short_break,
            Stage::LongBreak => self.long_break,
        }
    }

    /// Builds durations from a user-entered `"pomodoro short long"` line in minutes.
    ///
    /// Each missing, non-numeric or non-positive field falls back to its
    /// default minutes, never to the currently configured value.
    pub fn from_minutes_input(input: &str) -> Self {
        let mut fields = input.trim().split(' ');
        let mut next = |default_minutes: i64| {
            fields
                .next()
                .and_then(|field| field.trim().parse::<i64>().ok())
                .filter(|minutes| *minutes > 0)
                .and_then(|minutes| minutes.checked_mul(60))
                .unwrap_or(default_minutes * 60)
        };
        Self {
            pomodoro: next(POMODORO_WORK_MINUTES),
            short_break: next(SHORT_BREAK_MINUTES),
            long_break: next(LONG_BREAK_MINUTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(stage: Stage, pomodoro_counter: u8) -> PhaseState {
        PhaseState {
            stage,
            pomodoro_counter,
        }
    }

    #[test]
    fn test_pomodoro_before_fourth_goes_to_short_break() {
        for counter in 0..MAX_POMODORO_COUNTER {
            assert_eq!(
                next_phase(phase(Stage::Pomodoro, counter)),
                phase(Stage::ShortBreak, counter)
            );
        }
    }

    #[test]
    fn test_fourth_pomodoro_goes_to_long_break_and_resets_counter() {
        assert_eq!(
            next_phase(phase(Stage::Pomodoro, 3)),
            phase(Stage::LongBreak, 0)
        );
    }

    #[test]
    fn test_breaks_return_to_pomodoro_with_incremented_counter() {
        assert_eq!(
            next_phase(phase(Stage::ShortBreak, 0)),
            phase(Stage::Pomodoro, 1)
        );
        assert_eq!(
            next_phase(phase(Stage::ShortBreak, 2)),
            phase(Stage::Pomodoro, 3)
        );
        assert_eq!(
            next_phase(phase(Stage::LongBreak, 0)),
            phase(Stage::Pomodoro, 1)
        );
    }

    #[test]
    fn test_full_cycle_has_one_long_break() {
        let expected = [
            phase(Stage::ShortBreak, 0),
            phase(Stage::Pomodoro, 1),
            phase(Stage::ShortBreak, 1),
            phase(Stage::Pomodoro, 2),
            phase(Stage::ShortBreak, 2),
            phase(Stage::Pomodoro, 3),
            phase(Stage::LongBreak, 0),
            phase(Stage::Pomodoro, 1),
        ];
        let mut current = PhaseState::default();
        for want in expected {
            current = next_phase(current);
            assert_eq!(current, want);
        }

        // After the first long break the cycle is P1 S1 P2 S2 P3 L0.
        let start = current;
        let mut long_breaks = 0;
        for step in 1..=6 {
            current = next_phase(current);
            if current.stage == Stage::LongBreak {
                long_breaks += 1;
            }
            if step < 6 {
                assert_ne!(current, start);
            }
        }
        assert_eq!(current, start);
        assert_eq!(long_breaks, 1);
    }

    #[test]
    fn test_break_after_counter_at_max_saturates() {
        assert_eq!(
            next_phase(phase(Stage::ShortBreak, MAX_POMODORO_COUNTER)),
            phase(Stage::Pomodoro, MAX_POMODORO_COUNTER)
        );
    }

    #[test]
    fn test_stage_names_round_trip_through_store_keys() {
        for stage in [Stage::Pomodoro, Stage::ShortBreak, Stage::LongBreak] {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::parse("lunch"), None);
        assert_eq!(Stage::ShortBreak.as_str(), "shortBreak");
    }

    #[test]
    fn test_default_durations() {
        let durations = Durations::default();
        assert_eq!(durations.pomodoro, 1500);
        assert_eq!(durations.short_break, 300);
        assert_eq!(durations.long_break, 600);
        assert_eq!(durations.for_stage(Stage::LongBreak), 600);
    }

    #[test]
    fn test_minutes_input_missing_field_uses_default() {
        let durations = Durations::from_minutes_input("10 2 ");
        assert_eq!(durations.pomodoro, 600);
        assert_eq!(durations.short_break, 120);
        assert_eq!(durations.long_break, 600);
    }

    #[test]
    fn test_minutes_input_garbage_uses_defaults() {
        assert_eq!(Durations::from_minutes_input(""), Durations::default());
        let durations = Durations::from_minutes_input("abc -3 0");
        assert_eq!(durations, Durations::default());
        let durations = Durations::from_minutes_input("50 x 20");
        assert_eq!(durations.pomodoro, 3000);
        assert_eq!(durations.short_break, 300);
        assert_eq!(durations.long_break, 1200);
    }
}
