/// What kind of beat just landed, as reported by a single call to [`SimpleBeat::update`].
/// `SubsidiaryStrong` exists for oscillators with finer subdivision than this one models — a plain
/// [`SimpleBeat`] only ever returns `Strong` (beat zero of the bar) or `Weak` (every other beat).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BeatStatus {
    Rest,
    Strong,
    SubsidiaryStrong,
    Weak,
}

/// A single free-running beat oscillator: counts up in microseconds and wraps at
/// `meter_length_micros`, reporting which beat of the bar it just landed on. Four of these make up
/// a [`crate::metronome::Metronome`] — one pair free-running (for a metronome that ticks whether
/// or not the song is synced), one pair locked to song position.
#[derive(Clone, Debug)]
pub(crate) struct SimpleBeat {
    position_micros: i64,
    meter_length_micros: i64,
    defer_micros: i64,
    meter_id: i32,
    meter_amount: i32,
    first: bool,
    pending_init: bool,
}

impl Default for SimpleBeat {
    fn default() -> Self {
        Self {
            position_micros: 0,
            meter_length_micros: 0,
            defer_micros: 0,
            meter_id: 0,
            meter_amount: 0,
            first: true,
            pending_init: true,
        }
    }
}

impl SimpleBeat {
    pub(crate) fn init(&mut self, meter_amount: i32, meter_length_micros: i64, defer_micros: i64) {
        self.position_micros = -defer_micros;
        self.meter_length_micros = meter_length_micros;
        self.defer_micros = defer_micros;
        self.meter_id = 0;
        self.meter_amount = meter_amount;
        self.first = true;
        self.pending_init = false;
    }

    pub(crate) fn reset(&mut self) {
        self.position_micros = -self.defer_micros;
        self.meter_id = 0;
        self.first = true;
    }

    pub(crate) fn set(&mut self, meter_amount: i32, meter_length_micros: i64) {
        self.meter_length_micros = meter_length_micros;
        self.meter_amount = meter_amount;
    }

    pub(crate) fn set_at(&mut self, meter_amount: i32, meter_length_micros: i64, meter_id: i32, position_micros: i64) {
        self.meter_length_micros = meter_length_micros;
        self.meter_amount = meter_amount;
        self.meter_id = meter_id;
        self.position_micros = position_micros;
    }

    pub(crate) fn update(&mut self, delta_micros: i64) -> BeatStatus {
        if self.pending_init || delta_micros <= 0 {
            return BeatStatus::Rest;
        }

        self.position_micros += delta_micros;

        if self.position_micros < self.meter_length_micros && !self.first {
            return BeatStatus::Rest;
        }

        self.first = false;
        if self.meter_length_micros > 0 {
            self.position_micros %= self.meter_length_micros;
        }

        let was_downbeat = self.meter_id == 0;
        self.meter_id += 1;
        if self.meter_amount > 0 {
            self.meter_id %= self.meter_amount;
        }
        if was_downbeat {
            BeatStatus::Strong
        } else {
            BeatStatus::Weak
        }
    }

    pub(crate) fn progress(&self) -> f64 {
        if self.meter_length_micros == 0 {
            0.0
        } else {
            self.position_micros as f64 / self.meter_length_micros as f64
        }
    }

    pub(crate) fn position_micros(&self) -> i64 {
        self.position_micros
    }

    pub(crate) fn meter_id(&self) -> i32 {
        self.meter_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_always_fires_regardless_of_delta() {
        let mut beat = SimpleBeat::default();
        beat.init(4, 1_000_000, 0);
        assert_eq!(beat.update(1), BeatStatus::Strong);
    }

    #[test]
    fn cycles_strong_then_weak_through_a_bar() {
        let mut beat = SimpleBeat::default();
        beat.init(3, 1_000_000, 0);
        assert_eq!(beat.update(1), BeatStatus::Strong);
        assert_eq!(beat.update(1_000_000), BeatStatus::Weak);
        assert_eq!(beat.update(1_000_000), BeatStatus::Weak);
        assert_eq!(beat.update(1_000_000), BeatStatus::Strong);
    }

    #[test]
    fn sub_threshold_delta_rests() {
        let mut beat = SimpleBeat::default();
        beat.init(4, 1_000_000, 0);
        beat.update(1);
        assert_eq!(beat.update(10), BeatStatus::Rest);
    }
}
