use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Slot {
    pub start: String,
    pub end: String,
    pub available: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: String,
    pub slots: Vec<Slot>,
}

/// Source of bookable time windows for a service. The shipped implementation
/// is a placeholder; a real scheduling backend slots in behind this trait
/// without touching pricing or sequencing.
pub trait AvailabilityProvider: Send + Sync {
    fn availability(&self, service_slug: &str) -> Vec<DayAvailability>;
}

const START_HOUR: u32 = 17;
const END_HOUR: u32 = 22;

/// Evening slots for a forward-looking window, with 2-3 random slots marked
/// available per day. Stands in for a real calendar.
pub struct RandomAvailability {
    pub days: i64,
}

impl Default for RandomAvailability {
    fn default() -> Self {
        Self { days: 7 }
    }
}

impl AvailabilityProvider for RandomAvailability {
    fn availability(&self, _service_slug: &str) -> Vec<DayAvailability> {
        let today = Utc::now().date_naive();
        (0..self.days)
            .map(|offset| DayAvailability {
                date: (today + Duration::days(offset)).format("%Y-%m-%d").to_string(),
                slots: day_slots(),
            })
            .collect()
    }
}

fn day_slots() -> Vec<Slot> {
    let mut slots: Vec<Slot> = (START_HOUR..END_HOUR)
        .map(|hour| Slot {
            start: format!("{hour:02}:00"),
            end: format!("{:02}:00", hour + 1),
            available: false,
        })
        .collect();

    let mut rng = rand::thread_rng();
    let count = rng.gen_range(2..=3);
    for index in rand::seq::index::sample(&mut rng, slots.len(), count) {
        slots[index].available = true;
    }
    slots
}
