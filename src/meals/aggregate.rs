//! Grouping meals into the requester's local calendar days.
//!
//! Every meal timestamp is stored as an absolute instant. Which day a meal
//! belongs to depends on the viewer's UTC offset: the date is always taken
//! after converting `eaten_at` to that offset, never from the UTC instant.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::Serialize;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use super::repo_types::{Meal, MealType};

/// Largest offset accepted from clients, in minutes (UTC±14:00).
pub const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Nutrients {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
}

impl Add for Nutrients {
    type Output = Nutrients;

    fn add(self, rhs: Nutrients) -> Nutrients {
        Nutrients {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
            fiber: self.fiber + rhs.fiber,
            sugar: self.sugar + rhs.sugar,
        }
    }
}

impl AddAssign for Nutrients {
    fn add_assign(&mut self, rhs: Nutrients) {
        *self = *self + rhs;
    }
}

impl Nutrients {
    pub fn divided_by(self, n: f64) -> Nutrients {
        Nutrients {
            calories: self.calories / n,
            protein: self.protein / n,
            carbs: self.carbs / n,
            fat: self.fat / n,
            fiber: self.fiber / n,
            sugar: self.sugar / n,
        }
    }

    /// Rounded to one decimal, for presentation.
    pub fn rounded(self) -> Nutrients {
        let r = |v: f64| (v * 10.0).round() / 10.0;
        Nutrients {
            calories: r(self.calories),
            protein: r(self.protein),
            carbs: r(self.carbs),
            fat: r(self.fat),
            fiber: r(self.fiber),
            sugar: r(self.sugar),
        }
    }
}

pub fn sum<'a>(meals: impl IntoIterator<Item = &'a Meal>) -> Nutrients {
    meals
        .into_iter()
        .fold(Nutrients::default(), |acc, m| acc + m.nutrients())
}

/// Converts a client offset in minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> Option<UtcOffset> {
    if !(-MAX_TZ_OFFSET_MINUTES..=MAX_TZ_OFFSET_MINUTES).contains(&minutes) {
        return None;
    }
    UtcOffset::from_whole_seconds(minutes * 60).ok()
}

pub fn local_date(at: OffsetDateTime, offset: UtcOffset) -> Date {
    at.to_offset(offset).date()
}

pub fn today(offset: UtcOffset) -> Date {
    local_date(OffsetDateTime::now_utc(), offset)
}

/// Half-open `[start, end)` instants covering local days `first..=last`.
///
/// `None` when either bound would leave the representable calendar once
/// shifted to UTC; a day of slack on each side covers any offset.
pub fn range_bounds(
    first: Date,
    last: Date,
    offset: UtcOffset,
) -> Option<(OffsetDateTime, OffsetDateTime)> {
    first.previous_day()?;
    let after = last.next_day()?;
    after.next_day()?;
    let start = first.midnight().assume_offset(offset);
    let end = after.midnight().assume_offset(offset);
    Some((start, end))
}

pub fn day_bounds(date: Date, offset: UtcOffset) -> Option<(OffsetDateTime, OffsetDateTime)> {
    range_bounds(date, date, offset)
}

/// First day of a `days`-long window ending on `last`.
pub fn window_start(last: Date, days: i64) -> Option<Date> {
    last.checked_sub(Duration::days(days.checked_sub(1)?))
}

#[derive(Debug, Clone)]
pub struct DayBucket {
    pub date: Date,
    pub totals: Nutrients,
    pub meals: Vec<Meal>,
}

/// Buckets meals by local date. Buckets come newest day first, meals inside
/// a bucket in chronological order.
pub fn group_by_local_day(meals: Vec<Meal>, offset: UtcOffset) -> Vec<DayBucket> {
    let mut days: BTreeMap<Date, Vec<Meal>> = BTreeMap::new();
    for meal in meals {
        days.entry(local_date(meal.eaten_at, offset)).or_default().push(meal);
    }

    days.into_iter()
        .rev()
        .map(|(date, mut meals)| {
            meals.sort_by_key(|m| m.eaten_at);
            DayBucket {
                date,
                totals: sum(&meals),
                meals,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayTotals {
    pub date: Date,
    pub totals: Nutrients,
    pub meal_count: usize,
}

/// One entry per local day of `first..=last` in ascending order, including
/// days with no meals.
pub fn daily_totals(meals: &[Meal], first: Date, last: Date, offset: UtcOffset) -> Vec<DayTotals> {
    let mut out = Vec::new();
    let mut day = first;
    while day <= last {
        out.push(DayTotals {
            date: day,
            totals: Nutrients::default(),
            meal_count: 0,
        });
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }

    for meal in meals {
        let date = local_date(meal.eaten_at, offset);
        if date < first || date > last {
            continue;
        }
        let idx = (date - first).whole_days() as usize;
        if let Some(slot) = out.get_mut(idx) {
            slot.totals += meal.nutrients();
            slot.meal_count += 1;
        }
    }
    out
}

/// Calories per meal type for a set of meals.
pub fn calories_by_type(meals: &[Meal]) -> BTreeMap<MealType, f64> {
    let mut out = BTreeMap::new();
    for meal in meals {
        *out.entry(meal.meal_type).or_insert(0.0) += meal.calories;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub days: usize,
    pub days_logged: usize,
    pub days_within_calorie_goal: usize,
    pub total: Nutrients,
    pub daily_average: Nutrients,
}

/// Averages are taken over every day of the period, logged or not.
pub fn period_stats(days: &[DayTotals], calorie_goal: f64) -> PeriodStats {
    let total = days.iter().fold(Nutrients::default(), |acc, d| acc + d.totals);
    let logged: Vec<&DayTotals> = days.iter().filter(|d| d.meal_count > 0).collect();
    let daily_average = if days.is_empty() {
        Nutrients::default()
    } else {
        total.divided_by(days.len() as f64)
    };
    PeriodStats {
        days: days.len(),
        days_logged: logged.len(),
        days_within_calorie_goal: logged
            .iter()
            .filter(|d| d.totals.calories <= calorie_goal)
            .count(),
        total,
        daily_average,
    }
}
