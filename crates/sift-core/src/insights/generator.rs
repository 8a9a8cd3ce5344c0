//! Textual insights over monthly and per-category series
//!
//! Insights are built in a fixed order and the list stops once
//! [`MAX_INSIGHTS`] are collected:
//! 1. the month with the largest total
//! 2. the month-over-month change between the two latest months (>= 5%)
//! 3. a trailing streak of two or more strict moves in one direction
//! 4. categories whose second-half sum moved more than 20% against the first-half sum

use crate::models::{CategorySeries, MonthBucket};

/// Upper bound on the number of insights returned
pub const MAX_INSIGHTS: usize = 4;

/// Minimum month-over-month change worth mentioning, in percent
const MOM_THRESHOLD_PERCENT: f64 = 5.0;

/// Minimum half-window category change worth mentioning, in percent
const CATEGORY_THRESHOLD_PERCENT: f64 = 20.0;

/// Build up to four plain-text insights
///
/// `monthly` must be ordered oldest first (as returned by `monthly_trends`);
/// each category series is aligned to the same window.
pub fn generate_insights(monthly: &[MonthBucket], categories: &[CategorySeries]) -> Vec<String> {
    let mut insights = Vec::new();

    let candidates = [
        largest_month(monthly),
        month_over_month(monthly),
        trailing_streak(monthly),
    ];
    insights.extend(candidates.into_iter().flatten());

    for series in categories {
        if insights.len() >= MAX_INSIGHTS {
            break;
        }
        if let Some(line) = category_shift(series) {
            insights.push(line);
        }
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

fn largest_month(monthly: &[MonthBucket]) -> Option<String> {
    let mut best: Option<&MonthBucket> = None;
    for bucket in monthly {
        if best.map_or(true, |b| bucket.amount.abs() > b.amount.abs()) {
            best = Some(bucket);
        }
    }

    let best = best.filter(|b| b.amount.abs() > 0.0)?;
    Some(format!(
        "Highest spending was in {}: {:.2} across {} transactions",
        best.year_month().label(),
        best.amount.abs(),
        best.count
    ))
}

fn month_over_month(monthly: &[MonthBucket]) -> Option<String> {
    let [.., previous, current] = monthly else {
        return None;
    };
    if previous.amount == 0.0 {
        return None;
    }

    let change = (current.amount - previous.amount) / previous.amount.abs() * 100.0;
    if change.abs() < MOM_THRESHOLD_PERCENT {
        return None;
    }

    let direction = if change > 0.0 { "up" } else { "down" };
    Some(format!(
        "Spending is {} {:.1}% month over month ({:.2} in {} vs {:.2} in {})",
        direction,
        change.abs(),
        current.amount,
        current.year_month().label(),
        previous.amount,
        previous.year_month().label()
    ))
}

/// Streak of strict moves ending at the newest month
///
/// Only the run anchored at the last bucket counts; an earlier run that a
/// later move broke is not reported.
fn trailing_streak(monthly: &[MonthBucket]) -> Option<String> {
    let moves: Vec<std::cmp::Ordering> = monthly
        .windows(2)
        .map(|pair| pair[1].amount.total_cmp(&pair[0].amount))
        .collect();

    let last = *moves.last()?;
    if last == std::cmp::Ordering::Equal {
        return None;
    }

    let streak = moves.iter().rev().take_while(|m| **m == last).count();
    if streak < 2 {
        return None;
    }

    let verb = if last == std::cmp::Ordering::Greater {
        "risen"
    } else {
        "fallen"
    };
    Some(format!(
        "Spending has {} for {} months in a row",
        verb,
        streak + 1
    ))
}

/// Compare the sums of the two halves of a category series
///
/// The split is at `len / 2`, so with an odd window the second half holds the
/// extra month.
fn category_shift(series: &CategorySeries) -> Option<String> {
    let mid = series.amounts.len() / 2;
    if mid == 0 {
        return None;
    }

    let (first, second) = series.amounts.split_at(mid);
    let first_sum: f64 = first.iter().sum();
    let second_sum: f64 = second.iter().sum();
    if first_sum == 0.0 {
        return None;
    }

    let change = (second_sum - first_sum) / first_sum.abs() * 100.0;
    let direction = if change > CATEGORY_THRESHOLD_PERCENT {
        "up"
    } else if change < -CATEGORY_THRESHOLD_PERCENT {
        "down"
    } else {
        return None;
    };

    Some(format!(
        "{} spending is {} {:.0}% in the second half of the period",
        series.category,
        direction,
        change.abs()
    ))
}
