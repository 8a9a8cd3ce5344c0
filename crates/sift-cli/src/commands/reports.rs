//! Report command implementations

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};
use sift_core::config::CardHolderMap;
use sift_core::db::Database;
use sift_core::insights::{bar, sparkline, trend_indicator};
use sift_core::models::GroupTotal;
use sift_core::YearMonth;

use super::{format_amount, parse_date_arg, print_json, truncate};

/// Width of proportional bars in report tables
const BAR_WIDTH: usize = 20;

/// Resolve a period string to (from_date, to_date)
pub fn resolve_period(
    period: &str,
    custom_from: Option<&str>,
    custom_to: Option<&str>,
) -> Result<(NaiveDate, NaiveDate)> {
    // If custom dates provided, use those
    if let (Some(from), Some(to)) = (
        parse_date_arg("--from", custom_from)?,
        parse_date_arg("--to", custom_to)?,
    ) {
        return Ok((from, to));
    }

    let today = Local::now().date_naive();
    resolve_period_from(period, today)
}

/// Resolve a named period relative to `today`
pub fn resolve_period_from(period: &str, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let this_month = YearMonth::from_date(today);

    match period.to_lowercase().as_str() {
        "this-month" => Ok((this_month.first_day(), today)),
        "last-month" => {
            let last = this_month.pred();
            Ok((last.first_day(), last.last_day()))
        }
        "this-year" => {
            let january = YearMonth::new(today.year(), 1)?;
            Ok((january.first_day(), today))
        }
        "last-30-days" => Ok((today - Duration::days(30), today)),
        "last-90-days" => Ok((today - Duration::days(90), today)),
        "last-12-months" => {
            let window = this_month.window_ending(12);
            let first = window.first().copied().unwrap_or(this_month);
            Ok((first.first_day(), today))
        }
        _ => bail!(
            "Unknown period: {}. Available: this-month, last-month, this-year, last-30-days, last-90-days, last-12-months",
            period
        ),
    }
}

/// Parse a "YYYY-MM" month argument
pub fn parse_month_arg(value: &str) -> Result<YearMonth> {
    let (year, month) = value
        .trim()
        .split_once('-')
        .with_context(|| format!("Invalid month '{}' (use YYYY-MM)", value))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("Invalid year in '{}' (use YYYY-MM)", value))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("Invalid month in '{}' (use YYYY-MM)", value))?;
    Ok(YearMonth::new(year, month)?)
}

pub fn cmd_report_breakdown(db: &Database, from: NaiveDate, to: NaiveDate, json: bool) -> Result<()> {
    let breakdown = db.category_breakdown(from, to)?;

    if json {
        return print_json(&breakdown);
    }

    println!();
    println!("📊 Category Breakdown");
    println!("   Period: {} to {}", from, to);
    println!("   ─────────────────────────────────────────────────────────────");

    if breakdown.is_empty() {
        println!("   No transactions found in this period.");
        return Ok(());
    }

    let max = breakdown
        .iter()
        .map(|c| c.total.abs())
        .fold(0.0_f64, f64::max);
    let total: f64 = breakdown.iter().map(|c| c.total).sum();

    println!(
        "   {:22} │ {:>12} │ {:>5} │ {:>10} │ {}",
        "Category", "Total", "Count", "Average", ""
    );
    println!("   ───────────────────────┼──────────────┼───────┼────────────┼─────────────────────");
    for cat in &breakdown {
        println!(
            "   {:22} │ {:>12} │ {:>5} │ {:>10} │ {}",
            truncate(&cat.category, 22),
            format_amount(cat.total),
            cat.count,
            format_amount(cat.average),
            bar(cat.total, max, BAR_WIDTH)
        );
    }
    println!();
    println!("   Net: {}", format_amount(total));

    Ok(())
}

fn print_group(title: &str, groups: &[GroupTotal]) {
    if groups.is_empty() {
        return;
    }
    println!();
    println!("   {}", title);
    for group in groups {
        println!(
            "     {:22} │ {:>12} │ {:>5}",
            truncate(&group.key, 22),
            format_amount(group.total),
            group.count
        );
    }
}

pub fn cmd_report_monthly(db: &Database, month: Option<&str>, json: bool) -> Result<()> {
    let period = match month {
        Some(value) => parse_month_arg(value)?,
        None => {
            let anchor = db
                .latest_transaction_date()?
                .unwrap_or_else(|| Local::now().date_naive());
            YearMonth::from_date(anchor)
        }
    };

    let summary = db.monthly_summary(period.year, period.month)?;

    if json {
        return print_json(&summary);
    }

    println!();
    println!("📅 Monthly Summary: {}", period.label());
    println!("   Period: {} to {}", summary.from, summary.to);
    println!("   ─────────────────────────────────────────────────────────────");

    if summary.transaction_count == 0 {
        println!("   No transactions found in this month.");
        return Ok(());
    }

    println!("   Transactions: {}", summary.transaction_count);
    println!("   Income:       {:>12}", format_amount(summary.income));
    println!("   Expenses:     {:>12}", format_amount(summary.expenses));
    println!("   Net:          {:>12}", format_amount(summary.net));

    print_group("By status", &summary.by_status);
    print_group("By type", &summary.by_type);
    print_group("By account", &summary.by_account);

    Ok(())
}

pub fn cmd_report_trends(
    db: &Database,
    months: usize,
    tag: Option<&str>,
    card: Option<&str>,
    json: bool,
) -> Result<()> {
    let buckets = db.monthly_trends(months, tag, card)?;

    if json {
        return print_json(&buckets);
    }

    println!();
    let mut title = String::from("📈 Spending Trends");
    if let Some(tag) = tag {
        title.push_str(&format!(" (tag: {})", tag));
    }
    if let Some(card) = card {
        title.push_str(&format!(" (card: *{})", card.trim()));
    }
    println!("{}", title);
    println!("   ─────────────────────────────────────────────────────────────");

    let amounts: Vec<f64> = buckets.iter().map(|b| b.amount).collect();
    let max = amounts.iter().copied().fold(0.0_f64, f64::max);

    println!("   {:8} │ {:>12} │ {:>5} │ {:10} │ {}", "Month", "Amount", "Count", "Change", "");
    println!("   ─────────┼──────────────┼───────┼────────────┼─────────────────────");
    let mut previous: Option<f64> = None;
    for bucket in &buckets {
        let change = match previous {
            Some(prev) => trend_indicator(bucket.amount, prev).to_string(),
            None => String::new(),
        };
        println!(
            "   {:8} │ {:>12} │ {:>5} │ {:10} │ {}",
            bucket.year_month().to_string(),
            format_amount(bucket.amount),
            bucket.count,
            change,
            bar(bucket.amount, max, BAR_WIDTH)
        );
        previous = Some(bucket.amount);
    }

    println!();
    println!("   {}", sparkline(&amounts, amounts.len()));

    Ok(())
}

pub fn cmd_report_categories(db: &Database, months: usize, top: usize, json: bool) -> Result<()> {
    let trends = db.category_trends(months, top)?;

    if json {
        return print_json(&trends);
    }

    println!();
    println!(
        "🗂️  Top {} Categories over {} months",
        trends.series.len(),
        trends.months.len()
    );
    if let (Some(first), Some(last)) = (trends.months.first(), trends.months.last()) {
        println!("   Period: {} to {}", first, last);
    }
    println!("   ─────────────────────────────────────────────────────────────");

    if trends.series.is_empty() {
        println!("   No spending found in this window.");
        return Ok(());
    }

    println!("   {:22} │ {:>12} │ {:12} │ {}", "Category", "Total", "Trend", "Last month");
    println!("   ───────────────────────┼──────────────┼──────────────┼────────────");
    for series in &trends.series {
        let trend = match series.amounts.as_slice() {
            [.., prev, cur] => trend_indicator(*cur, *prev).to_string(),
            _ => String::new(),
        };
        println!(
            "   {:22} │ {:>12} │ {:12} │ {}",
            truncate(&series.category, 22),
            format_amount(series.total()),
            sparkline(&series.amounts, series.amounts.len()),
            trend
        );
    }

    Ok(())
}

pub fn cmd_report_cards(
    db: &Database,
    holders: &CardHolderMap,
    months: usize,
    json: bool,
) -> Result<()> {
    let breakdown = db.card_holder_breakdown(months, holders)?;

    if json {
        return print_json(&breakdown);
    }

    println!();
    println!("💳 Spending by Card");
    if let (Some(first), Some(last)) = (breakdown.months.first(), breakdown.months.last()) {
        println!("   Period: {} to {}", first, last);
    }
    println!("   ─────────────────────────────────────────────────────────────");

    if breakdown.cards.is_empty() {
        println!("   No card spending found in this window.");
        return Ok(());
    }

    println!(
        "   {:6} │ {:18} │ {:>12} │ {:>5} │ {:>6} │ {}",
        "Card", "Holder", "Amount", "Count", "%", ""
    );
    println!("   ───────┼────────────────────┼──────────────┼───────┼────────┼─────────────────────");
    for card in &breakdown.cards {
        println!(
            "   *{:5} │ {:18} │ {:>12} │ {:>5} │ {:>5.1}% │ {}",
            card.card_suffix,
            truncate(card.holder.as_deref().unwrap_or("-"), 18),
            format_amount(card.amount),
            card.count,
            card.percentage,
            bar(card.percentage, 100.0, BAR_WIDTH)
        );
    }
    println!();
    println!("   Total: {}", format_amount(breakdown.total));

    Ok(())
}

pub fn cmd_report_tag(
    db: &Database,
    tag: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let spending = db.spending_for_tag(tag, from, to)?;

    if json {
        return print_json(&spending);
    }

    println!();
    println!("🏷️  Spending for '{}'", spending.tag);
    match (from, to) {
        (Some(f), Some(t)) => println!("   Period: {} to {}", f, t),
        (Some(f), None) => println!("   Period: since {}", f),
        (None, Some(t)) => println!("   Period: until {}", t),
        (None, None) => println!("   Period: all time"),
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Total: {} ({} transactions)",
        format_amount(spending.total),
        spending.transaction_count
    );

    if !spending.by_category.is_empty() {
        println!();
        for cat in &spending.by_category {
            println!(
                "   {:22} │ {:>12} │ {:>5}",
                truncate(&cat.category, 22),
                format_amount(cat.total),
                cat.count
            );
        }
    }

    if !spending.transactions.is_empty() {
        println!();
        println!("   {:>6} │ {:10} │ {:30} │ {:>12}", "ID", "Date", "Description", "Amount");
        println!("   ───────┼────────────┼────────────────────────────────┼─────────────");
        for tx in &spending.transactions {
            println!(
                "   {:>6} │ {:10} │ {:30} │ {:>12}",
                tx.id,
                tx.date,
                truncate(&tx.description, 30),
                format_amount(tx.amount)
            );
        }
    }

    Ok(())
}
