//! Insight command implementation

use anyhow::Result;
use serde::Serialize;
use sift_core::db::Database;
use sift_core::insights::sparkline;
use sift_core::models::MonthBucket;
use sift_core::generate_insights;

use super::{format_amount, print_json};

#[derive(Serialize)]
struct InsightsOutput<'a> {
    months: &'a [MonthBucket],
    insights: &'a [String],
}

pub fn cmd_insights(db: &Database, months: usize, top_categories: usize, json: bool) -> Result<()> {
    let monthly = db.monthly_trends(months, None, None)?;
    let categories = db.category_trends(months, top_categories)?;
    let insights = generate_insights(&monthly, &categories.series);

    if json {
        return print_json(&InsightsOutput {
            months: &monthly,
            insights: &insights,
        });
    }

    let amounts: Vec<f64> = monthly.iter().map(|b| b.amount).collect();
    let total: f64 = amounts.iter().sum();

    println!();
    println!("💡 Insights");
    if let (Some(first), Some(last)) = (monthly.first(), monthly.last()) {
        println!("   Period: {} to {}", first.year_month(), last.year_month());
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {}   {} over {} months",
        sparkline(&amounts, amounts.len()),
        format_amount(total),
        monthly.len()
    );
    println!();

    if insights.is_empty() {
        println!("   Nothing notable yet. Insights appear once there is spending to compare.");
        return Ok(());
    }

    for insight in &insights {
        println!("   • {}", insight);
    }

    Ok(())
}
