//! Spending reports and analytics
//!
//! Everything here is read-only. Trend reports share one month window: the
//! requested number of calendar months ending at the month of the newest
//! transaction in the database, so per-tag and per-card series line up with
//! the overall series.

use std::collections::{BTreeMap, HashMap};

use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection};
use tracing::debug;

use super::transactions::TX_COLUMNS;
use super::Database;
use crate::config::CardHolderProvider;
use crate::error::{Error, Result};
use crate::models::*;
use crate::periods::YearMonth;

/// Group transactions by effective category, largest absolute total first
pub(crate) fn group_by_category(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut groups: BTreeMap<&str, (f64, i64)> = BTreeMap::new();
    for tx in transactions {
        let category = tx.effective_category().unwrap_or(UNCATEGORIZED);
        let entry = groups.entry(category).or_insert((0.0, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let mut totals: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category: category.to_string(),
            total,
            count,
            average: total / count as f64,
        })
        .collect();

    // BTreeMap order is by name, and the sort is stable, so ties stay alphabetical
    totals.sort_by(|a, b| b.total.abs().total_cmp(&a.total.abs()));
    totals
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<()> {
    if from > to {
        return Err(Error::Validation(format!(
            "Invalid date range: {} is after {}",
            from, to
        )));
    }
    Ok(())
}

impl Database {
    /// Per-category totals over an inclusive date window
    pub fn category_breakdown(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CategoryTotal>> {
        validate_range(from, to)?;
        let conn = self.conn()?;
        let transactions = Self::transactions_between_with_conn(&conn, None, Some(from), Some(to))?;
        Ok(group_by_category(&transactions))
    }

    /// Totals for one calendar month, broken down by status, type and account
    pub fn monthly_summary(&self, year: i32, month: u32) -> Result<MonthlySummary> {
        let period = YearMonth::new(year, month)?;
        let (from, to) = (period.first_day(), period.last_day());
        let conn = self.conn()?;

        let (transaction_count, net, income, expenses): (i64, f64, f64, f64) = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(t.amount), 0.0),
                COALESCE(SUM(CASE WHEN t.amount > 0 THEN t.amount ELSE 0 END), 0.0),
                COALESCE(SUM(CASE WHEN t.amount < 0 THEN t.amount ELSE 0 END), 0.0)
            FROM transactions t
            WHERE t.date BETWEEN ?1 AND ?2
            "#,
            params![from.to_string(), to.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let by_status = Self::group_totals(&conn, "t.status", "", from, to)?;
        let by_type = Self::group_totals(&conn, "t.transaction_type", "", from, to)?;
        let by_account = Self::group_totals(
            &conn,
            "a.name",
            "JOIN accounts a ON a.id = t.account_id",
            from,
            to,
        )?;

        Ok(MonthlySummary {
            month: period,
            from,
            to,
            transaction_count,
            net,
            income,
            expenses,
            by_status,
            by_type,
            by_account,
        })
    }

    /// Helper: signed totals grouped by one key expression
    fn group_totals(
        conn: &Connection,
        key_expr: &str,
        join: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT {key} AS key, COALESCE(SUM(t.amount), 0.0), COUNT(*)
            FROM transactions t
            {join}
            WHERE t.date BETWEEN ?1 AND ?2
            GROUP BY key
            ORDER BY ABS(SUM(t.amount)) DESC, key
            "#,
            key = key_expr,
            join = join
        );

        let mut stmt = conn.prepare(&sql)?;
        let groups = stmt
            .query_map(params![from.to_string(), to.to_string()], |row| {
                Ok(GroupTotal {
                    key: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    /// The shared report window: `months` months ending at the newest data
    ///
    /// With no transactions at all the window ends at the current month.
    fn report_window(conn: &Connection, months: usize) -> Result<Vec<YearMonth>> {
        if months == 0 {
            return Err(Error::Validation(
                "Report window must cover at least one month".to_string(),
            ));
        }

        let anchor = match Self::latest_transaction_date_with_conn(conn)? {
            Some(date) => YearMonth::from_date(date),
            None => YearMonth::from_date(Local::now().date_naive()),
        };

        Ok(anchor.window_ending(months))
    }

    /// Monthly spending buckets, optionally restricted to a tag and/or a card
    ///
    /// Always returns exactly `months` buckets, oldest first. Months without
    /// matching transactions are zero-filled. Amounts are absolute values.
    pub fn monthly_trends(
        &self,
        months: usize,
        tag: Option<&str>,
        card_suffix: Option<&str>,
    ) -> Result<Vec<MonthBucket>> {
        let card_suffix = card_suffix.map(validate_card_suffix).transpose()?;
        let conn = self.conn()?;
        let window = Self::report_window(&conn, months)?;

        let (first, last) = match (window.first(), window.last()) {
            (Some(first), Some(last)) => (first.first_day(), last.last_day()),
            _ => return Ok(Vec::new()),
        };

        let mut join = String::new();
        let mut conditions = vec!["t.date BETWEEN ? AND ?"];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(first.to_string()), Box::new(last.to_string())];

        if let Some(tag_name) = tag {
            let tag = Self::require_tag_with_conn(&conn, tag_name)?;
            join.push_str("JOIN transaction_tags tt ON tt.transaction_id = t.id");
            conditions.push("tt.tag_id = ?");
            values.push(Box::new(tag.id));
        }
        if let Some(suffix) = card_suffix {
            conditions.push("t.card_suffix = ?");
            values.push(Box::new(suffix.to_string()));
        }

        let sql = format!(
            r#"
            SELECT strftime('%Y-%m', t.date) AS period,
                   COALESCE(SUM(ABS(t.amount)), 0.0),
                   COUNT(*)
            FROM transactions t
            {}
            WHERE {}
            GROUP BY period
            "#,
            join,
            conditions.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let found: HashMap<String, (f64, i64)> = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, (row.get(1)?, row.get(2)?)))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        let buckets = window
            .iter()
            .map(|ym| {
                let (amount, count) = found.get(&ym.to_string()).copied().unwrap_or((0.0, 0));
                MonthBucket {
                    year: ym.year,
                    month: ym.month,
                    amount,
                    count,
                }
            })
            .collect();

        debug!(months, tag = ?tag, card = ?card_suffix, "Computed monthly trends");
        Ok(buckets)
    }

    /// The `top_n` categories by absolute spend over the window, one aligned series each
    pub fn category_trends(&self, months: usize, top_n: usize) -> Result<CategoryTrends> {
        let conn = self.conn()?;
        let window = Self::report_window(&conn, months)?;

        let (first, last) = match (window.first(), window.last()) {
            (Some(first), Some(last)) => (first.first_day(), last.last_day()),
            _ => {
                return Ok(CategoryTrends {
                    months: window,
                    series: Vec::new(),
                })
            }
        };

        let position: HashMap<YearMonth, usize> =
            window.iter().enumerate().map(|(i, ym)| (*ym, i)).collect();
        let transactions = Self::transactions_between_with_conn(&conn, None, Some(first), Some(last))?;

        let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for tx in &transactions {
            let Some(&idx) = position.get(&YearMonth::from_date(tx.date)) else {
                continue;
            };
            let category = tx.effective_category().unwrap_or(UNCATEGORIZED);
            let amounts = by_category
                .entry(category)
                .or_insert_with(|| vec![0.0; window.len()]);
            amounts[idx] += tx.amount.abs();
        }

        let mut series: Vec<CategorySeries> = by_category
            .into_iter()
            .map(|(category, amounts)| CategorySeries {
                category: category.to_string(),
                amounts,
            })
            .collect();
        series.sort_by(|a, b| b.total().total_cmp(&a.total()));
        series.truncate(top_n);

        Ok(CategoryTrends {
            months: window,
            series,
        })
    }

    /// Spending share per card over the window, with holder names from `holders`
    ///
    /// Shares use absolute amounts so refunds do not distort them; they sum to
    /// 100 whenever any card has spending.
    pub fn card_holder_breakdown(
        &self,
        months: usize,
        holders: &dyn CardHolderProvider,
    ) -> Result<CardHolderBreakdown> {
        let conn = self.conn()?;
        let window = Self::report_window(&conn, months)?;

        let (first, last) = match (window.first(), window.last()) {
            (Some(first), Some(last)) => (first.first_day(), last.last_day()),
            _ => {
                return Ok(CardHolderBreakdown {
                    months: window,
                    total: 0.0,
                    cards: Vec::new(),
                })
            }
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT t.card_suffix, COALESCE(SUM(ABS(t.amount)), 0.0), COUNT(*)
            FROM transactions t
            WHERE t.card_suffix IS NOT NULL AND t.date BETWEEN ?1 AND ?2
            GROUP BY t.card_suffix
            ORDER BY SUM(ABS(t.amount)) DESC, t.card_suffix
            "#,
        )?;

        let rows = stmt
            .query_map(params![first.to_string(), last.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total: f64 = rows.iter().map(|(_, amount, _)| amount).sum();

        let cards = rows
            .into_iter()
            .map(|(card_suffix, amount, count)| CardHolderShare {
                holder: holders.holder_for(&card_suffix).map(String::from),
                percentage: if total > 0.0 {
                    amount / total * 100.0
                } else {
                    0.0
                },
                card_suffix,
                amount,
                count,
            })
            .collect();

        Ok(CardHolderBreakdown {
            months: window,
            total,
            cards,
        })
    }

    /// Total, per-category breakdown and transaction list for one tag
    pub fn spending_for_tag(
        &self,
        tag: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<TagSpending> {
        if let (Some(f), Some(t)) = (from, to) {
            validate_range(f, t)?;
        }

        let conn = self.conn()?;
        let resolved = Self::require_tag_with_conn(&conn, tag)?;

        let mut conditions = vec!["tt.tag_id = ?".to_string()];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(resolved.id)];
        if let Some(f) = from {
            conditions.push("t.date >= ?".to_string());
            values.push(Box::new(f.to_string()));
        }
        if let Some(t) = to {
            conditions.push("t.date <= ?".to_string());
            values.push(Box::new(t.to_string()));
        }

        let sql = format!(
            r#"
            SELECT {}
            FROM transactions t
            JOIN transaction_tags tt ON tt.transaction_id = t.id
            WHERE {}
            ORDER BY t.date, t.id
            "#,
            TX_COLUMNS,
            conditions.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let transactions = stmt
            .query_map(params_refs.as_slice(), |row| Self::row_to_transaction(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TagSpending {
            tag: resolved.name,
            from,
            to,
            total: transactions.iter().map(|tx| tx.amount).sum(),
            transaction_count: transactions.len() as i64,
            by_category: group_by_category(&transactions),
            transactions,
        })
    }
}
