//! Financial plan: generation, normalization, CSV rendering.

use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value};

use crate::llm::{ChatClient, ChatRequest};
use crate::models::ProjectWithTree;
use crate::plan::coerce_object;

use super::facts::ProjectFacts;
use super::table::{parse_money, rows_from_any};
use crate::csvio;

/// A financial plan document assembled from generated content plus defaults.
#[derive(Debug, Clone)]
pub struct FinancialPlan {
    pub summary: String,
    pub stages: Vec<Vec<String>>,
    pub expenses: Vec<Vec<String>>,
    pub cashflow: Vec<Vec<String>>,
    pub tolerance: Vec<Vec<String>>,
    pub governance: String,
}

/// Ask the generation service for a financial plan object. None on any
/// failure; assembly fills defaults either way.
pub async fn generate_financial_plan(
    client: &dyn ChatClient,
    desc: &str,
) -> Option<Map<String, Value>> {
    let system = format!(
        "You are a senior financial planner following the PRINCE2 methodology. \
         Based on the project description below, create a detailed Financial Plan JSON.\n\
         <desc>{desc}</desc>\n\n\
         Generate a JSON object with the exact keys: \"summary\", \"stages\", \"expenses\", \
         \"cashflow\", \"tolerance\", and \"governance\".\n\
         1. summary: a 2-3 sentence overview of the project's financial objectives, as a single string.\n\
         2. stages: a list of 4-6 project stages, each with \"name\", \"duration\", and estimated \"cost\".\n\
         3. expenses: a list of 5-7 key expense items, each with \"category\" and \"cost\", \
            e.g. {{ \"category\": \"Staff Training\", \"cost\": \"\u{a3}10000\" }}.\n\
         4. cashflow: a dictionary with \"initial_investment\", \"monthly_outflow\", \
            \"expected_return_on_investment_roi\", and \"break_even_point\".\n\
         5. tolerance: a dictionary with \"time_tolerance\", \"cost_tolerance\", and \"quality_tolerance\".\n\
         6. governance: a 2-3 sentence paragraph as a single string, NOT a dictionary.\n\
         Use the currency \"\u{a3}\". Return ONLY the JSON object."
    );
    let request = ChatRequest {
        system,
        user: "Generate the financial plan now.".to_string(),
        temperature: 0.3,
    };

    let response = match client.chat(&request).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "financial plan generation failed; using defaults");
            return None;
        }
    };
    match coerce_object(&response.text) {
        Ok(obj) => Some(obj),
        Err(e) => {
            tracing::warn!(error = %e, "financial plan response unusable; using defaults");
            None
        }
    }
}

/// Assemble the document from generated content, filling every section with
/// defaults derived from the stored tree when the content is missing.
pub fn assemble_financial_plan(
    raw: Option<Map<String, Value>>,
    tree: &ProjectWithTree,
    facts: &ProjectFacts,
    today: NaiveDate,
) -> FinancialPlan {
    let obj = raw.unwrap_or_default();

    let summary = summary_text(&obj).unwrap_or_else(|| {
        format!(
            "The financial plan for {} covers stages, costs, monthly phasing, tolerances \
             and governance. Values below include sensible defaults if AI data was unavailable.",
            facts.project_name
        )
    });

    let stages = obj
        .get("stages")
        .and_then(rows_from_any)
        .unwrap_or_else(|| default_stages(tree));

    let expenses = obj
        .get("expenses")
        .or_else(|| obj.get("costs"))
        .or_else(|| obj.get("Costs"))
        .and_then(rows_from_any)
        .filter(|rows| rows.len() > 1)
        .unwrap_or_else(|| default_expenses(tree));

    // Second column is assumed money-like; rows that don't parse count zero.
    let total_cost: f64 = expenses
        .iter()
        .skip(1)
        .filter_map(|r| r.get(1))
        .filter_map(|c| parse_money(c))
        .sum();
    let cashflow = monthly_cashflow(tree, total_cost, today);

    let tolerance = vec![
        vec!["Field".to_string(), "Value".to_string()],
        vec!["time_tolerance".to_string(), "10%".to_string()],
        vec!["cost_tolerance".to_string(), "15%".to_string()],
        vec!["quality_tolerance".to_string(), "5%".to_string()],
    ];

    let governance = format!(
        "Executive Sponsor: {}; PM: {}. Board cadence: {}; highlights: {}.",
        facts.executive_sponsor,
        facts.project_manager,
        facts.board_cadence,
        facts.highlight_frequency
    );

    FinancialPlan {
        summary,
        stages,
        expenses,
        cashflow,
        tolerance,
        governance,
    }
}

fn summary_text(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("summary") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Object(m)) => m
            .get("Text")
            .or_else(|| m.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn default_stages(tree: &ProjectWithTree) -> Vec<Vec<String>> {
    let task_count = tree.tasks().len().max(1);
    let execution_weeks = (task_count * 2).max(4);
    vec![
        vec!["name".to_string(), "duration".to_string(), "cost".to_string()],
        vec!["Initiation".to_string(), "2 weeks".to_string(), "\u{a3}5,000".to_string()],
        vec!["Planning".to_string(), "4 weeks".to_string(), "\u{a3}10,000".to_string()],
        vec![
            "Execution".to_string(),
            format!("{execution_weeks} weeks"),
            "\u{a3}40,000".to_string(),
        ],
        vec!["Closure".to_string(), "2 weeks".to_string(), "\u{a3}5,000".to_string()],
    ]
}

fn default_expenses(tree: &ProjectWithTree) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["category".to_string(), "cost".to_string()]];
    let deliverables: Vec<&str> = tree
        .outcomes
        .iter()
        .flat_map(|o| &o.benefits)
        .flat_map(|b| &b.deliverables)
        .map(|d| d.deliverable.description.as_str())
        .collect();
    if deliverables.is_empty() {
        rows.push(vec!["General delivery".to_string(), "\u{a3}20,000".to_string()]);
    } else {
        for d in deliverables {
            rows.push(vec![d.to_string(), "\u{a3}10,000".to_string()]);
        }
    }
    rows
}

/// Spread the total cost evenly over the project's months.
///
/// The span comes from stored task dates when any exist, otherwise six months
/// starting today. A zero total falls back to a nominal £60,000.
fn monthly_cashflow(tree: &ProjectWithTree, total_cost: f64, today: NaiveDate) -> Vec<Vec<String>> {
    let tasks = tree.tasks();
    let start = tasks
        .iter()
        .filter_map(|t| t.start_date)
        .min()
        .unwrap_or(today);
    let end = tasks
        .iter()
        .filter_map(|t| t.end_date)
        .max()
        .unwrap_or_else(|| add_months(today, 5));

    let months = months_between(start, end.max(start));
    let total = if total_cost > 0.0 { total_cost } else { 60_000.0 };
    let per_month = total / months.len() as f64;

    let mut rows = vec![vec!["month".to_string(), "planned_outflow".to_string()]];
    for m in months {
        rows.push(vec![m.format("%b %Y").to_string(), format_gbp(per_month)]);
    }
    rows
}

/// First-of-month dates from start through end, inclusive.
fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut cur = NaiveDate::from_ymd_opt(start.year(), start.month(), 1)
        .expect("first of month is always valid");
    let last = NaiveDate::from_ymd_opt(end.year(), end.month(), 1)
        .expect("first of month is always valid");
    while cur <= last {
        months.push(cur);
        cur = add_months(cur, 1);
    }
    months
}

fn add_months(d: NaiveDate, n: u32) -> NaiveDate {
    let total = d.year() * 12 + d.month0() as i32 + n as i32;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, d.day().min(28))
        .expect("day clamped to 28 is always valid")
}

/// "£12,345" — whole pounds with thousands separators.
pub fn format_gbp(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-\u{a3}{grouped}")
    } else {
        format!("\u{a3}{grouped}")
    }
}

/// Render the financial plan as a CSV document.
pub fn financial_plan_csv(plan: &FinancialPlan, project_name: &str) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    rows.push(vec![format!("Financial Plan - {project_name}")]);
    rows.push(vec![]);
    rows.push(vec!["Summary".to_string()]);
    rows.push(vec![plan.summary.clone()]);
    rows.push(vec![]);
    rows.push(vec!["Stages".to_string()]);
    rows.extend(plan.stages.iter().cloned());
    rows.push(vec![]);
    rows.push(vec!["Expenses".to_string()]);
    rows.extend(plan.expenses.iter().cloned());
    rows.push(vec![]);
    rows.push(vec!["Cashflow - Monthly Phasing".to_string()]);
    rows.extend(plan.cashflow.iter().cloned());
    rows.push(vec![]);
    rows.push(vec!["Tolerance".to_string()]);
    rows.extend(plan.tolerance.iter().cloned());
    rows.push(vec![]);
    rows.push(vec!["Governance".to_string()]);
    rows.push(vec![plan.governance.clone()]);
    csvio::render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, ProjectWithTree};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn empty_tree() -> ProjectWithTree {
        ProjectWithTree {
            project: Project {
                id: Uuid::new_v4(),
                name: "Demo".to_string(),
                vision: "v".to_string(),
                revision: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            outcomes: vec![],
        }
    }

    fn facts() -> ProjectFacts {
        ProjectFacts::from_tree(&empty_tree())
    }

    fn today() -> NaiveDate {
        "2025-01-15".parse().unwrap()
    }

    #[test]
    fn defaults_fill_every_section_when_generation_fails() {
        let plan = assemble_financial_plan(None, &empty_tree(), &facts(), today());
        assert!(plan.summary.contains("sensible defaults"));
        assert_eq!(plan.stages[0], vec!["name", "duration", "cost"]);
        assert_eq!(plan.expenses[1][0], "General delivery");
        // Six default months starting today.
        assert_eq!(plan.cashflow.len(), 7);
        assert_eq!(plan.cashflow[1][0], "Jan 2025");
        assert_eq!(plan.cashflow[6][0], "Jun 2025");
        assert!(plan.governance.contains("Board cadence"));
    }

    #[test]
    fn generated_expenses_drive_the_cashflow_total() {
        let raw = json!({
            "summary": "Keep spend flat.",
            "expenses": [
                {"category": "Staff", "cost": "\u{a3}30,000"},
                {"category": "Hardware", "cost": "\u{a3}30,000"}
            ]
        });
        let plan = assemble_financial_plan(
            raw.as_object().cloned(),
            &empty_tree(),
            &facts(),
            today(),
        );
        assert_eq!(plan.summary, "Keep spend flat.");
        // £60,000 over 6 months.
        assert_eq!(plan.cashflow[1][1], "\u{a3}10,000");
    }

    #[test]
    fn summary_accepts_nested_text_object() {
        let raw = json!({"summary": {"Text": "Nested."}});
        let plan = assemble_financial_plan(
            raw.as_object().cloned(),
            &empty_tree(),
            &facts(),
            today(),
        );
        assert_eq!(plan.summary, "Nested.");
    }

    #[test]
    fn formats_gbp_with_separators() {
        assert_eq!(format_gbp(1234567.0), "\u{a3}1,234,567");
        assert_eq!(format_gbp(999.4), "\u{a3}999");
        assert_eq!(format_gbp(0.0), "\u{a3}0");
    }

    #[test]
    fn csv_contains_all_sections() {
        let plan = assemble_financial_plan(None, &empty_tree(), &facts(), today());
        let csv = financial_plan_csv(&plan, "Demo");
        for section in [
            "Summary",
            "Stages",
            "Expenses",
            "Cashflow - Monthly Phasing",
            "Tolerance",
            "Governance",
        ] {
            assert!(csv.contains(section), "missing section {section}");
        }
    }
}
