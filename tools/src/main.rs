//! kpi-runner: headless KPI analysis runner.
//!
//! Generates a seeded synthetic dataset (or reuses a SQLite fixture),
//! feeds it through the analyzer, and prints a per-category summary plus
//! an optional JSON report.
//!
//! Usage:
//!   kpi-runner --seed 12345 --calls 2000 --leads 400
//!   kpi-runner --seed 12345 --db fixture.db --report report.json

use anyhow::{Context, Result};
use chrono::NaiveDate;
use kpi_core::{
    analyzer::KpiAnalyzer,
    config::AnalyzerConfig,
    report::build_report,
    rows::{CallRow, KpiPlanRow, LeadContainerRow, LeadRow, OfferRow},
    stat_utils::print_float,
};
use rand::Rng;
use rand_pcg::Pcg64;
use rusqlite::Connection;
use std::env;
use std::fs;

struct Dataset {
    offers: Vec<OfferRow>,
    plans: Vec<KpiPlanRow>,
    calls: Vec<CallRow>,
    leads: Vec<LeadRow>,
    containers: Vec<LeadContainerRow>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let call_count = parse_arg(&args, "--calls", 2000usize);
    let lead_count = parse_arg(&args, "--leads", 400usize);
    let operator_count = parse_arg(&args, "--operators", 12usize);
    let offer_count = parse_arg(&args, "--offers", 6i64);
    let db = string_arg(&args, "--db");
    let report_path = string_arg(&args, "--report");
    let config_path = string_arg(&args, "--config");

    let mut config = match config_path {
        Some(path) => {
            let json = fs::read_to_string(path).context("reading config file")?;
            AnalyzerConfig::from_json(&json)?
        }
        None => AnalyzerConfig::default(),
    };
    if let Some(as_of) = string_arg(&args, "--as-of") {
        config.plan_as_of = Some(
            NaiveDate::parse_from_str(as_of, "%Y-%m-%d").context("parsing --as-of")?,
        );
    }

    println!("kpi-runner");
    println!("  seed:      {seed}");
    println!("  calls:     {call_count}");
    println!("  leads:     {lead_count}");
    println!("  operators: {operator_count}");
    println!("  offers:    {offer_count}");
    println!();

    let dataset = generate_dataset(seed, call_count, lead_count, operator_count, offer_count);

    // The fixture round-trip is optional; when a db path is given the
    // analyzer reads what SQLite handed back, not the in-memory rows.
    let dataset = match db {
        Some(path) => {
            let conn = Connection::open(path).context("opening fixture db")?;
            write_fixture(&conn, &dataset)?;
            load_fixture(&conn)?
        }
        None => dataset,
    };

    let mut analyzer = KpiAnalyzer::new(config);
    for offer in &dataset.offers {
        analyzer.push_offer(offer)?;
    }
    for plan in dataset.plans {
        analyzer.push_kpi_plan(plan)?;
    }
    for call in &dataset.calls {
        analyzer.push_call(call)?;
    }
    for lead in &dataset.leads {
        analyzer.push_lead(lead)?;
    }
    for container in &dataset.containers {
        analyzer.push_lead_container(container)?;
    }
    analyzer.finalize();

    print_summary(&analyzer);

    if let Some(path) = report_path {
        let report = build_report(&analyzer)?;
        fs::write(path, report.to_json()?).context("writing report")?;
        println!("report written to {path}");
    }

    Ok(())
}

fn generate_dataset(
    seed: u64,
    call_count: usize,
    lead_count: usize,
    operator_count: usize,
    offer_count: i64,
) -> Dataset {
    let mut rng = Pcg64::new(seed as u128, 0xa02bdbf7bb3c0a7);
    let categories = ["Health", "Beauty"];

    let offers: Vec<OfferRow> = (1..=offer_count)
        .map(|id| OfferRow {
            id,
            name: format!("Offer #{id}"),
            category_name: categories[(id % 2) as usize].to_string(),
        })
        .collect();

    let plans: Vec<KpiPlanRow> = offers
        .iter()
        .enumerate()
        .map(|(i, offer)| KpiPlanRow {
            id: i as i64 + 1,
            offer_id: offer.id,
            affiliate_id: None,
            period_date: "2026-01-01".to_string(),
            operator_efficiency: Some(rng.gen_range(0.2..0.6)),
            planned_approve: Some(rng.gen_range(30.0..60.0)),
            planned_buyout: Some(rng.gen_range(20.0..50.0)),
            confirmation_price: Some(rng.gen_range(5.0..15.0)),
            updated_at: None,
            operator_efficiency_updated_at: None,
            planned_approve_updated_at: None,
            planned_buyout_updated_at: None,
            confirmation_price_updated_at: None,
        })
        .collect();

    let statuses = [
        ("accepted", "Confirmed"),
        ("accepted", "Callback day 2"),
        ("shipped", "Shipped"),
        ("paid", "Paid"),
        ("cancel", "Canceled by client"),
        ("trash", "Spam"),
    ];

    let mut leads = Vec::with_capacity(lead_count);
    let mut containers = Vec::with_capacity(lead_count);
    for lead_id in 1..=lead_count as i64 {
        let offer_id = rng.gen_range(1..=offer_count);
        let affiliate_id = rng.gen_range(1..=5);
        let operator = format!("operator-{}", rng.gen_range(1..=operator_count));
        let (group, verbose) = statuses[rng.gen_range(0..statuses.len())];
        let approved = matches!(group, "accepted" | "shipped" | "paid");
        let category = &offers[(offer_id - 1) as usize].category_name;

        let approved_at = approved.then(|| "2026-05-10 12:00:00".to_string());
        leads.push(LeadRow {
            lead_id,
            approved_at: approved_at.clone(),
            canceled_at: None,
            status_verbose: verbose.to_string(),
            status_group: group.to_string(),
            operator_name: operator.clone(),
            offer_id,
            affiliate_id,
            category_name: category.clone(),
        });
        containers.push(LeadContainerRow {
            lead_id,
            created_at: Some("2026-05-08 09:00:00".to_string()),
            approved_at,
            canceled_at: None,
            buyout_at: (group == "paid").then(|| "2026-05-20 15:00:00".to_string()),
            status_verbose: verbose.to_string(),
            status_group: group.to_string(),
            is_trash: group == "trash",
            offer_id,
            affiliate_id,
            category_name: category.clone(),
        });
    }

    let mut calls = Vec::with_capacity(call_count);
    for id in 1..=call_count as i64 {
        let lead = &leads[rng.gen_range(0..leads.len())];
        let billsec = rng.gen_range(5..240);
        calls.push(CallRow {
            id,
            uniqueid: format!("{seed}.{id}"),
            offer_id: lead.offer_id,
            affiliate_id: lead.affiliate_id,
            operator_id: rng.gen_range(1..=operator_count as i64),
            operator_name: lead.operator_name.clone(),
            lead_id: lead.lead_id,
            call_date: format!("2026-05-{:02} 10:00:00", rng.gen_range(1..=28)),
            billsec: Some(billsec),
            billsec_exact: rng.gen_bool(0.3).then(|| billsec - rng.gen_range(0..5)),
            category_name: lead.category_name.clone(),
        });
    }

    Dataset {
        offers,
        plans,
        calls,
        leads,
        containers,
    }
}

fn write_fixture(conn: &Connection, dataset: &Dataset) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS rows;
         CREATE TABLE rows (kind TEXT NOT NULL, body TEXT NOT NULL);",
    )?;
    let mut stmt = conn.prepare("INSERT INTO rows (kind, body) VALUES (?1, ?2)")?;
    for offer in &dataset.offers {
        stmt.execute(("offer", serde_json::to_string(offer)?))?;
    }
    for plan in &dataset.plans {
        stmt.execute(("plan", serde_json::to_string(plan)?))?;
    }
    for call in &dataset.calls {
        stmt.execute(("call", serde_json::to_string(call)?))?;
    }
    for lead in &dataset.leads {
        stmt.execute(("lead", serde_json::to_string(lead)?))?;
    }
    for container in &dataset.containers {
        stmt.execute(("container", serde_json::to_string(container)?))?;
    }
    Ok(())
}

fn load_fixture(conn: &Connection) -> Result<Dataset> {
    let mut dataset = Dataset {
        offers: Vec::new(),
        plans: Vec::new(),
        calls: Vec::new(),
        leads: Vec::new(),
        containers: Vec::new(),
    };
    let mut stmt = conn.prepare("SELECT kind, body FROM rows")?;
    let mut rows = stmt.query(())?;
    while let Some(row) = rows.next()? {
        let kind: String = row.get(0)?;
        let body: String = row.get(1)?;
        match kind.as_str() {
            "offer" => dataset.offers.push(serde_json::from_str(&body)?),
            "plan" => dataset.plans.push(serde_json::from_str(&body)?),
            "call" => dataset.calls.push(serde_json::from_str(&body)?),
            "lead" => dataset.leads.push(serde_json::from_str(&body)?),
            "container" => dataset.containers.push(serde_json::from_str(&body)?),
            other => log::warn!("unknown fixture row kind '{other}'"),
        }
    }
    Ok(dataset)
}

fn print_summary(analyzer: &KpiAnalyzer) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id: {}", analyzer.run_id);
    println!("  dropped rows: {}", analyzer.dropped_row_count());

    for (name, category) in analyzer.categories() {
        println!();
        println!("=== CATEGORY: {name} ===");
        println!("  effective calls:     {}", category.stat.calls_effective_count);
        println!("  payable leads:       {}", category.stat.leads_effective_count);
        println!("  effective rate:      {:.2}", category.stat.effective_rate);
        println!(
            "  effective percent:   {}",
            print_float(category.stat.effective_percent)
        );
        println!("  non-trash leads:     {}", category.lead_container.leads_non_trash_count);
        println!("  approved leads:      {}", category.lead_container.leads_approved_count);
        println!("  bought-out leads:    {}", category.lead_container.leads_buyout_count);
        println!(
            "  recommended eff:     {}",
            print_float(category.recommended_efficiency.value)
        );
        println!(
            "  recommended approve: {}",
            print_float(category.recommended_approve.value)
        );
        println!(
            "  recommended buyout:  {}",
            print_float(category.recommended_buyout.value)
        );

        let flagged = category
            .offers
            .values()
            .filter(|o| {
                o.efficiency_correction.flagged
                    || o.approve_correction.flagged
                    || o.buyout_correction.flagged
                    || o.confirmation_price_correction.flagged
            })
            .count();
        println!("  offers flagged:      {flagged}/{}", category.offers.len());
    }

    let errors = analyzer.kpi_calculation_errors();
    if !errors.is_empty() {
        println!();
        println!("=== PLAN LOOKUP DIAGNOSTICS ===");
        print!("{errors}");
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
