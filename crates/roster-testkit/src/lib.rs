// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use roster_app::{CellValue, RecordId, Table, TableKind};
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::{Date, Duration, Month, OffsetDateTime, Time};

const CLIENTS: [&str; 14] = [
    "ADCB",
    "Emirates NBD",
    "FAB",
    "Mashreq",
    "QNB",
    "Riyad Bank",
    "SNB",
    "Al Rajhi",
    "Kotak",
    "HDFC",
    "ICICI",
    "DBS",
    "OCBC",
    "Maybank",
];

const AGENTS: [&str; 12] = [
    "CxO Concierge",
    "PFM",
    "RM Wealth Assistant",
    "CFO Earnings Analyst",
    "Treasury Copilot",
    "Collections Assistant",
    "KYC Reviewer",
    "Loan Underwriter",
    "Branch Advisor",
    "Fraud Triage",
    "Card Disputes Agent",
    "Onboarding Guide",
];

const TIMELINES: [&str; 5] = ["Ready", "1 week", "2 weeks", "1 month", "Next quarter"];

const DEPENDENCIES: [&str; 5] = [
    "None",
    "Data integration pending",
    "Awaiting client sandbox",
    "Model evaluation in progress",
    "Security review",
];

const FIRST_NAMES: [&str; 16] = [
    "Aditi", "Bharath", "Divya", "Farhan", "Gautam", "Harini", "Ishaan", "Kavya", "Lakshmi",
    "Mohan", "Nikhil", "Pooja", "Rahul", "Sneha", "Varun", "Yamini",
];
const LAST_NAMES: [&str; 14] = [
    "Iyer", "Menon", "Nair", "Rao", "Reddy", "Pillai", "Kumar", "Sharma", "Gupta", "Bose",
    "Das", "Joshi", "Khan", "Verma",
];

const STREAM_ROLES: [(&str, &[&str]); 6] = [
    (
        "Engineering",
        &["Data Engineer", "Software Development", "UI Engineer", "Test Engineer"],
    ),
    (
        "Data Science & Analytics",
        &["Data Scientist", "Customer Scientist", "DE / DS"],
    ),
    ("Product Management", &["Product Manager", "User Experience (UX) Design"]),
    ("Customer Success", &["Customer Success"]),
    ("Project Management", &["Business Analyst", "Delivery Management"]),
    ("Operations", &["General Office Administration"]),
];

const REFERENCE_YEAR: i32 = 2024;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of dashboard rows. Values are keyed by the default
/// column keys of each table.
#[derive(Debug, Clone)]
pub struct DashboardFaker {
    rng: DeterministicRng,
}

impl DashboardFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn values_for(&mut self, kind: TableKind) -> BTreeMap<String, CellValue> {
        match kind {
            TableKind::Clients => self.client(),
            TableKind::Agents => self.agent(),
            TableKind::Resources => self.resource(),
        }
    }

    pub fn client(&mut self) -> BTreeMap<String, CellValue> {
        let count = 1 + self.rng.int_n(3);
        let mut agents = Vec::with_capacity(count);
        while agents.len() < count {
            let agent = self.pick(&AGENTS);
            if !agents.contains(&agent) {
                agents.push(agent);
            }
        }
        let met = self.date_in_year(REFERENCE_YEAR);
        BTreeMap::from([
            ("clientName".to_owned(), CellValue::text(self.pick(&CLIENTS))),
            ("agentsProposed".to_owned(), CellValue::text(agents.join(", "))),
            ("lastMeetingDate".to_owned(), CellValue::text(met.to_string())),
        ])
    }

    pub fn agent(&mut self) -> BTreeMap<String, CellValue> {
        let ready = self.rng.bool();
        let (timeline, dependencies) = if ready {
            ("Ready", "None")
        } else {
            (
                self.pick(&TIMELINES[1..]),
                self.pick(&DEPENDENCIES[1..]),
            )
        };
        BTreeMap::from([
            ("agentName".to_owned(), CellValue::text(self.pick(&AGENTS))),
            ("demoReady".to_owned(), CellValue::Bool(ready)),
            ("internalOwner".to_owned(), CellValue::text(self.person())),
            ("estimatedTimeline".to_owned(), CellValue::text(timeline)),
            ("dependencies".to_owned(), CellValue::text(dependencies)),
        ])
    }

    pub fn resource(&mut self) -> BTreeMap<String, CellValue> {
        let (stream, roles) = STREAM_ROLES[self.rng.int_n(STREAM_ROLES.len())];
        let role = self.pick(roles);
        BTreeMap::from([
            ("fullName".to_owned(), CellValue::text(self.person())),
            ("stream".to_owned(), CellValue::text(stream)),
            ("role".to_owned(), CellValue::text(role)),
            (
                "isDeployed".to_owned(),
                CellValue::Bool(self.rng.int_n(4) == 0),
            ),
        ])
    }

    /// Appends `count` generated rows to `table`, one second apart from
    /// `now`. Rows the table's create policy refuses are skipped.
    pub fn fill(&mut self, table: &mut Table, count: usize, now: OffsetDateTime) -> Vec<RecordId> {
        let mut created = Vec::with_capacity(count);
        for offset in 0..count {
            let values = self.values_for(table.kind());
            let at = now + Duration::seconds(offset as i64);
            if let Some(id) = table.create(&values, at) {
                created.push(id);
            }
        }
        created
    }

    pub fn date_in_year(&mut self, year: i32) -> Date {
        let start = midnight_utc(year, Month::January, 1);
        let days = self.rng.int_n(365) as i64;
        (start + Duration::days(days)).date()
    }

    fn person(&mut self) -> String {
        format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES))
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("roster.db");
    Ok((dir, db_path))
}

pub fn reference_now() -> OffsetDateTime {
    midnight_utc(REFERENCE_YEAR, Month::September, 1)
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    Date::from_calendar_date(year, month, day)
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::{DashboardFaker, reference_now};
    use roster_app::{Table, TableKind, display_date};

    #[test]
    fn new_deterministic_seed() {
        let mut left = DashboardFaker::new(42);
        let mut right = DashboardFaker::new(42);
        assert_eq!(left.client(), right.client());
        assert_eq!(left.resource(), right.resource());
    }

    #[test]
    fn zero_seed_is_normalized() {
        let mut zero = DashboardFaker::new(0);
        let mut one = DashboardFaker::new(1);
        assert_eq!(zero.agent(), one.agent());
    }

    #[test]
    fn client_dates_are_iso_and_display() {
        let mut faker = DashboardFaker::new(3);
        for _ in 0..20 {
            let client = faker.client();
            let raw = client["lastMeetingDate"].display();
            assert!(raw.starts_with("2024-"), "{raw}");
            assert_ne!(display_date(&raw), raw);
        }
    }

    #[test]
    fn ready_agents_have_no_open_dependencies() {
        let mut faker = DashboardFaker::new(9);
        for _ in 0..50 {
            let agent = faker.agent();
            if agent["demoReady"].as_bool() == Some(true) {
                assert_eq!(agent["dependencies"].as_text(), Some("None"));
            } else {
                assert_ne!(agent["estimatedTimeline"].as_text(), Some("Ready"));
            }
        }
    }

    #[test]
    fn fill_appends_unique_rows_to_every_table() {
        let mut faker = DashboardFaker::new(11);
        for kind in TableKind::ALL {
            let mut table = Table::with_defaults(kind);
            let before = table.len();
            let ids = faker.fill(&mut table, 10, reference_now());
            assert_eq!(ids.len(), 10);
            assert_eq!(table.len(), before + 10);

            let mut sorted = ids.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), ids.len());
        }
    }
}
