// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Seed datasets used on first launch and whenever a persisted payload
//! cannot be read back.

use crate::filter::ColumnGroup;
use crate::{CellValue, ColumnDef, ColumnType, Record, RecordId, TableKind};

pub const DEFAULT_PROJECTS: [&str; 3] = ["Project Alpha", "Project Beta", "Project Gamma"];

pub const PROJECT_GROUP_KEY: &str = "project";

const PROJECT_KEYS: [&str; 3] = ["project1", "project2", "project3"];

// (id, full name, stream, role, deployed)
const RESOURCES: &[(i64, &str, &str, &str, bool)] = &[
    (1, "Abdul Nawaz MD", "Product Management", "Product Manager", false),
    (2, "Alveena Joyce", "Engineering", "Data Engineer", false),
    (3, "Ambarish Srinivasan", "Engineering", "Data Engineer", true),
    (4, "AnandhKumar Muthukumar", "Engineering", "Test Engineer", false),
    (5, "Anbu Sampath", "Engineering", "Software Development", false),
    (6, "Anirudh S", "Engineering", "UI Engineer", false),
    (7, "Anirudh Sudeendran", "Data Science & Analytics", "Customer Scientist", true),
    (8, "Aravind Mohan", "Product Management", "User Experience (UX) Design", false),
    (9, "Arun Changotra", "Engineering", "Software Development", true),
    (10, "Ashutosh Anand", "Customer Success", "Customer Success", false),
    (11, "Ashvath Narayanan", "Engineering", "Associate Data Scientist", false),
    (12, "Aswin Kumar K G", "Engineering", "DevOps Engineer", false),
    (13, "Babu Christopher Donbosco", "Operations", "General Office Administration", false),
    (14, "Boobalamurugan", "Data Science & Analytics", "Data Scientist", false),
    (15, "Bharathwaj Gopalan", "Finance", "Finance", false),
    (16, "Chakradhar Yerranagari", "Finance", "Accounting", false),
    (17, "Chinmoy Rajurkar", "Product Management", "Product Manager", true),
    (18, "Dhanushya Shankar", "Data Science & Analytics", "DE / DS", false),
    (19, "Dilip Kumar Rajendhiran", "Data Science & Analytics", "Data Scientist", true),
    (20, "Ellakkiaa S", "Engineering", "Associate Data Scientist", false),
    (21, "Gali Poojitha", "Engineering", "Software Development", false),
    (22, "Gomathi S", "People", "Talent Mgmt. & Engagement", false),
    (23, "Grace Lee Hui Min", "Operations", "General Office Administration", false),
    (24, "Harish Jayakumar", "Project Management", "Business Analyst", false),
    (25, "Hariharasudhan S", "Data Science & Analytics", "Data Scientist", false),
    (26, "Indukuru Sai Tharun Reddy", "Data Science & Analytics", "DE / DS", false),
    (27, "Iyyappan S", "Engineering", "Data Engineer", false),
    (28, "James Victor Francis", "Data Science & Analytics", "Customer Scientist", true),
    (29, "Jayaprakash Sundaramurthy", "Engineering", "Data Engineer", false),
    (30, "Joshua Lucas", "Customer Success", "Customer Success", false),
    (31, "Jyotsna Singh", "Sales", "Partnerships - Bazaar", false),
    (32, "Karanveer Singh Bakshi", "Sales", "Sales", false),
    (33, "Karthikeyan N", "Data Science & Analytics", "DE / DS", false),
    (34, "Karunamoorthi Sakthivel", "Engineering", "UI Engineer", false),
    (35, "Kathiravan M", "Engineering", "Software Development", false),
    (36, "Kuldeep Gujar", "Engineering", "UI Engineer", false),
    (37, "Maadhusri Ulaganathan", "Data Science & Analytics", "Customer Scientist", false),
    (38, "Madasamy M", "Engineering", "UI Engineer", false),
    (39, "Meenakshi Priyadharshini B", "People", "Talent Acquisition", false),
    (40, "Meghana Jagadish Upasani", "Operations", "Legal", false),
    (41, "Naveenkumar Sivaprakasam", "Engineering", "Software Development", false),
    (42, "Mithuna Jogan", "Engineering", "Data Engineer", false),
    (43, "Parkhiya Dixitkumar Arvindbhai", "Engineering", "UI Engineer", false),
    (44, "Prajjwal Kumar", "Data Science & Analytics", "Customer Scientist", true),
    (45, "Praveen Selvaraj", "Data Science & Analytics", "Data Scientist", false),
    (46, "Priyadharsshni S", "Data Science & Analytics", "Data Scientist", false),
    (47, "Priyanshu Mishra", "Customer Success", "Customer Success", false),
    (48, "Ragunath Venkatraman", "Engineering", "Software Development", false),
    (49, "Rai Pramanik", "People", "Talent Mgmt. & Engagement", false),
    (50, "Ravi Sundar", "Data Science & Analytics", "Data Scientist", false),
    (51, "Rooban Chakravarthy", "Engineering", "Data Engineer", false),
    (52, "Sandeep Guruvindapalli", "Product Management", "Product Manager", true),
    (53, "Sangeetha Thangaraj", "Product Management", "User Experience (UX) Design", false),
    (54, "Sanjana Krishnan", "Engineering", "Data Engineer", false),
    (55, "Saran Kumar", "Data Science & Analytics", "DE / DS", false),
    (56, "Saravanan R", "IT", "General IT Infrastructure Systems Administration", false),
    (57, "Satheesh Kumar Hari", "IT", "General IT Infrastructure Systems Administration", false),
    (58, "Sethu Ramalingam", "Customer Success", "Customer Success", true),
    (59, "Shad Perwez", "Data Science & Analytics", "ML Ops Engineer", false),
    (60, "Shankar Ganesh", "Project Management", "Delivery Management", false),
    (61, "Shilpa Sudarsanakumar", "Project Management", "Business Analyst", false),
    (62, "Shipra Paul", "Operations", "General Regulatory Affairs", false),
    (63, "Shriram Suresh Kumar", "Engineering", "Data Engineer", false),
    (64, "Siranjeevi Shanmugam", "Engineering", "Test Engineer", false),
    (65, "Sivaseelan G", "Engineering", "Software Development", false),
    (66, "Smrithi Sundar", "Data Science & Analytics", "Customer Scientist", false),
    (67, "Sri Bharathan", "Project Management", "Delivery Management", false),
    (68, "Srinivas Puniyakoti", "Data Science & Analytics", "Customer Scientist", true),
    (69, "Srinivasan D", "Product Management", "User Experience (UX) Design", false),
    (70, "Subramani Srinivasan", "Finance", "Accounting", false),
    (71, "Sujee Shalini", "People", "Talent Acquisition", false),
    (72, "Suraj Kesavan", "Data Science & Analytics", "Data Scientist", false),
    (73, "Suresh V Shankar", "Founder", "Executive", false),
    (74, "Tejeswini Kashyappan", "Product Management", "Product Manager", false),
    (75, "Thaanish Ahamed", "Data Science & Analytics", "DE / DS", false),
    (76, "Thahazeef Ali", "Engineering", "UI Engineer", false),
    (77, "Tiyasa Saha", "Pre-Sales", "Sales Engineer", false),
    (78, "Vignesh G", "Data Science & Analytics", "Customer Scientist", true),
    (79, "Vinayak Ganapuram", "Engineering", "Software Development", false),
    (80, "Vinodh Rajamohan", "Engineering", "Data Engineer", true),
    (81, "Vishnu C Bhattatherypad", "Customer Success", "Customer Success", false),
    (82, "Vishnupriya Jeevanram", "Engineering", "Software Development", false),
    (83, "Vivek Muraleedharan", "Engineering", "Data Scientist", true),
];

// (id, agent, demo ready, owner, timeline, dependencies)
const AGENTS: &[(i64, &str, bool, &str, &str, &str)] = &[
    (1, "CxO Concierge", true, "Chinmoy, Ashvath", "Ready", "None"),
    (2, "Personal Finance Assistant", true, "Chinmoy", "Ready", "None"),
    (3, "RM Wealth Assistant", true, "Vignesh GM, Arun Changotra", "Ready", "None"),
    (
        4,
        "CFO Earnings Analyst",
        false,
        "Vignesh GM, Arun Changotra",
        "2 weeks",
        "Data integration pending",
    ),
];

pub fn default_columns(kind: TableKind) -> Vec<ColumnDef> {
    match kind {
        TableKind::Clients => vec![
            ColumnDef::new("clientName", "Client Name", ColumnType::Text),
            ColumnDef::new("agentsProposed", "Agents Proposed", ColumnType::Textarea),
            ColumnDef::new("lastMeetingDate", "Last Meeting Date", ColumnType::Date),
        ],
        TableKind::Agents => vec![
            ColumnDef::new("agentName", "Agent Name", ColumnType::Text),
            ColumnDef::new("demoReady", "Demo Ready", ColumnType::Boolean),
            ColumnDef::new("internalOwner", "Internal Owner", ColumnType::Text),
            ColumnDef::new("estimatedTimeline", "Estimated Timeline", ColumnType::Text),
            ColumnDef::new("dependencies", "Dependencies", ColumnType::Textarea),
        ],
        TableKind::Resources => {
            let mut columns = vec![
                ColumnDef::new("fullName", "Full Name", ColumnType::Text),
                ColumnDef::new("stream", "Stream", ColumnType::Select),
                ColumnDef::new("role", "Role", ColumnType::Text),
            ];
            for (index, key) in PROJECT_KEYS.iter().enumerate() {
                columns.push(
                    ColumnDef::new(*key, format!("Project {}", index + 1), ColumnType::Select)
                        .with_options(DEFAULT_PROJECTS),
                );
            }
            columns.push(ColumnDef::new("isDeployed", "Deployed", ColumnType::Boolean));
            columns
        }
    }
}

pub fn default_records(kind: TableKind) -> Vec<Record> {
    match kind {
        TableKind::Clients => vec![
            Record::new(RecordId::new(1))
                .with_field("clientName", CellValue::text("ADIB"))
                .with_field(
                    "agentsProposed",
                    CellValue::text("CxO Concierge, PFM, RM Wealth Assistant, CFO Earnings Analyst"),
                )
                .with_field("lastMeetingDate", CellValue::text("2024-08-12")),
        ],
        TableKind::Agents => AGENTS
            .iter()
            .map(|&(id, name, ready, owner, timeline, dependencies)| {
                Record::new(RecordId::new(id))
                    .with_field("agentName", CellValue::text(name))
                    .with_field("demoReady", CellValue::Bool(ready))
                    .with_field("internalOwner", CellValue::text(owner))
                    .with_field("estimatedTimeline", CellValue::text(timeline))
                    .with_field("dependencies", CellValue::text(dependencies))
            })
            .collect(),
        TableKind::Resources => RESOURCES
            .iter()
            .map(|&(id, name, stream, role, deployed)| {
                let mut record = Record::new(RecordId::new(id))
                    .with_field("fullName", CellValue::text(name))
                    .with_field("stream", CellValue::text(stream))
                    .with_field("role", CellValue::text(role))
                    .with_field("isDeployed", CellValue::Bool(deployed));
                for key in PROJECT_KEYS {
                    record.set(key, CellValue::text(""));
                }
                record
            })
            .collect(),
    }
}

/// Select columns whose options come from record values instead of the
/// column definition.
pub fn derived_option_keys(kind: TableKind) -> &'static [&'static str] {
    match kind {
        TableKind::Resources => &["stream"],
        TableKind::Clients | TableKind::Agents => &[],
    }
}

pub fn column_groups(kind: TableKind) -> Vec<ColumnGroup> {
    match kind {
        TableKind::Resources => vec![ColumnGroup {
            key: PROJECT_GROUP_KEY.to_owned(),
            label: "Project".to_owned(),
            members: PROJECT_KEYS.iter().map(|key| (*key).to_owned()).collect(),
        }],
        TableKind::Clients | TableKind::Agents => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PROJECTS, default_columns, default_records};
    use crate::TableKind;

    #[test]
    fn default_records_carry_every_registered_key() {
        for kind in TableKind::ALL {
            let columns = default_columns(kind);
            for record in default_records(kind) {
                for column in &columns {
                    assert!(
                        record.get(&column.key).is_some(),
                        "{} record {} lacks {}",
                        kind.as_str(),
                        record.id,
                        column.key
                    );
                }
                assert_eq!(record.fields.len(), columns.len());
            }
        }
    }

    #[test]
    fn default_ids_are_unique_per_table() {
        for kind in TableKind::ALL {
            let mut ids = default_records(kind)
                .iter()
                .map(|record| record.id)
                .collect::<Vec<_>>();
            let before = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), before);
        }
    }

    #[test]
    fn project_columns_share_the_catalog() {
        let columns = default_columns(TableKind::Resources);
        let projects = columns
            .iter()
            .filter(|column| column.key.starts_with("project"))
            .collect::<Vec<_>>();
        assert_eq!(projects.len(), 3);
        for column in projects {
            assert_eq!(column.options, DEFAULT_PROJECTS);
        }
    }
}
