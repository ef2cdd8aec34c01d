//! Search execution and workbook assembly over in-memory systems.

mod common;

use std::sync::Arc;
use std::time::Duration;

use audit_parser::config::{compare_versions, Comparator, FilterAttribute, MergeFieldRule, SearchFlags, SystemFilterClause};
use audit_parser::engine::{execute, execute_all, CancelToken, ExecutionOptions};
use audit_parser::models::{OsFamily, System};
use audit_parser::report::{build_workbooks, ReportOptions, WorkbookLayout};

use common::{definition, nix, os_of, win};

fn fleet() -> Vec<Arc<System>> {
    vec![
        nix("web01", "0.6.9", "Users_etcpasswd::root:x:0:0:root:/root:/bin/bash\n", 0),
        nix("web02", "0.6.21", "Users_etcpasswd::alice:x:1000:1000::/home/alice:/bin/zsh\n", 1),
        nix("web03", "0.7.0", "Users_etcpasswd::bob:x:1001:1001::/home/bob:/bin/sh\n", 2),
        win("dc01", "System_SystemInfo::Host Name: DC01\r\n", 3),
    ]
}

fn version_clause(comparison: Comparator, value: &str) -> SystemFilterClause {
    SystemFilterClause {
        attribute: FilterAttribute::ProducerVersion,
        comparison,
        value: value.to_string(),
    }
}

#[test]
fn test_versions_order_numerically() {
    assert!(compare_versions("0.6.9", "0.6.21").is_lt());
    assert!(compare_versions("0.6.21", "0.7.0").is_lt());
    assert!(compare_versions("0.7", "0.7.0").is_eq());
}

#[test]
fn test_version_filter_selects_systems() {
    let systems = fleet();
    let mut users = definition("users", r"^Users_etcpasswd::(?P<user>[^:]+)", &["user"], SearchFlags::default());
    users.sys_filter = vec![
        SystemFilterClause {
            attribute: FilterAttribute::OsFamily,
            comparison: Comparator::Eq,
            value: "Linux".to_string(),
        },
        version_clause(Comparator::Ge, "0.6.21"),
    ];

    let results = execute(&users, &systems, &ExecutionOptions::default());
    assert_eq!(results.evaluated_systems, vec![1, 2]);
    let found: Vec<&str> = results.results.iter().map(|r| r.fields["user"].as_str()).collect();
    assert_eq!(found, vec!["alice", "bob"]);
}

#[test]
fn test_unique_collapses_duplicates() {
    let body = "Pkg::openssl\nPkg::curl\nPkg::openssl\nPkg::zlib\nPkg::curl\nPkg::bash\nPkg::openssl\nPkg::vim\n";
    let systems = vec![nix("web01", "0.6.22", body, 0)];

    let flags = SearchFlags {
        unique: true,
        ..Default::default()
    };
    let packages = definition("packages", r"^Pkg::(?P<name>\S+)", &["name"], flags);
    let results = execute(&packages, &systems, &ExecutionOptions::default());

    let found: Vec<&str> = results.results.iter().map(|r| r.fields["name"].as_str()).collect();
    assert_eq!(found, vec!["openssl", "curl", "zlib", "bash", "vim"]);
    assert!(!results.truncated);
}

#[test]
fn test_merge_fields_take_first_non_empty_source() {
    let body = "Pkg::deb=openssl\nPkg::rpm=curl\nPkg::deb=\n";
    let systems = vec![nix("web01", "0.6.22", body, 0)];

    let mut packages = definition(
        "packages",
        r"^Pkg::(?:deb=(?P<a>\S*)|rpm=(?P<b>\S*))",
        &["a", "b"],
        SearchFlags::default(),
    );
    packages.merge_fields = vec![MergeFieldRule {
        source_columns: vec!["a".to_string(), "b".to_string()],
        dest_column: "c".to_string(),
    }];

    let results = execute(&packages, &systems, &ExecutionOptions::default());
    let merged: Vec<&str> = results.results.iter().map(|r| r.fields["c"].as_str()).collect();
    assert_eq!(merged, vec!["openssl", "curl", ""]);
    assert!(results.results.iter().all(|r| r.fields.len() == 1));
}

#[test]
fn test_multiline_match_spans_lines() {
    let body = "Network_sshd::Match User backup\nNetwork_sshd::  PasswordAuthentication yes\nNetwork_sshd::X11Forwarding no\n";
    let systems = vec![nix("web01", "0.6.22", body, 0)];

    let flags = SearchFlags {
        multiline: true,
        ..Default::default()
    };
    let block = definition(
        "matchBlocks",
        r"^Network_sshd::Match User (?P<user>\S+)\nNetwork_sshd::\s+(?P<setting>\S+ \S+)$",
        &["user", "setting"],
        flags,
    );
    let results = execute(&block, &systems, &ExecutionOptions::default());

    assert_eq!(results.len(), 1);
    assert_eq!(results.results[0].fields["user"], "backup");
    assert_eq!(results.results[0].fields["setting"], "PasswordAuthentication yes");
}

#[test]
fn test_max_results_truncates_per_system() {
    let systems = fleet();
    let flags = SearchFlags {
        max_results: 1,
        full_scan: true,
        ..Default::default()
    };
    let lines = definition("lines", r"^(?P<line>\S.*)$", &["line"], flags);
    let results = execute(&lines, &systems, &ExecutionOptions::default());

    // One row per system, every system had two lines
    assert_eq!(results.len(), 4);
    assert!(results.truncated);
    assert_eq!(results.truncated_systems.len(), 4);
    assert!(results.match_counts.values().all(|count| *count == 2));
}

#[test]
fn test_parallel_run_matches_sequential_run() {
    let systems = fleet();
    let definitions = vec![
        definition("users", r"^Users_etcpasswd::(?P<user>[^:]+)", &["user"], SearchFlags::default()),
        definition("versions", r"KP(?:NIX|WIN)VERSION: (?P<v>\S+)", &["v"], SearchFlags::default()),
        definition("hosts", r"Host Name: (?P<host>\S+)", &["host"], SearchFlags::default()),
    ];

    let sequential = execute_all(&definitions, &systems, &ExecutionOptions::default());
    let parallel = execute_all(
        &definitions,
        &systems,
        &ExecutionOptions {
            workers: 4,
            ..Default::default()
        },
    );

    assert_eq!(sequential.units_run, 12);
    assert_eq!(parallel.units_run, 12);
    for (a, b) in sequential.results.iter().zip(&parallel.results) {
        let rows = |r: &audit_parser::models::SearchResults| -> Vec<(String, Vec<String>)> {
            r.results
                .iter()
                .map(|row| (row.system.system_name.clone(), row.fields.values().cloned().collect()))
                .collect()
        };
        assert_eq!(a.definition, b.definition);
        assert_eq!(rows(a), rows(b));
    }
}

#[test]
fn test_cancelled_run_reports_partial_results() {
    let systems = fleet();
    let definitions = vec![definition("any", r"(?P<x>\S+)", &["x"], SearchFlags::default())];
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = execute_all(
        &definitions,
        &systems,
        &ExecutionOptions {
            workers: 2,
            unit_timeout: Some(Duration::from_secs(5)),
            cancel,
        },
    );

    assert!(report.cancelled);
    assert_eq!(report.units_planned, 4);
    assert_eq!(report.units_run, 0);
    assert_eq!(report.total_rows(), 0);
}

#[test]
fn test_shared_sheet_names_are_suffixed() {
    let systems = fleet();
    let mut first = definition("first", r"KPNIXVERSION: (?P<v>\S+)", &["v"], SearchFlags::default());
    let mut second = definition("second", r"^Users_etcpasswd::(?P<user>[^:]+)", &["user"], SearchFlags::default());
    first.excel_sheet_name = "Report".to_string();
    second.excel_sheet_name = "Report".to_string();
    let definitions = vec![first, second];

    let report = execute_all(&definitions, &systems, &ExecutionOptions::default());
    let workbooks = build_workbooks(
        &definitions,
        &report.results,
        &systems,
        None,
        &ReportOptions {
            layout: WorkbookLayout::PerOsFamily,
            include_summary: false,
            workbook_stem: "audit".to_string(),
        },
    );

    assert_eq!(workbooks.len(), 2);
    assert_eq!(os_of(&systems).iter().filter(|f| **f == OsFamily::Linux).count(), 3);

    let linux = workbooks.iter().find(|w| w.os_family == Some(OsFamily::Linux)).unwrap();
    let sheets: Vec<&str> = linux.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(sheets, vec!["Report", "Report_2"]);
    assert_eq!(linux.sheets[0].columns, vec!["system_name", "producer", "producer_version", "v"]);
    assert_eq!(linux.sheets[0].rows.len(), 3);
    assert_eq!(linux.sheets[1].rows[0], vec!["web01", "KPNIXAUDIT", "0.6.9", "root"]);

    // dc01 was evaluated by both definitions and keeps both (empty) sheets
    let windows = workbooks.iter().find(|w| w.os_family == Some(OsFamily::Windows)).unwrap();
    assert_eq!(windows.stem, "audit_Windows");
    assert_eq!(windows.sheets.len(), 2);
    assert!(windows.sheets.iter().all(|s| s.rows.is_empty()));
}
