//! Operator-facing rendering
//!
//! Boxes are built as plain lines first so their layout can be tested, then
//! printed with a little color around the edges.

use colored::Colorize;

use crate::catalog::{SetupAction, TestDefinition, Verification};
use crate::report::{Environment, Summary, TestResult, TestStatus};
use crate::verify::CheckResult;

/// Outer width of every box, borders included
pub const BOX_WIDTH: usize = 66;

/// Key menu shown with every card
pub const KEY_MENU: &str = "[p]ass  [f]ail  [s]kip  [n]ote  [q]uit";

/// Frame `lines` in a `+---+` box, truncating anything too wide
pub fn render_box(lines: &[String]) -> Vec<String> {
    let inner = BOX_WIDTH - 4;
    let border = format!("+{}+", "-".repeat(BOX_WIDTH - 2));

    let mut rows = Vec::with_capacity(lines.len() + 2);
    rows.push(border.clone());
    for line in lines {
        let text: String = line.chars().take(inner).collect();
        rows.push(format!("| {:<width$} |", text, width = inner));
    }
    rows.push(border);
    rows
}

pub fn print_box(lines: &[String]) {
    println!();
    let rows = render_box(lines);
    let last = rows.len() - 1;
    for (i, row) in rows.iter().enumerate() {
        if i == 0 || i == last {
            println!("{}", row.dimmed());
        } else if i == 1 {
            println!("{}", row.bold());
        } else {
            println!("{}", row);
        }
    }
}

/// Lines of the card presenting test `index` of `total`
pub fn card_lines(test: &TestDefinition, index: usize, total: usize) -> Vec<String> {
    let mut lines = vec![format!("[{}/{}]  {}  {}", index, total, test.id, test.name)];

    let mut meta = format!(
        "Category: {}   Platform: {}",
        test.display_name,
        test.platforms.join(", ")
    );
    if let Some(pr) = test.pr {
        meta.push_str(&format!("   PR: #{}", pr));
    }
    lines.push(meta);
    lines.push(String::new());

    if !test.setup.is_empty() {
        lines.push("SETUP:".to_string());
        for step in &test.setup {
            lines.push(match step {
                SetupAction::Info(text) => format!("  [info] {}", text),
                SetupAction::Connect(target) => {
                    format!("  [action] Double-click \"{}\" to connect", target)
                }
                SetupAction::CreateConnection(spec) => {
                    format!("  [info] Pre-created connection: \"{}\"", spec.name)
                }
            });
        }
        lines.push(String::new());
    }

    lines.push("INSTRUCTIONS:".to_string());
    for (i, step) in test.instructions.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, step));
    }
    lines.push(String::new());

    lines.push("EXPECTED:".to_string());
    for item in &test.expected {
        lines.push(format!("  - {}", item));
    }
    lines.push(String::new());

    match &test.verification {
        Verification::Manual => lines.push(format!("RESULT: {}", KEY_MENU)),
        Verification::Combined { .. } => {
            lines.push("Press Enter to run automated checks, then confirm.".to_string());
            lines.push(KEY_MENU.to_string());
        }
        _ => {
            lines.push("Press Enter to run automated verification.".to_string());
            lines.push(KEY_MENU.to_string());
        }
    }
    lines
}

pub fn print_card(test: &TestDefinition, index: usize, total: usize) {
    print_box(&card_lines(test, index, total));
}

/// What the session overview reports
pub struct Overview<'a> {
    pub environment: &'a Environment,
    pub tests: &'a [TestDefinition],
    /// Size of the whole catalog before filtering
    pub catalog_size: usize,
    pub app_found: bool,
    pub date: String,
}

/// Tests per category display name, in first-seen order
pub fn category_counts(tests: &[TestDefinition]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for test in tests {
        match counts.iter_mut().find(|(name, _)| *name == test.display_name) {
            Some((_, count)) => *count += 1,
            None => counts.push((test.display_name.clone(), 1)),
        }
    }
    counts
}

fn dotted(label: &str, width: usize) -> String {
    let dots = width.saturating_sub(label.chars().count()).max(1);
    format!("{} {}", label, ".".repeat(dots))
}

fn availability(ok: bool, detail: &str) -> String {
    if ok {
        detail.to_string()
    } else {
        "not available".to_string()
    }
}

pub fn overview_lines(overview: &Overview<'_>) -> Vec<String> {
    let env = overview.environment;
    let mut lines = vec![
        "termiHub Guided Manual Tests".to_string(),
        format!("Platform:  {} ({})", env.os_version, env.arch),
        format!("Date:      {}", overview.date),
        String::new(),
        "Test categories for this platform:".to_string(),
    ];

    for (category, count) in category_counts(overview.tests) {
        lines.push(format!("  {} {:>3} tests", dotted(&category, 30), count));
    }
    lines.push(String::new());
    lines.push(format!(
        "Total applicable: {} of {} tests",
        overview.tests.len(),
        overview.catalog_size
    ));
    lines.push(String::new());

    lines.push("Infrastructure:".to_string());
    lines.push(format!(
        "  Docker ........... {}",
        availability(env.docker_available, "available")
    ));
    if env.platform != "windows" {
        lines.push(format!(
            "  Virtual serial ... {}",
            availability(env.serial_available, "available (socat)")
        ));
    }
    lines.push(format!(
        "  App binary ....... {}",
        if overview.app_found { "found" } else { "not found" }
    ));
    lines
}

pub fn print_overview(overview: &Overview<'_>) {
    print_box(&overview_lines(overview));
}

/// `Xm YYs`
pub fn format_duration(seconds: u64) -> String {
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

pub fn summary_lines(results: &[TestResult], report_path: &str, duration_seconds: u64) -> Vec<String> {
    let summary = Summary::from_results(results);
    let mut lines = vec![
        "Session Complete".to_string(),
        String::new(),
        "Results:".to_string(),
        format!("  Passed .............. {:>3}", summary.passed),
        format!("  Failed .............. {:>3}", summary.failed),
        format!("  Skipped ............. {:>3}", summary.skipped),
        format!("  Not run ............. {:>3}", summary.not_run),
        String::new(),
    ];

    let failed: Vec<&TestResult> = results
        .iter()
        .filter(|r| r.status == TestStatus::Failed)
        .collect();
    if !failed.is_empty() {
        lines.push("Failed tests:".to_string());
        for result in failed {
            lines.push(format!("  {}  {}", result.id, result.name));
            if let Some(note) = &result.note {
                lines.push(format!("    Note: \"{}\"", note));
            }
        }
        lines.push(String::new());
    }

    lines.push("Report saved to:".to_string());
    lines.push(format!("  {}", report_path));
    lines.push(String::new());
    lines.push(format!("Duration: {}", format_duration(duration_seconds)));
    lines
}

pub fn print_summary(results: &[TestResult], report_path: &str, duration_seconds: u64) {
    print_box(&summary_lines(results, report_path, duration_seconds));
}

/// Automated check outcomes under a `VERIFICATION:` heading
pub fn print_checks(checks: &[CheckResult]) {
    println!();
    println!("  VERIFICATION:");
    for check in checks {
        let tag = if check.passed {
            "[pass]".green()
        } else {
            "[FAIL]".red().bold()
        };
        println!("    {} {}", tag, check.description);
    }
    println!();
}

/// `--list` output: tests grouped under their category display name
pub fn list_lines(tests: &[TestDefinition]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<&str> = None;
    for test in tests {
        if current != Some(test.display_name.as_str()) {
            current = Some(test.display_name.as_str());
            lines.push(String::new());
            lines.push(format!("  {}", test.display_name));
            lines.push(format!("  {}", "=".repeat(test.display_name.chars().count())));
        }
        let pr = test
            .pr
            .map(|pr| format!("  (PR #{})", pr))
            .unwrap_or_default();
        lines.push(format!("    {:<15} {}{}", test.id, test.name, pr));
    }
    lines
}

pub fn print_list(tests: &[TestDefinition], catalog_size: usize, platform: &str) {
    println!(
        "\n{} ({} of {}):",
        format!("Manual tests for {}", platform).blue().bold(),
        tests.len(),
        catalog_size
    );
    for line in list_lines(tests) {
        println!("{}", line);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_def(yaml: &str, display_name: &str) -> TestDefinition {
        let mut test: TestDefinition = serde_yaml::from_str(yaml).unwrap();
        test.category = display_name.to_lowercase();
        test.display_name = display_name.to_string();
        test
    }

    #[test]
    fn test_box_rows_have_fixed_width() {
        let rows = render_box(&["short".to_string(), "x".repeat(200)]);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.chars().count() == BOX_WIDTH));
        assert_eq!(rows[1], format!("| {:<62} |", "short"));
    }

    #[test]
    fn test_card_layout() {
        let test = test_def(
            r#"
id: MT-SSH-01
name: Connect over SSH
platforms: [linux, macos]
pr: 42
setup:
  - Make sure the container is up
  - connect: SSH Test
  - create_connection:
      name: SSH Test
      type: ssh
instructions:
  - Type ls
expected:
  - Files listed
verification:
  type: port_listening
  port: 2201
"#,
            "SSH",
        );

        let lines = card_lines(&test, 2, 7);
        assert_eq!(lines[0], "[2/7]  MT-SSH-01  Connect over SSH");
        assert_eq!(lines[1], "Category: SSH   Platform: linux, macos   PR: #42");
        assert!(lines.contains(&"SETUP:".to_string()));
        assert!(lines.contains(&"  [info] Make sure the container is up".to_string()));
        assert!(lines.contains(&"  [action] Double-click \"SSH Test\" to connect".to_string()));
        assert!(lines.contains(&"  [info] Pre-created connection: \"SSH Test\"".to_string()));
        assert!(lines.contains(&"  1. Type ls".to_string()));
        assert!(lines.contains(&"  - Files listed".to_string()));
        assert!(lines.contains(&"Press Enter to run automated verification.".to_string()));
    }

    #[test]
    fn test_manual_card_without_setup() {
        let test = test_def("id: T1\nname: Plain\n", "Local");
        let lines = card_lines(&test, 1, 1);
        assert!(!lines.contains(&"SETUP:".to_string()));
        assert_eq!(lines.last().unwrap(), &format!("RESULT: {}", KEY_MENU));
    }

    #[test]
    fn test_overview_counts_categories_in_order() {
        let tests = vec![
            test_def("id: A\nname: a\n", "Local Shell"),
            test_def("id: B\nname: b\n", "SSH"),
            test_def("id: C\nname: c\n", "Local Shell"),
        ];
        let env = Environment {
            platform: "windows".to_string(),
            arch: "x86_64".to_string(),
            os_version: "Windows 11".to_string(),
            docker_available: false,
            serial_available: false,
        };
        let lines = overview_lines(&Overview {
            environment: &env,
            tests: &tests,
            catalog_size: 10,
            app_found: true,
            date: "2026-03-01T10:00:00Z".to_string(),
        });

        let local = lines.iter().position(|l| l.starts_with("  Local Shell ....")).unwrap();
        let ssh = lines.iter().position(|l| l.starts_with("  SSH ....")).unwrap();
        assert!(local < ssh);
        assert!(lines[local].ends_with("  2 tests"));
        assert!(lines.contains(&"Total applicable: 3 of 10 tests".to_string()));
        assert!(lines.contains(&"  Docker ........... not available".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Virtual serial")));
        assert!(lines.contains(&"  App binary ....... found".to_string()));
    }

    #[test]
    fn test_summary_lists_failures_with_notes() {
        let failed = TestResult {
            id: "T2".to_string(),
            name: "Broken".to_string(),
            category: "local".to_string(),
            status: TestStatus::Failed,
            timestamp: String::new(),
            duration_seconds: 5,
            note: Some("cursor jumps".to_string()),
            verification_type: "manual".to_string(),
        };
        let passed = TestResult {
            id: "T1".to_string(),
            status: TestStatus::Passed,
            note: None,
            ..failed.clone()
        };

        let lines = summary_lines(&[passed, failed], "/tmp/report.json", 125);
        assert!(lines.contains(&"  Passed ..............   1".to_string()));
        assert!(lines.contains(&"  Failed ..............   1".to_string()));
        assert!(lines.contains(&"  T2  Broken".to_string()));
        assert!(lines.contains(&"    Note: \"cursor jumps\"".to_string()));
        assert!(lines.contains(&"  /tmp/report.json".to_string()));
        assert_eq!(lines.last().unwrap(), "Duration: 2m 05s");
    }

    #[test]
    fn test_list_groups_by_category() {
        let tests = vec![
            test_def("id: A\nname: First\npr: 7\n", "Local"),
            test_def("id: B\nname: Second\n", "Local"),
            test_def("id: C\nname: Third\n", "Serial"),
        ];
        let lines = list_lines(&tests);
        assert_eq!(lines.iter().filter(|l| l.trim_start().starts_with('=')).count(), 2);
        assert!(lines.contains(&format!("    {:<15} First  (PR #7)", "A")));
        assert!(lines.contains(&"  Serial".to_string()));
    }
}
