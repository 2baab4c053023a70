//! Session runner
//!
//! Walks the filtered catalog one test at a time: bring up prerequisites,
//! present the card, collect a verdict, persist the report. Quitting (or an
//! interrupt, which arrives as closed input) marks the current test and
//! every later test not already completed `not_run`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::catalog::{Capability, TestDefinition};
use crate::common::utc_now_rfc3339;
use crate::infra::Provisioner;
use crate::report::{
    build_report, Environment, ReportStore, TestResult, TestStatus, RESUMED_NOTE, RESUMED_TYPE,
};
use crate::verify::{all_passed, run_verification, VerifyOptions};

use super::display::{print_card, print_checks, KEY_MENU};
use super::prompt::{Operator, Reply};

const VERDICT_PROMPT: &str = "\n> ";
const CONFIRM_PROMPT: &str = "  > ";
const NOTE_PROMPT: &str = "  Enter note: ";
const FAILURE_NOTE_PROMPT: &str = "  Failure note (optional): ";

/// What the operator decided for one test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Pass,
    Fail,
    Skip,
    Quit,
}

impl Decision {
    fn parse(input: &str) -> Option<Self> {
        match input {
            "p" => Some(Decision::Pass),
            "f" => Some(Decision::Fail),
            "s" => Some(Decision::Skip),
            "q" => Some(Decision::Quit),
            _ => None,
        }
    }

    fn status(self) -> TestStatus {
        match self {
            Decision::Pass => TestStatus::Passed,
            Decision::Fail => TestStatus::Failed,
            Decision::Skip => TestStatus::Skipped,
            Decision::Quit => TestStatus::NotRun,
        }
    }
}

/// Merge the automated confirmation with the manual one that follows it
///
/// Quit beats everything, then a failure on either side, then a manual skip.
fn combine(automated: Option<Decision>, manual: Decision) -> Decision {
    match (automated, manual) {
        (_, Decision::Quit) => Decision::Quit,
        (Some(Decision::Fail), _) | (_, Decision::Fail) => Decision::Fail,
        (_, Decision::Skip) => Decision::Skip,
        _ => Decision::Pass,
    }
}

/// Result of a whole session
#[derive(Debug)]
pub struct SessionOutcome {
    /// One entry per test, in catalog order
    pub results: Vec<TestResult>,
    /// Final report, if it could be written
    pub report_path: Option<PathBuf>,
    pub duration_seconds: u64,
    /// The operator quit (or the session was interrupted) before the end
    pub quit: bool,
}

impl SessionOutcome {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == TestStatus::Failed)
    }
}

/// Drives one guided session
pub struct SessionRunner<'a, P: Provisioner, O: Operator> {
    provisioner: &'a mut P,
    operator: &'a mut O,
    store: ReportStore,
    environment: Environment,
    started_at: DateTime<Utc>,
    resume: HashSet<String>,
    verify: VerifyOptions,
    docker_requested: bool,
}

impl<'a, P: Provisioner, O: Operator> SessionRunner<'a, P, O> {
    pub fn new(
        provisioner: &'a mut P,
        operator: &'a mut O,
        store: ReportStore,
        environment: Environment,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provisioner,
            operator,
            store,
            environment,
            started_at,
            resume: HashSet::new(),
            verify: VerifyOptions::default(),
            docker_requested: false,
        }
    }

    /// Ids completed by a previous session; they are recorded as skipped
    pub fn with_resume(mut self, ids: HashSet<String>) -> Self {
        self.resume = ids;
        self
    }

    pub fn with_verify_options(mut self, verify: VerifyOptions) -> Self {
        self.verify = verify;
        self
    }

    /// Run every test in order and write the final report
    pub async fn run(mut self, tests: &[TestDefinition]) -> SessionOutcome {
        let total = tests.len();
        let mut results: Vec<TestResult> = Vec::with_capacity(total);
        let mut quit_at = None;

        for (index, test) in tests.iter().enumerate() {
            if self.resume.contains(&test.id) {
                tracing::debug!(id = %test.id, "Already completed, skipping");
                results.push(resumed_result(test));
                continue;
            }

            self.prepare(test).await;

            let started = Instant::now();
            print_card(test, index + 1, total);
            let (decision, note) = self.collect_verdict(test).await;
            results.push(record(test, decision.status(), started, note));

            if decision == Decision::Quit {
                quit_at = Some(index);
                break;
            }
            self.persist(&results);
        }

        let quit = quit_at.is_some();
        if let Some(index) = quit_at {
            for test in &tests[index + 1..] {
                results.push(if self.resume.contains(&test.id) {
                    resumed_result(test)
                } else {
                    not_run_result(test)
                });
            }
        }

        let completed_at = Utc::now();
        let report = build_report(&results, &self.environment, self.started_at, completed_at);
        let report_path = match self.store.save(&report) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        };

        SessionOutcome {
            duration_seconds: report.session.duration_seconds,
            results,
            report_path,
            quit,
        }
    }

    /// Start whatever the test's prerequisites ask for
    ///
    /// A failed start is only a warning; the operator decides whether the
    /// test can still be judged.
    async fn prepare(&mut self, test: &TestDefinition) {
        for capability in test.required_capabilities() {
            let ready = match capability {
                Capability::Docker => {
                    if self.docker_requested {
                        continue;
                    }
                    self.docker_requested = true;
                    self.provisioner.start_containers().await
                }
                Capability::Serial => self.provisioner.start_serial().await,
            };
            if !ready {
                tracing::warn!("{} prerequisite for {} is not available", capability, test.id);
            }
        }
    }

    /// Save a snapshot of the results so far
    fn persist(&self, results: &[TestResult]) {
        let report = build_report(results, &self.environment, self.started_at, Utc::now());
        if let Err(e) = self.store.save(&report) {
            tracing::warn!("{}", e);
        }
    }

    async fn ask(&mut self, prompt: &str) -> Option<String> {
        match self.operator.ask(prompt).await {
            Reply::Line(line) => Some(line),
            Reply::Closed => None,
        }
    }

    async fn collect_verdict(&mut self, test: &TestDefinition) -> (Decision, Option<String>) {
        let mut note = None;
        loop {
            let Some(input) = self.ask(VERDICT_PROMPT).await else {
                return (Decision::Quit, note);
            };

            match input.to_lowercase().as_str() {
                "n" => {
                    if let Some(text) = self.ask(NOTE_PROMPT).await.filter(|t| !t.is_empty()) {
                        println!("  Note recorded: \"{}\"", text);
                        note = Some(text);
                    }
                }
                "" if test.verification.is_automated() => {
                    if let Some(decision) = self.run_checks(test, &mut note).await {
                        return (decision, note);
                    }
                }
                "" => println!("  {}", KEY_MENU),
                choice => match Decision::parse(choice) {
                    Some(Decision::Fail) => {
                        self.failure_note(&mut note).await;
                        return (Decision::Fail, note);
                    }
                    Some(decision) => return (decision, note),
                    None => println!("  Unknown input. {}", KEY_MENU),
                },
            }
        }
    }

    /// Run the automated checks and the confirmations that follow them
    ///
    /// `None` sends the operator back to the main prompt.
    async fn run_checks(&mut self, test: &TestDefinition, note: &mut Option<String>) -> Option<Decision> {
        let checks = run_verification(&test.verification, &self.verify).await;
        let manual_prompt = test.verification.manual_prompt();

        let automated = if checks.is_empty() {
            if manual_prompt.is_none() {
                println!("  No automated checks. [p]ass / [f]ail / [s]kip");
                return None;
            }
            None
        } else {
            print_checks(&checks);
            let decision = if all_passed(&checks) {
                println!("  All checks passed. Press Enter to mark as pass, or [f]ail / [s]kip");
                self.confirm(Decision::Pass, note).await
            } else {
                println!("  Some checks failed. [p]ass anyway / [f]ail / [s]kip");
                self.confirm(Decision::Fail, note).await
            };
            Some(decision)
        };

        match (automated, manual_prompt) {
            (Some(decision @ (Decision::Skip | Decision::Quit)), _) => Some(decision),
            (Some(decision), None) => Some(decision),
            (_, Some(prompt)) => {
                println!("\n  {} [p]ass / [f]ail / [s]kip", prompt);
                let manual = self.confirm(Decision::Pass, note).await;
                Some(combine(automated, manual))
            }
            (None, None) => None,
        }
    }

    /// Ask until the answer is one of Enter (`default`), p, f, s or q
    async fn confirm(&mut self, default: Decision, note: &mut Option<String>) -> Decision {
        loop {
            let Some(input) = self.ask(CONFIRM_PROMPT).await else {
                return Decision::Quit;
            };

            let input = input.to_lowercase();
            let decision = if input.is_empty() {
                Some(default)
            } else {
                Decision::parse(&input)
            };

            match decision {
                Some(Decision::Fail) => {
                    self.failure_note(note).await;
                    return Decision::Fail;
                }
                Some(decision) => return decision,
                None => println!("  Unknown input. Press Enter for the default, or [p]ass / [f]ail / [s]kip / [q]uit"),
            }
        }
    }

    async fn failure_note(&mut self, note: &mut Option<String>) {
        if let Some(text) = self.ask(FAILURE_NOTE_PROMPT).await.filter(|t| !t.is_empty()) {
            *note = Some(text);
        }
    }
}

fn record(test: &TestDefinition, status: TestStatus, started: Instant, note: Option<String>) -> TestResult {
    TestResult {
        id: test.id.clone(),
        name: test.name.clone(),
        category: test.category.clone(),
        status,
        timestamp: utc_now_rfc3339(),
        duration_seconds: started.elapsed().as_secs(),
        note,
        verification_type: test.verification.type_tag().to_string(),
    }
}

fn resumed_result(test: &TestDefinition) -> TestResult {
    TestResult {
        id: test.id.clone(),
        name: test.name.clone(),
        category: test.category.clone(),
        status: TestStatus::Skipped,
        timestamp: utc_now_rfc3339(),
        duration_seconds: 0,
        note: Some(RESUMED_NOTE.to_string()),
        verification_type: RESUMED_TYPE.to_string(),
    }
}

fn not_run_result(test: &TestDefinition) -> TestResult {
    TestResult {
        id: test.id.clone(),
        name: test.name.clone(),
        category: test.category.clone(),
        status: TestStatus::NotRun,
        timestamp: utc_now_rfc3339(),
        duration_seconds: 0,
        note: None,
        verification_type: test.verification.type_tag().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{load_resume_ids, Report};
    use crate::session::prompt::ScriptedOperator;
    use async_trait::async_trait;
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct FakeInfra {
        docker_calls: usize,
        serial_calls: usize,
        available: bool,
    }

    #[async_trait]
    impl Provisioner for FakeInfra {
        async fn start_containers(&mut self) -> bool {
            self.docker_calls += 1;
            self.available
        }

        async fn start_serial(&mut self) -> bool {
            self.serial_calls += 1;
            self.available
        }
    }

    fn environment() -> Environment {
        Environment {
            platform: "linux".to_string(),
            arch: "x86_64".to_string(),
            os_version: "Linux".to_string(),
            docker_available: false,
            serial_available: false,
        }
    }

    fn test_def(yaml: &str) -> TestDefinition {
        let mut test: TestDefinition = serde_yaml::from_str(yaml).unwrap();
        test.category = "local".to_string();
        test.display_name = "Local".to_string();
        test
    }

    fn manual(id: &str) -> TestDefinition {
        test_def(&format!("id: {id}\nname: Test {id}\n"))
    }

    struct Harness {
        infra: FakeInfra,
        operator: ScriptedOperator,
        dir: TempDir,
    }

    impl Harness {
        fn new(answers: &[&str]) -> Self {
            Self {
                infra: FakeInfra::default(),
                operator: ScriptedOperator::new(answers),
                dir: tempdir().unwrap(),
            }
        }

        async fn run(&mut self, tests: &[TestDefinition], resume: HashSet<String>) -> SessionOutcome {
            let store = ReportStore::new(self.dir.path(), Utc::now(), &environment());
            SessionRunner::new(
                &mut self.infra,
                &mut self.operator,
                store,
                environment(),
                Utc::now(),
            )
            .with_resume(resume)
            .run(tests)
            .await
        }
    }

    fn statuses(outcome: &SessionOutcome) -> Vec<TestStatus> {
        outcome.results.iter().map(|r| r.status).collect()
    }

    #[tokio::test]
    async fn test_verdicts_recorded_in_order() {
        let mut h = Harness::new(&["p", "f", "broken", "s"]);
        let tests = vec![manual("A"), manual("B"), manual("C")];
        let outcome = h.run(&tests, HashSet::new()).await;

        assert_eq!(
            statuses(&outcome),
            vec![TestStatus::Passed, TestStatus::Failed, TestStatus::Skipped]
        );
        assert_eq!(outcome.results[1].note.as_deref(), Some("broken"));
        assert!(outcome.has_failures());
        assert!(!outcome.quit);

        let path = outcome.report_path.unwrap();
        let report: Report = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.failed, 1);
    }

    #[tokio::test]
    async fn test_quit_marks_current_and_remaining_not_run() {
        let mut h = Harness::new(&["p", "n", "flaky cursor", "q"]);
        let tests = vec![manual("A"), manual("B"), manual("C"), manual("D")];
        let outcome = h.run(&tests, HashSet::new()).await;

        assert!(outcome.quit);
        assert_eq!(
            statuses(&outcome),
            vec![
                TestStatus::Passed,
                TestStatus::NotRun,
                TestStatus::NotRun,
                TestStatus::NotRun
            ]
        );
        assert_eq!(outcome.results[1].note.as_deref(), Some("flaky cursor"));
        for result in &outcome.results[2..] {
            assert_eq!(result.note, None);
            assert_eq!(result.duration_seconds, 0);
        }
        let ids: Vec<_> = outcome.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
        assert!(!outcome.has_failures());
        assert_eq!(h.operator.remaining(), 0);
    }

    #[tokio::test]
    async fn test_closed_input_behaves_like_quit() {
        let mut h = Harness::new(&[]);
        let outcome = h.run(&[manual("A"), manual("B")], HashSet::new()).await;
        assert!(outcome.quit);
        assert_eq!(statuses(&outcome), vec![TestStatus::NotRun, TestStatus::NotRun]);
        assert!(outcome.report_path.is_some());
    }

    #[tokio::test]
    async fn test_resumed_tests_are_not_presented() {
        let mut h = Harness::new(&["p"]);
        let tests = vec![manual("A"), manual("B"), manual("C")];
        let resume: HashSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        let outcome = h.run(&tests, resume).await;

        assert_eq!(
            statuses(&outcome),
            vec![TestStatus::Skipped, TestStatus::Skipped, TestStatus::Passed]
        );
        for result in &outcome.results[..2] {
            assert_eq!(result.note.as_deref(), Some(RESUMED_NOTE));
            assert_eq!(result.verification_type, RESUMED_TYPE);
            assert_eq!(result.duration_seconds, 0);
        }
        assert_eq!(h.operator.prompts.len(), 1);

        // the new report resumes the same way
        let ids = load_resume_ids(&outcome.report_path.unwrap());
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_prerequisites_started_lazily() {
        let docker = "id: D{n}\nname: docker\nprerequisites:\n  - docker: true\n";
        let serial = "id: S{n}\nname: serial\nprerequisites:\n  - serial: true\n";
        let tests = vec![
            manual("M"),
            test_def(&docker.replace("{n}", "1")),
            test_def(&serial.replace("{n}", "1")),
            test_def(&docker.replace("{n}", "2")),
            test_def(&serial.replace("{n}", "2")),
        ];

        let mut h = Harness::new(&["p", "p", "p", "p", "p"]);
        let outcome = h.run(&tests, HashSet::new()).await;

        // unavailable infrastructure never blocks a test
        assert!(statuses(&outcome).iter().all(|s| *s == TestStatus::Passed));
        assert_eq!(h.infra.docker_calls, 1);
        assert_eq!(h.infra.serial_calls, 2);
    }

    #[tokio::test]
    async fn test_manual_enter_and_unknown_input_reprompt() {
        let mut h = Harness::new(&["", "zz", "P"]);
        let outcome = h.run(&[manual("A")], HashSet::new()).await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Passed]);
        assert_eq!(h.operator.prompts, vec![VERDICT_PROMPT; 3]);
    }

    fn file_check(path: &std::path::Path) -> TestDefinition {
        test_def(&format!(
            "id: F\nname: file\nverification:\n  type: file_exists\n  path: {}\n",
            path.display()
        ))
    }

    fn combined(path: &std::path::Path) -> TestDefinition {
        test_def(&format!(
            r#"id: C
name: combined
verification:
  type: combined
  automated:
    - type: file_exists
      path: {}
  manual_prompt: Tab title updated?
"#,
            path.display()
        ))
    }

    #[tokio::test]
    async fn test_automated_pass_confirmed_with_enter() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("present");
        std::fs::write(&file, "").unwrap();

        let mut h = Harness::new(&["", ""]);
        let outcome = h.run(&[file_check(&file)], HashSet::new()).await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Passed]);
        assert_eq!(outcome.results[0].verification_type, "file_exists");
    }

    #[tokio::test]
    async fn test_automated_failure_defaults_to_fail() {
        let dir = tempdir().unwrap();
        let mut h = Harness::new(&["", "", "file never written"]);
        let outcome = h
            .run(&[file_check(&dir.path().join("missing"))], HashSet::new())
            .await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Failed]);
        assert_eq!(outcome.results[0].note.as_deref(), Some("file never written"));
        assert_eq!(h.operator.prompts[2], FAILURE_NOTE_PROMPT);
    }

    #[tokio::test]
    async fn test_invalid_confirmation_reprompts() {
        let dir = tempdir().unwrap();
        let mut h = Harness::new(&["", "x", "p"]);
        let outcome = h
            .run(&[file_check(&dir.path().join("missing"))], HashSet::new())
            .await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Passed]);
        assert_eq!(h.operator.prompts[1..], [CONFIRM_PROMPT, CONFIRM_PROMPT]);
    }

    #[tokio::test]
    async fn test_combined_needs_both_steps() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("present");
        std::fs::write(&file, "").unwrap();

        let mut h = Harness::new(&["", "", ""]);
        let outcome = h.run(&[combined(&file)], HashSet::new()).await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Passed]);
        assert_eq!(outcome.results[0].verification_type, "combined");

        let mut h = Harness::new(&["", "", "f", "title stale"]);
        let outcome = h.run(&[combined(&file)], HashSet::new()).await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Failed]);
        assert_eq!(outcome.results[0].note.as_deref(), Some("title stale"));

        // automated failure waved through, manual confirmed
        let missing = dir.path().join("missing");
        let mut h = Harness::new(&["", "p", ""]);
        let outcome = h.run(&[combined(&missing)], HashSet::new()).await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Passed]);

        // automated failure confirmed, manual pass cannot rescue it
        let mut h = Harness::new(&["", "f", "", ""]);
        let outcome = h.run(&[combined(&missing)], HashSet::new()).await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Failed]);
    }

    #[tokio::test]
    async fn test_combined_skip_stops_before_manual_prompt() {
        let dir = tempdir().unwrap();
        let mut h = Harness::new(&["", "s", "p"]);
        let outcome = h
            .run(&[combined(&dir.path().join("missing"))], HashSet::new())
            .await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Skipped]);
        assert_eq!(h.operator.remaining(), 1);
    }

    #[tokio::test]
    async fn test_combined_without_automated_checks() {
        let test = test_def(
            "id: E\nname: empty\nverification:\n  type: combined\n  automated: []\n",
        );
        let mut h = Harness::new(&["", "f", ""]);
        let outcome = h.run(&[test], HashSet::new()).await;
        assert_eq!(statuses(&outcome), vec![TestStatus::Failed]);
        assert_eq!(outcome.results[0].note, None);
        assert_eq!(h.operator.prompts, vec![VERDICT_PROMPT, CONFIRM_PROMPT, FAILURE_NOTE_PROMPT]);
    }

    #[test]
    fn test_combine_precedence() {
        use Decision::*;
        assert_eq!(combine(Some(Pass), Pass), Pass);
        assert_eq!(combine(None, Pass), Pass);
        assert_eq!(combine(Some(Fail), Pass), Fail);
        assert_eq!(combine(Some(Pass), Fail), Fail);
        assert_eq!(combine(Some(Fail), Skip), Fail);
        assert_eq!(combine(Some(Pass), Skip), Skip);
        assert_eq!(combine(Some(Fail), Quit), Quit);
    }
}
