//! Integration tests for the provisioning pipeline using a mock runner.
//!
//! Validates build → generate → insert end-to-end without a node binary
//! by scripting the output of each `key generate` call and recording
//! every invocation.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use keyforge::config::Config;
use keyforge::env::Env;
use keyforge::keys::{ConflictPolicy, ConsumedTokens, KeyGenerator, KeyInserter, NodeBinary};
use keyforge::models::{Password, RoleBinding, Scheme, SecretToken};
use keyforge::orchestrator::{ProvisionError, Provisioner};
use keyforge::process::{CommandRunner, CommandSpec, ProcessError};

/// One recorded invocation.
#[derive(Debug, Clone)]
struct Call {
    command: CommandSpec,
    input: Option<String>,
}

impl Call {
    fn subcommand(&self) -> &str {
        self.command.args.get(1).map(String::as_str).unwrap_or("")
    }

    fn key_type(&self) -> Option<&str> {
        let pos = self.command.args.iter().position(|a| a == "--key-type")?;
        self.command.args.get(pos + 1).map(String::as_str)
    }
}

/// A runner that answers `key generate` from a script and records everything.
#[derive(Default)]
struct MockRunner {
    calls: Mutex<Vec<Call>>,
    generate_outputs: Mutex<VecDeque<String>>,
    fail_build: bool,
    fail_insert_for: Option<String>,
}

impl MockRunner {
    fn with_outputs(outputs: impl IntoIterator<Item = String>) -> Self {
        Self {
            generate_outputs: Mutex::new(outputs.into_iter().collect()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_of(&self, subcommand: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.subcommand() == subcommand)
            .collect()
    }

    fn failure(command: &CommandSpec) -> ProcessError {
        ProcessError::Failed {
            command: command.to_string(),
            status: "exit status: 1".into(),
            stderr: "boom".into(),
        }
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &CommandSpec, input: Option<&str>) -> Result<String, ProcessError> {
        let call = Call {
            command: command.clone(),
            input: input.map(str::to_string),
        };
        self.calls.lock().unwrap().push(call.clone());

        match call.subcommand() {
            "generate" => Ok(self
                .generate_outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default()),
            "insert" => match (&self.fail_insert_for, call.key_type()) {
                (Some(bad), Some(kt)) if bad == kt => Err(Self::failure(command)),
                _ => Ok(String::new()),
            },
            _ if self.fail_build => Err(Self::failure(command)),
            _ => Ok("Finished `release` profile".into()),
        }
    }
}

/// Node output for a freshly generated key.
fn seed_output(token: &str) -> String {
    format!(
        "Secret phrase:       bottom drive obey lake curtain smoke basket hold race lonely fit walk\n  \
         Network ID:        substrate\n  \
         Secret seed:       {token}\n  \
         Public key (hex):  0x46ebddef8cd9bb167dc30878d7113b7e168e6f0646beffd77d69d39bad76b47a"
    )
}

fn fp(token: &str) -> String {
    SecretToken::new(token).unwrap().fingerprint()
}

fn password() -> Password {
    Password::new("correct horse").unwrap()
}

/// Config pointing at a scratch key file, with a build program that
/// resolves without relying on `PATH`.
fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.keys.file = dir.join("keys.txt");
    config.tools.required = vec![];
    let exe = std::env::current_exe().unwrap().to_string_lossy().into_owned();
    config.node.build_command = vec![exe, "build".into(), "--release".into()];
    config
}

const A: &str = "0xaaaa000000000000000000000000000000000000000000000000000000000001";
const B: &str = "0xbbbb000000000000000000000000000000000000000000000000000000000002";
const C: &str = "0xcccc000000000000000000000000000000000000000000000000000000000003";
const D: &str = "0xdddd000000000000000000000000000000000000000000000000000000000004";

fn reference_batch() -> Vec<String> {
    [A, B, C, D].iter().map(|t| seed_output(t)).collect()
}

// ---------------------------------------------------------------------------
// full provisioning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reference_scenario_assigns_each_secret_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keys.rounds = 1;
    let runner = Arc::new(MockRunner::with_outputs(reference_batch()));

    let report = Provisioner::new(runner.clone(), &config, Env::real())
        .provision(&password())
        .await
        .unwrap();

    assert!(report.built);
    let insert = report.rounds[0].insert.as_ref().unwrap();
    let assigned: Vec<(String, String)> = insert
        .inserted
        .iter()
        .map(|k| (k.key_type.to_string(), k.fingerprint.clone()))
        .collect();
    assert_eq!(
        assigned,
        vec![
            ("babe".to_string(), fp(A)),
            ("gran".to_string(), fp(D)),
            ("imon".to_string(), fp(B)),
            ("audi".to_string(), fp(C)),
        ]
    );
    assert!(insert.skipped.is_empty());

    let inserted_roles: Vec<String> = runner
        .calls_of("insert")
        .iter()
        .map(|c| c.key_type().unwrap().to_string())
        .collect();
    assert_eq!(inserted_roles, vec!["babe", "gran", "imon", "audi"]);

    // Secrets only travel on stdin, never in argv.
    for call in runner.calls() {
        assert!(call.command.args.iter().all(|a| !a.starts_with("0x")));
    }
}

#[tokio::test]
async fn call_sequence_is_build_then_generate_then_insert() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keys.rounds = 1;
    let runner = Arc::new(MockRunner::with_outputs(reference_batch()));

    Provisioner::new(runner.clone(), &config, Env::real())
        .provision(&password())
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1 + 4 + 4);
    assert_eq!(calls[0].command.args, vec!["build", "--release"]);
    assert!(calls[0].input.is_none());
    assert!(calls[1..5].iter().all(|c| c.subcommand() == "generate"));
    assert!(calls[5..].iter().all(|c| c.subcommand() == "insert"));

    let schemes: Vec<&str> = calls[1..5].iter().map(|c| c.command.args[3].as_str()).collect();
    assert_eq!(schemes, vec!["sr25519", "sr25519", "sr25519", "ed25519"]);
}

#[tokio::test]
async fn password_is_fed_on_stdin_to_every_key_command() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = Arc::new(MockRunner::with_outputs(
        reference_batch().into_iter().chain(reference_batch()),
    ));

    Provisioner::new(runner.clone(), &config, Env::real())
        .provision(&password())
        .await
        .unwrap();

    for call in runner.calls().iter().filter(|c| c.subcommand() != "--release") {
        assert_eq!(call.input.as_deref(), Some("correct horse\n"), "{:?}", call.command);
        assert!(call.command.args.contains(&"--password-interactive".to_string()));
    }
}

#[tokio::test]
async fn two_rounds_each_insert_their_own_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    assert_eq!(config.keys.rounds, 2);

    let second: [&str; 4] = ["0x01", "0x02", "0x03", "0x04"];
    let runner = Arc::new(MockRunner::with_outputs(
        reference_batch()
            .into_iter()
            .chain(second.iter().map(|t| seed_output(t))),
    ));

    let report = Provisioner::new(runner.clone(), &config, Env::real())
        .provision(&password())
        .await
        .unwrap();

    assert_eq!(report.rounds.len(), 2);
    assert_eq!(report.inserted_count(), 8);
    assert_eq!(runner.calls_of("generate").len(), 8);
    assert_eq!(runner.calls_of("insert").len(), 8);

    let round_two: Vec<String> = report.rounds[1]
        .insert
        .as_ref()
        .unwrap()
        .inserted
        .iter()
        .map(|k| k.fingerprint.clone())
        .collect();
    assert_eq!(round_two, vec![fp("0x01"), fp("0x04"), fp("0x02"), fp("0x03")]);

    // Only the latest batch survives in the hand-off file.
    let content = std::fs::read_to_string(&config.keys.file).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(!content.contains(A));
    assert!(content.contains("0x04"));
}

#[tokio::test]
async fn build_failure_stops_before_any_key_command() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = Arc::new(MockRunner {
        fail_build: true,
        ..MockRunner::with_outputs(reference_batch())
    });

    let err = Provisioner::new(runner.clone(), &config, Env::real())
        .provision(&password())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Process(ProcessError::Failed { .. })));
    assert_eq!(runner.calls().len(), 1);
    assert!(runner.calls_of("generate").is_empty());
    assert!(runner.calls_of("insert").is_empty());
    assert!(!config.keys.file.exists());
}

#[tokio::test]
async fn missing_tool_stops_before_any_command() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.tools.required = vec!["keyforge-definitely-not-installed".into()];
    let runner = Arc::new(MockRunner::with_outputs(reference_batch()));

    let err = Provisioner::new(runner.clone(), &config, Env::real())
        .provision(&password())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Process(ProcessError::MissingTool(_))));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn skip_build_goes_straight_to_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keys.rounds = 1;
    config.node.build_command = vec!["keyforge-definitely-not-installed".into()];
    let runner = Arc::new(MockRunner::with_outputs(reference_batch()));

    let provisioner = Provisioner::new(runner.clone(), &config, Env::real()).skip_build(true);
    assert!(provisioner.required_tools().is_empty());
    let report = provisioner.provision(&password()).await.unwrap();

    assert!(!report.built);
    assert_eq!(runner.calls()[0].subcommand(), "generate");
}

#[tokio::test]
async fn working_dir_anchors_node_binary_and_key_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keys.rounds = 1;
    config.keys.file = "keys.txt".into();
    config.node.working_dir = Some(dir.path().to_path_buf());
    let runner = Arc::new(MockRunner::with_outputs(reference_batch()));

    let provisioner = Provisioner::new(runner.clone(), &config, Env::real()).skip_build(true);
    assert_eq!(provisioner.key_file(), dir.path().join("keys.txt"));
    provisioner.provision(&password()).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("keys.txt")).unwrap().lines().count(),
        4
    );
    let expected = dir.path().join("target/release/argochain");
    for call in runner.calls() {
        assert_eq!(Path::new(&call.command.program), expected);
    }
}

#[tokio::test]
async fn quiet_provision_reports_the_same_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keys.rounds = 1;
    let runner = Arc::new(MockRunner::with_outputs([
        seed_output(A),
        "no seed here".to_string(),
        seed_output(C),
        seed_output(D),
    ]));

    let report = Provisioner::new(runner.clone(), &config, Env::real())
        .quiet(true)
        .provision(&password())
        .await
        .unwrap();

    let round = &report.rounds[0];
    assert_eq!(round.generate.as_ref().unwrap().skipped, vec![Scheme::Sr25519]);
    assert_eq!(report.inserted_count(), 3);
    assert_eq!(report.skipped_count(), 2);
}

#[tokio::test]
async fn insert_failure_aborts_remaining_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keys.rounds = 1;
    let runner = Arc::new(MockRunner {
        fail_insert_for: Some("gran".into()),
        ..MockRunner::with_outputs(reference_batch())
    });

    let err = Provisioner::new(runner.clone(), &config, Env::real())
        .provision(&password())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("--key-type gran"));
    let roles: Vec<String> = runner
        .calls_of("insert")
        .iter()
        .map(|c| c.key_type().unwrap().to_string())
        .collect();
    assert_eq!(roles, vec!["babe", "gran"]);
}

#[tokio::test]
async fn rerunning_provision_starts_from_a_clean_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keys.rounds = 1;

    for _ in 0..2 {
        let runner = Arc::new(MockRunner::with_outputs(reference_batch()));
        let report = Provisioner::new(runner, &config, Env::real())
            .provision(&password())
            .await
            .unwrap();
        assert_eq!(report.inserted_count(), 4);
    }
    let content = std::fs::read_to_string(&config.keys.file).unwrap();
    assert_eq!(content.lines().count(), 4);
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_skips_output_without_secret_seed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.txt");
    let node = NodeBinary::new("node");
    let runner = MockRunner::with_outputs([
        seed_output(A),
        "Error: keystore locked\nPublic key (hex): 0xabc".to_string(),
        seed_output(C),
    ]);

    let report = KeyGenerator::new(&runner, &node)
        .generate(&password(), &path, &[Scheme::Sr25519, Scheme::Ed25519, Scheme::Sr25519])
        .await
        .unwrap();

    assert_eq!(report.skipped, vec![Scheme::Ed25519]);
    assert_eq!(report.generated.len(), 2);
    let lines: Vec<String> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(
        lines,
        vec![
            format!("sr25519: Secret seed:       {A}"),
            format!("sr25519: Secret seed:       {C}"),
        ]
    );
}

#[tokio::test]
async fn generate_lines_follow_scheme_order() {
    let orders: [&[Scheme]; 4] = [
        &[Scheme::Ed25519],
        &[Scheme::Ed25519, Scheme::Sr25519],
        &[Scheme::Sr25519, Scheme::Ecdsa, Scheme::Ed25519],
        &[Scheme::Ecdsa, Scheme::Ecdsa, Scheme::Sr25519, Scheme::Ed25519],
    ];
    for schemes in orders {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        let node = NodeBinary::new("node");
        let runner = MockRunner::with_outputs(
            (0..schemes.len()).map(|i| seed_output(&format!("0x{i:064x}"))),
        );

        KeyGenerator::new(&runner, &node)
            .generate(&password(), &path, schemes)
            .await
            .unwrap();

        let prefixes: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| l.split(':').next().unwrap().to_string())
            .collect();
        let expected: Vec<String> = schemes.iter().map(|s| s.to_string()).collect();
        assert_eq!(prefixes, expected);
    }
}

#[tokio::test]
async fn generate_failure_is_fatal() {
    struct FailingRunner;

    #[async_trait]
    impl CommandRunner for FailingRunner {
        async fn run(&self, command: &CommandSpec, _input: Option<&str>) -> Result<String, ProcessError> {
            Err(MockRunner::failure(command))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let node = NodeBinary::new("node");
    let result = KeyGenerator::new(&FailingRunner, &node)
        .generate(&password(), &dir.path().join("keys.txt"), &[Scheme::Sr25519])
        .await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// insert
// ---------------------------------------------------------------------------

fn key_lines(entries: &[(Scheme, &str)]) -> Vec<String> {
    entries
        .iter()
        .map(|(scheme, token)| format!("{scheme}: Secret seed: {token}"))
        .collect()
}

fn binding(scheme: Scheme, role: &str) -> RoleBinding {
    RoleBinding::new(scheme, role.parse().unwrap())
}

#[tokio::test]
async fn insert_with_empty_file_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.txt");
    std::fs::write(&path, "").unwrap();
    let node = NodeBinary::new("node");
    let runner = MockRunner::default();

    let report = KeyInserter::new(&runner, &node)
        .insert(&password(), &path, &keyforge::models::default_bindings())
        .await
        .unwrap();

    assert!(report.inserted.is_empty());
    assert_eq!(report.skipped.len(), 4);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn insert_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let node = NodeBinary::new("node");
    let runner = MockRunner::default();
    let result = KeyInserter::new(&runner, &node)
        .insert(&password(), &dir.path().join("absent.txt"), &keyforge::models::default_bindings())
        .await;
    assert!(result.is_err());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn first_match_only_leaves_later_bindings_empty() {
    let node = NodeBinary::new("node");
    let runner = MockRunner::default();
    let lines = key_lines(&[
        (Scheme::Sr25519, A),
        (Scheme::Sr25519, B),
        (Scheme::Sr25519, C),
        (Scheme::Ed25519, D),
    ]);

    let (report, consumed) = KeyInserter::new(&runner, &node)
        .with_policy(ConflictPolicy::FirstMatchOnly)
        .insert_lines(
            &password(),
            &lines,
            &keyforge::models::default_bindings(),
            ConsumedTokens::default(),
        )
        .await
        .unwrap();

    let roles: Vec<String> = report.inserted.iter().map(|k| k.key_type.to_string()).collect();
    assert_eq!(roles, vec!["babe", "gran"]);
    let skipped: Vec<String> = report.skipped.iter().map(|b| b.key_type.to_string()).collect();
    assert_eq!(skipped, vec!["imon", "audi"]);
    assert_eq!(consumed.len(), 2);
}

#[tokio::test]
async fn consumed_set_carries_across_calls() {
    let node = NodeBinary::new("node");
    let runner = MockRunner::default();
    let lines = key_lines(&[(Scheme::Sr25519, A), (Scheme::Sr25519, B)]);
    let inserter = KeyInserter::new(&runner, &node);

    let (_, consumed) = inserter
        .insert_lines(&password(), &lines, &[binding(Scheme::Sr25519, "babe")], ConsumedTokens::default())
        .await
        .unwrap();
    let (report, consumed) = inserter
        .insert_lines(&password(), &lines, &[binding(Scheme::Sr25519, "aura")], consumed)
        .await
        .unwrap();

    assert_eq!(report.inserted[0].fingerprint, fp(B));
    let order: Vec<String> = consumed.iter().map(|t| t.fingerprint()).collect();
    assert_eq!(order, vec![fp(A), fp(B)]);
}

#[tokio::test]
async fn no_token_is_inserted_twice() {
    let node = NodeBinary::new("node");
    let tables: Vec<Vec<RoleBinding>> = vec![
        keyforge::models::default_bindings(),
        vec![
            binding(Scheme::Sr25519, "audi"),
            binding(Scheme::Sr25519, "imon"),
            binding(Scheme::Sr25519, "babe"),
            binding(Scheme::Sr25519, "aura"),
            binding(Scheme::Ed25519, "gran"),
            binding(Scheme::Ed25519, "beef"),
        ],
        vec![binding(Scheme::Ecdsa, "beef"), binding(Scheme::Sr25519, "babe")],
    ];
    let contents = [
        key_lines(&[(Scheme::Sr25519, A), (Scheme::Sr25519, B), (Scheme::Ed25519, D)]),
        key_lines(&[(Scheme::Sr25519, A), (Scheme::Sr25519, A), (Scheme::Sr25519, C)]),
        key_lines(&[(Scheme::Ed25519, D), (Scheme::Ed25519, D)]),
        vec!["garbage".to_string(), "sr25519: no token here".to_string()],
    ];

    for bindings in &tables {
        for lines in &contents {
            for policy in [ConflictPolicy::Advance, ConflictPolicy::FirstMatchOnly] {
                let runner = MockRunner::default();
                let (report, consumed) = KeyInserter::new(&runner, &node)
                    .with_policy(policy)
                    .insert_lines(&password(), lines, bindings, ConsumedTokens::default())
                    .await
                    .unwrap();

                let mut fingerprints: Vec<&String> =
                    report.inserted.iter().map(|k| &k.fingerprint).collect();
                let total = fingerprints.len();
                fingerprints.sort();
                fingerprints.dedup();
                assert_eq!(fingerprints.len(), total, "{policy:?} reused a token");
                assert_eq!(consumed.len(), total);
                assert_eq!(report.inserted.len() + report.skipped.len(), bindings.len());
                assert_eq!(runner.calls().len(), total);
            }
        }
    }
}
