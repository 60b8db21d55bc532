//! End-to-end tests of the `cloudvault` binary.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSPHRASE: &str = "correct horse battery";

#[allow(deprecated)]
fn cloudvault() -> Command {
    let mut cmd = Command::cargo_bin("cloudvault").unwrap();
    cmd.env_remove("CLOUDVAULT_VAULT")
        .env_remove("CLOUDVAULT_PASSPHRASE")
        .env_remove("CLOUDVAULT_LOG");
    cmd
}

/// A project directory configured for fast PBKDF2 unlocking.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("cloudvault.toml")
        .write_str("kdf_algorithm = \"pbkdf2\"\npbkdf2_iterations = 1000\n")
        .unwrap();
    dir
}

fn in_project(dir: &TempDir) -> Command {
    let mut cmd = cloudvault();
    cmd.arg("--project-dir")
        .arg(dir.path())
        .env("CLOUDVAULT_PASSPHRASE", PASSPHRASE);
    cmd
}

// ---------------------------------------------------------------------------
// Argument handling
// ---------------------------------------------------------------------------

#[test]
fn help_lists_commands() {
    cloudvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("End-to-end encrypted secrets vault"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("derive-key"))
        .stdout(predicate::str::contains("benchmark"));
}

#[test]
fn version_flag_prints_version() {
    cloudvault()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn no_arguments_prints_usage() {
    cloudvault()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn completions_for_bash() {
    cloudvault()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cloudvault"));
}

#[test]
fn commands_needing_a_vault_fail_without_one() {
    let dir = project();
    in_project(&dir)
        .args(["show", "some-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no vault selected"));
}

#[test]
fn invalid_vault_id_is_rejected() {
    let dir = project();
    in_project(&dir)
        .args(["--vault", "../escape", "verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid object key"));
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derive_key_matches_known_pbkdf2_vector() {
    let dir = TempDir::new().unwrap();
    dir.child("cloudvault.toml")
        .write_str("kdf_algorithm = \"pbkdf2\"\n")
        .unwrap();

    cloudvault()
        .arg("--project-dir")
        .arg(dir.path())
        .env("CLOUDVAULT_PASSPHRASE", "password123")
        .args(["derive-key", "--salt", "AAAAAAAAAAAAAAAAAAAAAA=="])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "pHCLgS6uUD+4G7ikp7J1m4DtHEueBLt1y5CH8ZK5NF8=",
        ));
}

#[test]
fn broken_config_is_reported() {
    let dir = TempDir::new().unwrap();
    dir.child("cloudvault.toml")
        .write_str("compression_level = 42\n")
        .unwrap();

    in_project(&dir)
        .args(["derive-key", "--salt", "AAAAAAAAAAAAAAAAAAAAAA=="])
        .assert()
        .failure()
        .stderr(predicate::str::contains("compression_level"));
}

#[test]
fn quick_benchmark_prints_every_algorithm() {
    cloudvault()
        .args(["benchmark", "--quick", "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pbkdf2"))
        .stdout(predicate::str::contains("argon2id"));
}

// ---------------------------------------------------------------------------
// Vault lifecycle
// ---------------------------------------------------------------------------

#[test]
fn init_add_list_show_delete_flow() {
    let dir = project();

    in_project(&dir)
        .args(["--vault", "team", "init", "Team", "-d", "shared logins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vault 'Team' created with id team"));
    dir.child(".cloudvault/store/identities/local/vaults/team.vault")
        .assert(predicate::path::exists());
    dir.child(".cloudvault/cache/metadata.json")
        .assert(predicate::path::exists());

    // A second init with the same id must not overwrite the vault.
    in_project(&dir)
        .args(["--vault", "team", "init", "Other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let added = in_project(&dir)
        .args([
            "--vault",
            "team",
            "add",
            "github",
            "-f",
            "url=https://github.com",
            "-f",
            "username=octo",
            "-f",
            "password=hunter22",
            "--tags",
            "dev,ci",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added web secret 'github'"));
    let stdout = String::from_utf8(added.get_output().stdout.clone()).unwrap();
    let id = stdout
        .split_whitespace()
        .last()
        .expect("add prints the new id")
        .to_string();

    in_project(&dir)
        .args(["--vault", "team", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("github"));

    in_project(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Team"));

    in_project(&dir)
        .args(["--vault", "team", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("octo"))
        .stdout(predicate::str::contains("hunter22").not());

    in_project(&dir)
        .args(["--vault", "team", "show", &id, "--reveal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter22"));

    in_project(&dir)
        .args(["--vault", "team", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consistent"));

    in_project(&dir)
        .args(["--vault", "team", "delete", &id, "--force"])
        .assert()
        .success();

    in_project(&dir)
        .args(["--vault", "team", "show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn wrong_passphrase_cannot_open_vault() {
    let dir = project();
    in_project(&dir)
        .args(["--vault", "locked", "init", "Locked"])
        .assert()
        .success();

    in_project(&dir)
        .env("CLOUDVAULT_PASSPHRASE", "not the passphrase")
        .args(["--vault", "locked", "verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tampered"));
}

#[test]
fn add_rejects_fields_the_type_does_not_have() {
    let dir = project();
    in_project(&dir)
        .args(["--vault", "v1", "init", "V1"])
        .assert()
        .success();

    in_project(&dir)
        .args(["--vault", "v1", "add", "bad", "-t", "note", "-f", "colour=blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"));
}

#[test]
fn short_passphrase_is_refused_on_init() {
    let dir = project();
    in_project(&dir)
        .env("CLOUDVAULT_PASSPHRASE", "short")
        .args(["--vault", "v2", "init", "V2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));
}

#[test]
fn passphrase_length_counts_characters_not_bytes() {
    let dir = project();
    // Seven characters, nine UTF-8 bytes.
    in_project(&dir)
        .env("CLOUDVAULT_PASSPHRASE", "pässwör")
        .args(["--vault", "v3", "init", "V3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));

    in_project(&dir)
        .env("CLOUDVAULT_PASSPHRASE", "pässwörd")
        .args(["--vault", "v3", "init", "V3"])
        .assert()
        .success();
}
