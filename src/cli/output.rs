//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::kdf::BenchmarkResult;
use crate::vault::{IndexEntry, Secret, VaultMetadata, VerifyResults};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Print cached vaults (Id, Name, Secrets, Description).
pub fn print_vaults_table(vaults: &[&VaultMetadata]) {
    if vaults.is_empty() {
        info("No vaults known on this machine yet.");
        tip("Run `cloudvault init <NAME>` to create one.");
        return;
    }

    let mut t = table(vec!["Id", "Name", "Secrets", "Description"]);
    for v in vaults {
        t.add_row(vec![
            v.id.clone(),
            v.name.clone(),
            v.index.len().to_string(),
            v.description.clone(),
        ]);
    }
    println!("{t}");
}

/// Print index entries (Id, Name, Tags, Description).
pub fn print_index_table(entries: &[&IndexEntry]) {
    if entries.is_empty() {
        info("No secrets to show.");
        tip("Run `cloudvault add <NAME>` to add your first secret.");
        return;
    }

    let mut t = table(vec!["Id", "Name", "Tags", "Description"]);
    for e in entries {
        t.add_row(vec![
            e.id.clone(),
            e.name.clone(),
            e.tag_list().join(", "),
            e.description.clone(),
        ]);
    }
    println!("{t}");
}

/// Print a secret's fields, masking sensitive ones unless `reveal`.
pub fn print_secret(secret: &Secret, reveal: bool) {
    let mut t = table(vec!["Field", "Value"]);
    t.add_row(vec!["Name".to_string(), secret.name.clone()]);
    t.add_row(vec!["Type".to_string(), secret.secret_type().to_string()]);
    if !secret.description.is_empty() {
        t.add_row(vec!["Description".to_string(), secret.description.clone()]);
    }
    if !secret.tags.is_empty() {
        t.add_row(vec!["Tags".to_string(), secret.tags.join(", ")]);
    }
    for (descriptor, value) in secret.data.field_values() {
        let shown = if descriptor.sensitive && !reveal && !value.is_empty() {
            "********".to_string()
        } else {
            value.to_string()
        };
        t.add_row(vec![descriptor.label.to_string(), shown]);
    }
    t.add_row(vec![
        "Updated".to_string(),
        secret.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]);
    println!("{t}");
}

/// Print each verify issue, or a success line.
pub fn print_verify_results(results: &VerifyResults) {
    if results.is_valid() {
        success("Vault is consistent.");
        return;
    }
    for issue in &results.issues {
        warning(&issue.to_string());
    }
}

/// Print KDF timings (Algorithm, Preset, Mean, Min, Max).
pub fn print_benchmark_table(results: &[BenchmarkResult]) {
    let mut t = table(vec!["Algorithm", "Preset", "Runs", "Mean", "Min", "Max"]);
    for r in results {
        t.add_row(vec![
            r.algorithm.to_string(),
            r.preset.clone(),
            r.samples.len().to_string(),
            format!("{:.1?}", r.mean()),
            format!("{:.1?}", r.min()),
            format!("{:.1?}", r.max()),
        ]);
    }
    println!("{t}");
}
