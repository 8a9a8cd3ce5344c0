//! Account command implementations

use anyhow::{bail, Result};
use sift_core::db::Database;
use sift_core::models::{CredentialKind, Credentials, Institution};

use super::{print_json, truncate};

/// Build credentials of the shape the institution requires from CLI flags
pub fn build_credentials(
    institution: &str,
    username: Option<String>,
    password: Option<String>,
    user_id: Option<String>,
    label: Option<String>,
) -> Result<Credentials> {
    let institution: Institution = institution.parse()?;

    let credentials = match institution.credential_kind() {
        CredentialKind::UsernamePassword => match (username, password) {
            (Some(username), Some(password)) => Credentials::UsernamePassword { username, password },
            _ => bail!("{} requires --username and --password", institution),
        },
        CredentialKind::UserIdLabel => match (user_id, label) {
            (Some(user_id), Some(label)) => Credentials::UserIdLabel { user_id, label },
            _ => bail!("{} requires --user-id and --label", institution),
        },
    };

    Ok(credentials)
}

pub fn cmd_accounts_add(
    db: &Database,
    name: &str,
    institution: &str,
    credentials: &Credentials,
) -> Result<()> {
    let institution: Institution = institution.parse()?;
    let id = db.register_account(name, institution, credentials)?;
    println!(
        "✅ Account '{}' ({}) registered (id: {})",
        name, institution, id
    );
    Ok(())
}

pub fn cmd_accounts_list(db: &Database, json: bool) -> Result<()> {
    let accounts = db.list_accounts()?;

    if json {
        return print_json(&accounts);
    }

    if accounts.is_empty() {
        println!("No accounts found. Register one with 'sift accounts add'.");
        return Ok(());
    }

    println!();
    println!("🏦 Accounts");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:>4} │ {:24} │ {:10} │ {}", "ID", "Name", "Institution", "Login");
    for account in &accounts {
        println!(
            "   {:>4} │ {:24} │ {:10} │ {}",
            account.id,
            truncate(&account.name, 24),
            account.institution,
            account.identity
        );
    }

    Ok(())
}
