use std::io::{self, Write};

use diesel::{prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use rpassword::read_password;

pub fn establish_connection() -> Result<SqliteConnection, Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let mut conn = SqliteConnection::establish(&database_url)?;
    zela_api::orm::set_foreign_keys(&mut conn);
    Ok(conn)
}

/// Prompts for a password twice without echoing it.
pub fn prompt_for_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}

/// Asks the operator to confirm a destructive operation.
pub fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();

    Ok(input == "y" || input == "yes")
}

/// Applies the CLI's search-term convention: regex by default, fixed
/// string with -F.
pub fn matches_term(
    haystack: &str,
    term: &str,
    fixed_string: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    if fixed_string {
        Ok(haystack.contains(term))
    } else {
        let regex = regex::Regex::new(term)
            .map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?;
        Ok(regex.is_match(haystack))
    }
}
